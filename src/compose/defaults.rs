//! Category-keyed default tables for new templates.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

use crate::models::{
    ColorMap, ColorScheme, FontPairing, FontSet, Layout, LayoutStructure, SectionDefinition,
    SectionName, SectionShape, Spacing, TemplateCategory, ThemeOptions,
};

/// Everything a category implies for a fresh template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDefaults {
    pub category: TemplateCategory,
    pub sections: Vec<SectionName>,
    pub colors: ColorMap,
    pub fonts: FontSet,
    pub section_definitions: BTreeMap<SectionName, SectionDefinition>,
    pub component_mapping: BTreeMap<SectionName, Vec<String>>,
    pub layouts: Vec<Layout>,
    pub theme_options: ThemeOptions,
}

/// Defaults for a category given as free text. Anything outside the
/// category enum takes the default branch.
pub fn derive_defaults(category: &str) -> TemplateDefaults {
    defaults_for(TemplateCategory::parse(category).unwrap_or(TemplateCategory::Other))
}

pub fn defaults_for(category: TemplateCategory) -> TemplateDefaults {
    let sections = default_sections(category);
    let colors = default_colors(category);
    let fonts = default_fonts(category);

    let section_definitions: BTreeMap<_, _> = sections
        .iter()
        .map(|s| (s.clone(), section_definition(s, category)))
        .collect();
    let component_mapping = sections
        .iter()
        .map(|s| (s.clone(), component_names(s)))
        .collect();

    TemplateDefaults {
        category,
        layouts: default_layouts(category, &sections),
        theme_options: default_theme_options(category, &colors, &fonts),
        sections,
        colors,
        fonts,
        section_definitions,
        component_mapping,
    }
}

pub fn default_sections(category: TemplateCategory) -> Vec<SectionName> {
    use SectionName::*;
    match category {
        TemplateCategory::Designer => vec![
            Header,
            About,
            Gallery,
            Work,
            Clients,
            Testimonials,
            Contact,
        ],
        TemplateCategory::Photographer => vec![
            Header, About, Galleries, Categories, Services, Pricing, Contact,
        ],
        _ => vec![
            Header, About, Projects, Skills, Experience, Education, Contact,
        ],
    }
}

pub(crate) fn color_map(pairs: &[(&str, &str)]) -> ColorMap {
    pairs
        .iter()
        .map(|(role, hex)| (role.to_string(), hex.to_string()))
        .collect()
}

pub fn default_colors(category: TemplateCategory) -> ColorMap {
    match category {
        TemplateCategory::Developer => color_map(&[
            ("primary", "#3b82f6"),
            ("secondary", "#10b981"),
            ("accent", "#8b5cf6"),
            ("background", "#ffffff"),
            ("text", "#1f2937"),
        ]),
        TemplateCategory::Designer => color_map(&[
            ("primary", "#ec4899"),
            ("secondary", "#8b5cf6"),
            ("accent", "#f59e0b"),
            ("background", "#ffffff"),
            ("text", "#111827"),
        ]),
        TemplateCategory::Photographer => color_map(&[
            ("primary", "#111827"),
            ("secondary", "#6b7280"),
            ("accent", "#f59e0b"),
            ("background", "#ffffff"),
            ("text", "#111827"),
        ]),
        // default
        _ => color_map(&[
            ("primary", "#2563eb"),
            ("secondary", "#7c3aed"),
            ("accent", "#06b6d4"),
            ("background", "#ffffff"),
            ("text", "#1f2937"),
        ]),
    }
}

pub(crate) fn font_set(heading: &str, body: &str, mono: Option<&str>) -> FontSet {
    FontSet {
        heading: heading.to_string(),
        body: body.to_string(),
        mono: mono.map(str::to_string),
    }
}

pub fn default_fonts(category: TemplateCategory) -> FontSet {
    match category {
        TemplateCategory::Developer => font_set("Inter", "Inter", Some("JetBrains Mono")),
        TemplateCategory::Designer => font_set("Playfair Display", "Source Sans Pro", None),
        TemplateCategory::Photographer => font_set("Montserrat", "Open Sans", None),
        _ => font_set("Inter", "Inter", None),
    }
}

fn about_variant(category: TemplateCategory) -> &'static str {
    match category {
        TemplateCategory::Developer => "with-skills",
        TemplateCategory::Designer | TemplateCategory::Photographer => "with-image",
        _ => "simple",
    }
}

fn project_layout(category: TemplateCategory) -> &'static str {
    match category {
        TemplateCategory::Designer => "masonry",
        _ => "grid",
    }
}

/// Component names a section can be rendered with.
pub fn component_names(section: &SectionName) -> Vec<String> {
    let names: &[&str] = match section {
        SectionName::Header => &["Navbar", "HeroHeader", "MinimalHeader"],
        SectionName::About => &["AboutSection", "Bio", "ProfileImage"],
        SectionName::Projects | SectionName::Work => &["ProjectGrid", "ProjectList", "ProjectCard"],
        SectionName::Skills => &["SkillBars", "SkillTags", "SkillCategories"],
        SectionName::Gallery | SectionName::Galleries => &["ImageGrid", "Masonry", "Lightbox"],
        SectionName::Contact => &["ContactForm", "ContactInfo", "SocialLinks"],
        other => return vec![format!("{}Section", other.title())],
    };
    names.iter().map(|n| n.to_string()).collect()
}

pub fn section_definition(section: &SectionName, category: TemplateCategory) -> SectionDefinition {
    let (section_type, default_data) = match section {
        SectionName::Header => (
            "header",
            json!({
                "title": "",
                "subtitle": "",
                "showNavigation": true,
                "variant": "centered"
            }),
        ),
        SectionName::About => (
            "about",
            json!({
                "title": "About Me",
                "content": "",
                "profileImage": null,
                "variant": about_variant(category)
            }),
        ),
        SectionName::Projects | SectionName::Work => (
            "projects",
            json!({
                "title": section.title(),
                "items": [],
                "layout": project_layout(category)
            }),
        ),
        SectionName::Skills => (
            "skills",
            json!({
                "title": "Skills",
                "categories": [],
                "display": "bars"
            }),
        ),
        SectionName::Gallery | SectionName::Galleries => (
            "gallery",
            json!({
                "title": section.title(),
                "items": [],
                "columns": 3
            }),
        ),
        SectionName::Contact => (
            "contact",
            json!({
                "title": "Contact",
                "email": "",
                "showForm": true
            }),
        ),
        other => {
            let mut data = json!({ "title": other.title() });
            if let Some(key) = other.known_shape().and_then(SectionShape::array_key) {
                data[key] = json!([]);
            }
            return SectionDefinition {
                section_type: other.as_str().to_string(),
                allowed_components: Vec::new(),
                default_data: data,
            };
        }
    };

    SectionDefinition {
        section_type: section_type.to_string(),
        allowed_components: component_names(section),
        default_data,
    }
}

pub fn default_layouts(category: TemplateCategory, sections: &[SectionName]) -> Vec<Layout> {
    let mut layouts = vec![Layout {
        id: "default".to_string(),
        name: "Default".to_string(),
        structure: LayoutStructure {
            sections: sections.to_vec(),
            grid_system: "12-column".to_string(),
            spacing: Some(Spacing {
                section: "4rem".to_string(),
                component: "2rem".to_string(),
            }),
        },
    }];

    match category {
        TemplateCategory::Developer => layouts.push(Layout {
            id: "sidebar".to_string(),
            name: "Sidebar".to_string(),
            structure: LayoutStructure {
                sections: sections.to_vec(),
                grid_system: "sidebar-12-column".to_string(),
                spacing: Some(Spacing {
                    section: "3rem".to_string(),
                    component: "1.5rem".to_string(),
                }),
            },
        }),
        TemplateCategory::Designer | TemplateCategory::Photographer => layouts.push(Layout {
            id: "minimal".to_string(),
            name: "Minimal".to_string(),
            structure: LayoutStructure {
                sections: vec![SectionName::Header, SectionName::Gallery, SectionName::Contact],
                grid_system: "single-column".to_string(),
                spacing: None,
            },
        }),
        _ => {}
    }

    layouts
}

/// Dark counterpart of a scheme: brand colors kept, background and text inverted.
pub fn dark_variant(colors: &ColorMap) -> ColorMap {
    let mut dark = ColorMap::new();
    for role in ["primary", "secondary", "accent"] {
        if let Some(hex) = colors.get(role) {
            dark.insert(role.to_string(), hex.clone());
        }
    }
    dark.insert("background".to_string(), "#111827".to_string());
    dark.insert("text".to_string(), "#f9fafb".to_string());
    dark
}

pub fn default_theme_options(
    category: TemplateCategory,
    colors: &ColorMap,
    fonts: &FontSet,
) -> ThemeOptions {
    let mut color_schemes = vec![
        ColorScheme {
            id: "default".to_string(),
            name: "Default".to_string(),
            colors: colors.clone(),
        },
        ColorScheme {
            id: "dark".to_string(),
            name: "Dark".to_string(),
            colors: dark_variant(colors),
        },
    ];
    let mut font_pairings = vec![FontPairing {
        id: "default".to_string(),
        name: "Default".to_string(),
        fonts: fonts.clone(),
    }];

    match category {
        TemplateCategory::Designer => color_schemes.push(ColorScheme {
            id: "vibrant".to_string(),
            name: "Vibrant".to_string(),
            colors: color_map(&[
                ("primary", "#f43f5e"),
                ("secondary", "#a855f7"),
                ("accent", "#facc15"),
                ("background", "#fff7ed"),
                ("text", "#1c1917"),
            ]),
        }),
        TemplateCategory::Developer => {
            color_schemes.push(github_scheme());
            font_pairings.push(code_pairing());
        }
        _ => {}
    }

    ThemeOptions {
        color_schemes,
        font_pairings,
    }
}

pub(crate) fn github_scheme() -> ColorScheme {
    ColorScheme {
        id: "github".to_string(),
        name: "GitHub".to_string(),
        colors: color_map(&[
            ("primary", "#0969da"),
            ("secondary", "#1f883d"),
            ("accent", "#8250df"),
            ("background", "#0d1117"),
            ("text", "#c9d1d9"),
        ]),
    }
}

pub(crate) fn code_pairing() -> FontPairing {
    FontPairing {
        id: "code".to_string(),
        name: "Code".to_string(),
        fonts: font_set("Fira Code", "Inter", Some("Fira Code")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids<T>(items: &[T], id: impl Fn(&T) -> &str) -> Vec<String> {
        items.iter().map(|i| id(i).to_string()).collect()
    }

    #[test]
    fn test_developer_defaults_scenario() {
        let d = derive_defaults("developer");
        assert_eq!(
            d.sections,
            vec![
                SectionName::Header,
                SectionName::About,
                SectionName::Projects,
                SectionName::Skills,
                SectionName::Experience,
                SectionName::Education,
                SectionName::Contact,
            ]
        );
        assert_eq!(ids(&d.layouts, |l| l.id.as_str()), vec!["default", "sidebar"]);
        assert_eq!(
            ids(&d.theme_options.color_schemes, |s| s.id.as_str()),
            vec!["default", "dark", "github"]
        );
        assert_eq!(
            ids(&d.theme_options.font_pairings, |p| p.id.as_str()),
            vec!["default", "code"]
        );
    }

    #[test]
    fn test_every_category_has_total_defaults() {
        for category in TemplateCategory::ALL {
            let d = defaults_for(category);
            assert!(!d.sections.is_empty(), "{category} has no sections");
            assert!(!d.colors.is_empty(), "{category} has no colors");
            assert!(!d.fonts.heading.is_empty());
            assert!(!d.fonts.body.is_empty());
            assert_eq!(d.section_definitions.len(), d.sections.len());
        }
    }

    #[test]
    fn test_unknown_category_falls_back_to_developer_sections() {
        let unknown = derive_defaults("unknown-category");
        let developer = derive_defaults("developer");
        assert_eq!(unknown.sections, developer.sections);
        assert_eq!(unknown.colors, default_colors(TemplateCategory::Other));
        assert!(!unknown.fonts.heading.is_empty());
    }

    #[test]
    fn test_designer_and_photographer_get_minimal_layout() {
        for category in ["designer", "photographer"] {
            let d = derive_defaults(category);
            let minimal = d.layouts.iter().find(|l| l.id == "minimal").unwrap();
            assert_eq!(
                minimal.structure.sections,
                vec![SectionName::Header, SectionName::Gallery, SectionName::Contact]
            );
            assert!(d.layouts.iter().all(|l| l.id != "sidebar"));
        }
    }

    #[test]
    fn test_default_layout_contains_every_section() {
        let d = derive_defaults("photographer");
        let default = &d.layouts[0];
        assert_eq!(default.id, "default");
        assert_eq!(default.structure.grid_system, "12-column");
        assert_eq!(default.structure.sections, d.sections);
    }

    #[test]
    fn test_dark_scheme_inverts_background_and_text() {
        let d = derive_defaults("designer");
        let dark = &d.theme_options.color_schemes[1];
        assert_eq!(dark.id, "dark");
        assert_eq!(dark.colors["primary"], d.colors["primary"]);
        assert_eq!(dark.colors["secondary"], d.colors["secondary"]);
        assert_eq!(dark.colors["background"], "#111827");
        assert_eq!(dark.colors["text"], "#f9fafb");
        assert!(d
            .theme_options
            .color_schemes
            .iter()
            .any(|s| s.id == "vibrant"));
    }

    #[test]
    fn test_about_variant_depends_on_category() {
        let variant = |c: &str| {
            derive_defaults(c).section_definitions[&SectionName::About].default_data["variant"]
                .clone()
        };
        assert_eq!(variant("developer"), "with-skills");
        assert_eq!(variant("designer"), "with-image");
        assert_eq!(variant("business"), "simple");
    }

    #[test]
    fn test_generic_section_definition_uses_capitalized_title() {
        let def = section_definition(&SectionName::Testimonials, TemplateCategory::Designer);
        assert_eq!(def.section_type, "testimonials");
        assert_eq!(def.default_data["title"], "Testimonials");
        assert!(def.default_data["items"].is_array());

        let custom = section_definition(&SectionName::from("talks"), TemplateCategory::Other);
        assert_eq!(custom.default_data, json!({ "title": "Talks" }));
    }

    #[test]
    fn test_work_section_uses_projects_template() {
        let def = section_definition(&SectionName::Work, TemplateCategory::Designer);
        assert_eq!(def.section_type, "projects");
        assert_eq!(def.default_data["title"], "Work");
        assert_eq!(def.default_data["layout"], "masonry");
    }
}
