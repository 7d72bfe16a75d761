//! Additive enhancement of stored templates.
//!
//! Upgrades are a table of steps keyed by the schema version they
//! introduce. Every step appends only entries whose id (or key) is absent,
//! so applying a step twice changes nothing. `animations` is the exception:
//! under [`AnimationPolicy::Replace`] it is overwritten with the fixed set on
//! every call.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::defaults::{self, color_map, font_set};
use crate::models::{
    Animation, ColorScheme, FontPairing, Layout, LayoutStructure, ResponsiveLayout, SectionName,
    SectionVariant, Spacing, StylePreset, Template, TemplateCategory,
};

pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// How `enhance` treats the `animations` collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnimationPolicy {
    /// Overwrite with the fixed set on every call.
    #[default]
    Replace,
    /// Only add missing animation ids, like every other collection.
    AddMissing,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceOptions {
    /// Run every step regardless of the stored schema version.
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub animations: AnimationPolicy,
}

/// What one `enhance` call added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDelta {
    pub template_id: Uuid,
    pub from_version: u32,
    pub to_version: u32,
    pub steps_applied: Vec<String>,
    pub layouts: Vec<String>,
    pub color_schemes: Vec<String>,
    pub font_pairings: Vec<String>,
    pub section_definitions: Vec<SectionName>,
    pub component_mapping: Vec<SectionName>,
    /// `section:variant` pairs
    pub section_variants: Vec<String>,
    pub style_presets: Vec<String>,
    pub responsive_layouts: Vec<String>,
    /// Animations differ from what was stored before the call.
    pub animations_replaced: bool,
}

impl TemplateDelta {
    /// True when the call left the document unchanged.
    pub fn is_empty(&self) -> bool {
        self.from_version == self.to_version
            && self.layouts.is_empty()
            && self.color_schemes.is_empty()
            && self.font_pairings.is_empty()
            && self.section_definitions.is_empty()
            && self.component_mapping.is_empty()
            && self.section_variants.is_empty()
            && self.style_presets.is_empty()
            && self.responsive_layouts.is_empty()
            && !self.animations_replaced
    }

    pub fn added_count(&self) -> usize {
        self.layouts.len()
            + self.color_schemes.len()
            + self.font_pairings.len()
            + self.section_definitions.len()
            + self.component_mapping.len()
            + self.section_variants.len()
            + self.style_presets.len()
            + self.responsive_layouts.len()
    }
}

struct UpgradeStep {
    version: u32,
    name: &'static str,
    apply: fn(&mut Template, &mut TemplateDelta),
}

const UPGRADE_STEPS: &[UpgradeStep] = &[
    UpgradeStep {
        version: 1,
        name: "structure",
        apply: apply_structure,
    },
    UpgradeStep {
        version: 2,
        name: "theme-expansion",
        apply: apply_theme_expansion,
    },
];

/// Upgrade `template` in place and report what was added.
pub fn enhance(template: &mut Template, options: &EnhanceOptions) -> TemplateDelta {
    let from_version = template.schema_version;
    let mut delta = TemplateDelta {
        template_id: template.id,
        from_version,
        ..TemplateDelta::default()
    };

    for step in UPGRADE_STEPS {
        if options.force || step.version > from_version {
            (step.apply)(template, &mut delta);
            delta.steps_applied.push(step.name.to_string());
        }
    }

    let animations = standard_animations();
    match options.animations {
        AnimationPolicy::Replace => {
            delta.animations_replaced = template.animations != animations;
            template.animations = animations;
        }
        AnimationPolicy::AddMissing => {
            let added = insert_missing(&mut template.animations, animations);
            delta.animations_replaced = !added.is_empty();
        }
    }

    template.schema_version = from_version.max(CURRENT_SCHEMA_VERSION);
    delta.to_version = template.schema_version;

    if !delta.is_empty() {
        template.updated_at = Utc::now();
    }
    delta
}

/// Non-mutating form of [`enhance`].
pub fn enhanced(template: &Template, options: &EnhanceOptions) -> (Template, TemplateDelta) {
    let mut copy = template.clone();
    let delta = enhance(&mut copy, options);
    (copy, delta)
}

/// Append candidates whose id is not yet present. Returns the ids added.
fn append_missing<T>(existing: &mut Vec<T>, candidates: Vec<T>, id: impl Fn(&T) -> &str) -> Vec<String> {
    let mut added = Vec::new();
    for candidate in candidates {
        let candidate_id = id(&candidate).to_string();
        if existing.iter().any(|e| id(e) == candidate_id) {
            continue;
        }
        existing.push(candidate);
        added.push(candidate_id);
    }
    added
}

/// Insert candidates whose key is not yet present. Returns the keys added.
fn insert_missing<K: Ord + Clone, V>(
    existing: &mut BTreeMap<K, V>,
    candidates: impl IntoIterator<Item = (K, V)>,
) -> Vec<K> {
    let mut added = Vec::new();
    for (key, value) in candidates {
        if existing.contains_key(&key) {
            continue;
        }
        existing.insert(key.clone(), value);
        added.push(key);
    }
    added
}

/// Sections a template is built from: its `default` layout, else its
/// section definitions, else the category defaults.
pub fn template_sections(template: &Template) -> Vec<SectionName> {
    if let Some(layout) = template.layout("default") {
        if !layout.structure.sections.is_empty() {
            return layout.structure.sections.clone();
        }
    }
    if !template.section_definitions.is_empty() {
        return template.section_definitions.keys().cloned().collect();
    }
    defaults::default_sections(template.category)
}

fn apply_structure(template: &mut Template, delta: &mut TemplateDelta) {
    let base = defaults::defaults_for(template.category);

    // Definitions are only seeded when the collection is absent altogether;
    // a template with its own definitions keeps exactly those sections.
    if template.section_definitions.is_empty() {
        delta.section_definitions = insert_missing(
            &mut template.section_definitions,
            base.section_definitions,
        );
    }

    let mapping_candidates: Vec<_> = template
        .section_definitions
        .iter()
        .map(|(name, def)| {
            let components = if def.allowed_components.is_empty() {
                defaults::component_names(name)
            } else {
                def.allowed_components.clone()
            };
            (name.clone(), components)
        })
        .collect();
    delta.component_mapping = insert_missing(&mut template.component_mapping, mapping_candidates);

    delta
        .layouts
        .extend(append_missing(&mut template.layouts, base.layouts, |l| l.id.as_str()));
    delta.color_schemes.extend(append_missing(
        &mut template.theme_options.color_schemes,
        base.theme_options.color_schemes,
        |s| s.id.as_str(),
    ));
    delta.font_pairings.extend(append_missing(
        &mut template.theme_options.font_pairings,
        base.theme_options.font_pairings,
        |p| p.id.as_str(),
    ));
}

fn apply_theme_expansion(template: &mut Template, delta: &mut TemplateDelta) {
    let category = template.category;
    let sections = template_sections(template);

    delta.layouts.extend(append_missing(
        &mut template.layouts,
        extra_layouts(category, &sections),
        |l| l.id.as_str(),
    ));
    delta.color_schemes.extend(append_missing(
        &mut template.theme_options.color_schemes,
        extra_color_schemes(category),
        |s| s.id.as_str(),
    ));
    delta.font_pairings.extend(append_missing(
        &mut template.theme_options.font_pairings,
        extra_font_pairings(category),
        |p| p.id.as_str(),
    ));

    for section in &sections {
        let candidates = variants_for(section);
        if candidates.is_empty() {
            continue;
        }
        let existing = template
            .section_variants
            .entry(section.clone())
            .or_default();
        for id in append_missing(existing, candidates, |v| v.id.as_str()) {
            delta.section_variants.push(format!("{}:{}", section, id));
        }
    }

    delta.style_presets = insert_missing(&mut template.style_presets, style_presets(category));
    delta.responsive_layouts =
        insert_missing(&mut template.responsive_layouts, responsive_layouts());
}

fn layout(id: &str, name: &str, sections: Vec<SectionName>, grid: &str, spacing: Option<(&str, &str)>) -> Layout {
    Layout {
        id: id.to_string(),
        name: name.to_string(),
        structure: LayoutStructure {
            sections,
            grid_system: grid.to_string(),
            spacing: spacing.map(|(section, component)| Spacing {
                section: section.to_string(),
                component: component.to_string(),
            }),
        },
    }
}

fn extra_layouts(category: TemplateCategory, sections: &[SectionName]) -> Vec<Layout> {
    let mut layouts = vec![
        layout("modern", "Modern", sections.to_vec(), "12-column", Some(("5rem", "2.5rem"))),
        layout("centered", "Centered", sections.to_vec(), "single-column", Some(("4rem", "2rem"))),
    ];
    match category {
        TemplateCategory::Developer => layouts.push(layout(
            "terminal",
            "Terminal",
            sections.to_vec(),
            "monospace-grid",
            Some(("2rem", "1rem")),
        )),
        TemplateCategory::Designer => layouts.push(layout(
            "masonry",
            "Masonry",
            sections.to_vec(),
            "masonry",
            Some(("3rem", "1rem")),
        )),
        TemplateCategory::Photographer => layouts.push(layout(
            "fullscreen",
            "Fullscreen",
            vec![SectionName::Header, SectionName::Galleries, SectionName::Contact],
            "full-bleed",
            None,
        )),
        _ => {}
    }
    layouts
}

fn scheme(id: &str, name: &str, pairs: &[(&str, &str)]) -> ColorScheme {
    ColorScheme {
        id: id.to_string(),
        name: name.to_string(),
        colors: color_map(pairs),
    }
}

fn extra_color_schemes(category: TemplateCategory) -> Vec<ColorScheme> {
    let mut schemes = vec![
        scheme(
            "ocean",
            "Ocean",
            &[
                ("primary", "#0ea5e9"),
                ("secondary", "#0369a1"),
                ("accent", "#22d3ee"),
                ("background", "#f0f9ff"),
                ("text", "#0c4a6e"),
            ],
        ),
        scheme(
            "sunset",
            "Sunset",
            &[
                ("primary", "#f97316"),
                ("secondary", "#db2777"),
                ("accent", "#fbbf24"),
                ("background", "#fffbeb"),
                ("text", "#431407"),
            ],
        ),
    ];
    match category {
        TemplateCategory::Developer => {
            schemes.push(defaults::github_scheme());
            schemes.push(scheme(
                "monokai",
                "Monokai",
                &[
                    ("primary", "#a6e22e"),
                    ("secondary", "#66d9ef"),
                    ("accent", "#f92672"),
                    ("background", "#272822"),
                    ("text", "#f8f8f2"),
                ],
            ));
        }
        TemplateCategory::Designer => schemes.push(scheme(
            "pastel",
            "Pastel",
            &[
                ("primary", "#f9a8d4"),
                ("secondary", "#c4b5fd"),
                ("accent", "#fde68a"),
                ("background", "#fdf2f8"),
                ("text", "#374151"),
            ],
        )),
        TemplateCategory::Photographer => schemes.push(scheme(
            "monochrome",
            "Monochrome",
            &[
                ("primary", "#000000"),
                ("secondary", "#404040"),
                ("accent", "#a3a3a3"),
                ("background", "#fafafa"),
                ("text", "#0a0a0a"),
            ],
        )),
        _ => {}
    }
    schemes
}

fn pairing(id: &str, name: &str, heading: &str, body: &str) -> FontPairing {
    FontPairing {
        id: id.to_string(),
        name: name.to_string(),
        fonts: font_set(heading, body, None),
    }
}

fn extra_font_pairings(category: TemplateCategory) -> Vec<FontPairing> {
    let mut pairings = vec![
        pairing("modern", "Modern", "Poppins", "Inter"),
        pairing("classic", "Classic", "Playfair Display", "Lora"),
    ];
    match category {
        TemplateCategory::Developer => pairings.push(defaults::code_pairing()),
        TemplateCategory::Designer => {
            pairings.push(pairing("editorial", "Editorial", "DM Serif Display", "DM Sans"))
        }
        TemplateCategory::Photographer => {
            pairings.push(pairing("elegant", "Elegant", "Cormorant Garamond", "Montserrat"))
        }
        _ => {}
    }
    pairings
}

fn variants_for(section: &SectionName) -> Vec<SectionVariant> {
    let table: &[(&str, &str)] = match section {
        SectionName::Header => &[("centered", "Centered"), ("split", "Split"), ("minimal", "Minimal")],
        SectionName::About => &[
            ("simple", "Simple"),
            ("with-image", "With Image"),
            ("with-skills", "With Skills"),
        ],
        SectionName::Projects | SectionName::Work => {
            &[("grid", "Grid"), ("list", "List"), ("carousel", "Carousel")]
        }
        SectionName::Skills => &[("bars", "Bars"), ("tags", "Tags"), ("circles", "Circles")],
        SectionName::Gallery | SectionName::Galleries => {
            &[("grid", "Grid"), ("masonry", "Masonry"), ("carousel", "Carousel")]
        }
        SectionName::Experience | SectionName::Education => {
            &[("timeline", "Timeline"), ("cards", "Cards")]
        }
        SectionName::Contact => &[("form", "Form"), ("simple", "Simple"), ("split", "Split")],
        _ => &[],
    };
    table
        .iter()
        .map(|(id, name)| SectionVariant {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
        })
        .collect()
}

fn preset(name: &str, radius: &str, shadow: &str, spacing: &str) -> StylePreset {
    StylePreset {
        name: name.to_string(),
        border_radius: radius.to_string(),
        shadow: shadow.to_string(),
        spacing: spacing.to_string(),
    }
}

fn style_presets(category: TemplateCategory) -> Vec<(String, StylePreset)> {
    let mut presets = vec![
        ("modern".to_string(), preset("Modern", "0.75rem", "lg", "relaxed")),
        ("classic".to_string(), preset("Classic", "0.25rem", "sm", "normal")),
        ("minimal".to_string(), preset("Minimal", "0", "none", "compact")),
    ];
    match category {
        TemplateCategory::Developer => {
            presets.push(("technical".to_string(), preset("Technical", "0.125rem", "none", "compact")))
        }
        TemplateCategory::Designer => {
            presets.push(("bold".to_string(), preset("Bold", "1.5rem", "xl", "relaxed")))
        }
        TemplateCategory::Photographer => {
            presets.push(("elegant".to_string(), preset("Elegant", "0", "md", "spacious")))
        }
        _ => {}
    }
    presets
}

fn responsive_layouts() -> Vec<(String, ResponsiveLayout)> {
    [
        ("mobile", 0, 4, "1rem"),
        ("tablet", 768, 8, "1.5rem"),
        ("desktop", 1024, 12, "2rem"),
        ("wide", 1440, 12, "2.5rem"),
    ]
    .into_iter()
    .map(|(id, min_width, columns, gutter)| {
        (
            id.to_string(),
            ResponsiveLayout {
                min_width,
                columns,
                gutter: gutter.to_string(),
            },
        )
    })
    .collect()
}

/// The fixed animation set. Carries no user customization.
pub fn standard_animations() -> BTreeMap<String, Animation> {
    [
        ("fadeIn", "Fade In", 600, "ease-out"),
        ("slideUp", "Slide Up", 500, "ease-out"),
        ("slideRight", "Slide Right", 500, "ease-out"),
        ("zoomIn", "Zoom In", 400, "ease-in-out"),
        ("reveal", "Reveal", 800, "cubic-bezier(0.77, 0, 0.175, 1)"),
        ("typewriter", "Typewriter", 2000, "steps(40, end)"),
    ]
    .into_iter()
    .map(|(id, name, duration_ms, easing)| {
        (
            id.to_string(),
            Animation {
                name: name.to_string(),
                duration_ms,
                easing: easing.to_string(),
            },
        )
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColorScheme, SectionDefinition};
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn bare(category: TemplateCategory) -> Template {
        Template::new("Test", "", category)
    }

    fn assert_unique<T>(items: &[T], id: impl Fn(&T) -> &str) {
        let mut seen = HashSet::new();
        for item in items {
            assert!(seen.insert(id(item).to_string()), "duplicate id {}", id(item));
        }
    }

    #[test]
    fn test_enhance_twice_is_a_no_op() {
        for category in TemplateCategory::ALL {
            let (once, first) = enhanced(&bare(category), &EnhanceOptions::default());
            assert!(!first.is_empty());
            let (twice, second) = enhanced(&once, &EnhanceOptions::default());
            assert_eq!(once, twice, "{category} changed on second enhance");
            assert!(second.is_empty(), "{category}: {second:?}");
        }
    }

    #[test]
    fn test_forced_enhance_is_still_idempotent() {
        let force = EnhanceOptions {
            force: true,
            ..EnhanceOptions::default()
        };
        let (once, _) = enhanced(&bare(TemplateCategory::Designer), &force);
        let (twice, delta) = enhanced(&once, &force);
        assert_eq!(once, twice);
        assert_eq!(delta.added_count(), 0);
        assert!(!delta.animations_replaced);
        assert_eq!(delta.steps_applied, vec!["structure", "theme-expansion"]);
    }

    #[test]
    fn test_ids_stay_unique_after_enhance() {
        for category in TemplateCategory::ALL {
            let (t, _) = enhanced(&bare(category), &EnhanceOptions::default());
            assert_unique(&t.layouts, |l| l.id.as_str());
            assert_unique(&t.theme_options.color_schemes, |s| s.id.as_str());
            assert_unique(&t.theme_options.font_pairings, |p| p.id.as_str());
            for variants in t.section_variants.values() {
                assert_unique(variants, |v| v.id.as_str());
            }
        }
    }

    #[test]
    fn test_developer_candidates_overlapping_defaults_are_filtered() {
        let (t, delta) = enhanced(&bare(TemplateCategory::Developer), &EnhanceOptions::default());
        // github and code come from both the structure and expansion steps
        assert_eq!(delta.color_schemes.iter().filter(|id| *id == "github").count(), 1);
        assert_eq!(delta.font_pairings.iter().filter(|id| *id == "code").count(), 1);
        assert!(t.layout("terminal").is_some());
        assert!(t.layout("sidebar").is_some());
    }

    #[test]
    fn test_existing_customizations_are_preserved() {
        let mut t = bare(TemplateCategory::Developer);
        let custom_dark = ColorScheme {
            id: "dark".to_string(),
            name: "My Dark".to_string(),
            colors: color_map(&[("background", "#000000")]),
        };
        t.theme_options.color_schemes.push(custom_dark.clone());

        let (after, delta) = enhanced(&t, &EnhanceOptions::default());
        assert_eq!(after.theme_options.color_schemes[0], custom_dark);
        assert!(!delta.color_schemes.contains(&"dark".to_string()));
        assert!(delta.color_schemes.contains(&"default".to_string()));
    }

    #[test]
    fn test_partially_migrated_template_keeps_cardinality() {
        let mut t = bare(TemplateCategory::Photographer);
        t.section_definitions.insert(
            SectionName::from("zines"),
            SectionDefinition {
                section_type: "zines".to_string(),
                allowed_components: vec![],
                default_data: serde_json::json!({}),
            },
        );
        t.style_presets
            .insert("modern".to_string(), preset("Mine", "9px", "none", "tight"));
        let before_presets = t.style_presets.len();

        let (after, delta) = enhanced(&t, &EnhanceOptions::default());
        // own definitions are kept as-is, no defaults mixed in
        assert_eq!(after.section_definitions.len(), 1);
        assert!(delta.section_definitions.is_empty());
        assert_eq!(
            after.component_mapping[&SectionName::from("zines")],
            vec!["ZinesSection".to_string()]
        );
        assert_eq!(after.style_presets["modern"].name, "Mine");
        assert!(after.style_presets.len() >= before_presets);
    }

    #[test]
    fn test_animations_are_replaced_wholesale() {
        let (mut t, _) = enhanced(&bare(TemplateCategory::Other), &EnhanceOptions::default());
        t.animations.insert(
            "spin".to_string(),
            Animation {
                name: "Spin".to_string(),
                duration_ms: 100,
                easing: "linear".to_string(),
            },
        );
        t.animations.get_mut("fadeIn").unwrap().duration_ms = 1;

        let (after, delta) = enhanced(&t, &EnhanceOptions::default());
        // replacement drops the extra entry and restores the standard timing
        assert_eq!(after.animations, standard_animations());
        assert!(delta.animations_replaced);
        assert_eq!(after.animations.len(), 6);
    }

    #[test]
    fn test_animations_add_missing_policy_keeps_custom_entries() {
        let options = EnhanceOptions {
            animations: AnimationPolicy::AddMissing,
            ..EnhanceOptions::default()
        };
        let mut t = bare(TemplateCategory::Other);
        t.animations.insert(
            "fadeIn".to_string(),
            Animation {
                name: "Slow Fade".to_string(),
                duration_ms: 3000,
                easing: "linear".to_string(),
            },
        );
        let (after, _) = enhanced(&t, &options);
        assert_eq!(after.animations["fadeIn"].name, "Slow Fade");
        assert_eq!(after.animations.len(), 6);
    }

    #[test]
    fn test_schema_version_bumped_and_gates_steps() {
        let (t, delta) = enhanced(&bare(TemplateCategory::Designer), &EnhanceOptions::default());
        assert_eq!(delta.from_version, 0);
        assert_eq!(delta.to_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(t.schema_version, CURRENT_SCHEMA_VERSION);

        let mut v1 = bare(TemplateCategory::Designer);
        v1.schema_version = 1;
        let (_, delta) = enhanced(&v1, &EnhanceOptions::default());
        assert_eq!(delta.steps_applied, vec!["theme-expansion"]);
        assert!(delta.section_definitions.is_empty());
    }

    #[test]
    fn test_newer_schema_version_is_not_downgraded() {
        let mut t = bare(TemplateCategory::Developer);
        t.schema_version = CURRENT_SCHEMA_VERSION + 3;
        let (after, delta) = enhanced(&t, &EnhanceOptions::default());
        assert_eq!(after.schema_version, CURRENT_SCHEMA_VERSION + 3);
        assert!(delta.steps_applied.is_empty());
    }

    #[test]
    fn test_section_variants_follow_template_sections() {
        let (t, delta) = enhanced(&bare(TemplateCategory::Photographer), &EnhanceOptions::default());
        assert!(t.section_variants.contains_key(&SectionName::Galleries));
        assert!(!t.section_variants.contains_key(&SectionName::Projects));
        assert!(delta.section_variants.contains(&"galleries:masonry".to_string()));
    }
}
