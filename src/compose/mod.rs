//! Template Composition Engine
//!
//! Derives category defaults for new templates, additively enhances stored
//! ones, and resolves the theme a new portfolio starts from.

pub mod defaults;
pub mod enhance;

pub use defaults::{defaults_for, derive_defaults, TemplateDefaults};
pub use enhance::{
    enhance, enhanced, standard_animations, template_sections, AnimationPolicy, EnhanceOptions,
    TemplateDelta, CURRENT_SCHEMA_VERSION,
};

use serde_json::Value;

use crate::models::{
    ColorMap, FontSet, LayoutSettings, PortfolioSettings, SectionContent, SectionName, Template,
    TemplateCategory,
};

/// A fully populated template for `category` at the current schema version.
pub fn new_template(
    name: impl Into<String>,
    description: impl Into<String>,
    category: TemplateCategory,
) -> Template {
    let mut template = Template::new(name, description, category);
    enhance(&mut template, &EnhanceOptions::default());
    template
}

/// Theme and layout choices for a new portfolio. Ids that the template
/// does not define fall back to its first entry, then to category defaults.
#[derive(Debug, Clone, Default)]
pub struct ThemeSelection {
    pub color_scheme_id: Option<String>,
    pub font_pairing_id: Option<String>,
    pub layout_id: Option<String>,
}

pub fn resolve_settings(template: &Template, selection: &ThemeSelection) -> PortfolioSettings {
    let schemes = &template.theme_options.color_schemes;
    let scheme = selection
        .color_scheme_id
        .as_deref()
        .and_then(|id| template.color_scheme(id))
        .or_else(|| template.color_scheme("default"))
        .or_else(|| schemes.first());
    let (color_scheme_id, colors): (Option<String>, ColorMap) = match scheme {
        Some(s) => (Some(s.id.clone()), s.colors.clone()),
        None => (None, defaults::default_colors(template.category)),
    };

    let pairings = &template.theme_options.font_pairings;
    let pairing = selection
        .font_pairing_id
        .as_deref()
        .and_then(|id| template.font_pairing(id))
        .or_else(|| template.font_pairing("default"))
        .or_else(|| pairings.first());
    let (font_pairing_id, fonts): (Option<String>, FontSet) = match pairing {
        Some(p) => (Some(p.id.clone()), p.fonts.clone()),
        None => (None, defaults::default_fonts(template.category)),
    };

    let layout = selection
        .layout_id
        .as_deref()
        .and_then(|id| template.layout(id))
        .or_else(|| template.layout("default"))
        .or_else(|| template.layouts.first());
    let (layout_id, sections) = match layout {
        Some(l) => (Some(l.id.clone()), l.structure.sections.clone()),
        None => (None, template_sections(template)),
    };

    PortfolioSettings {
        color_scheme_id,
        font_pairing_id,
        layout_id,
        colors,
        fonts,
        layout: LayoutSettings {
            sections,
            show_header: true,
            show_footer: true,
        },
    }
}

/// Initial content: each section's template default data, with user
/// overrides merged on top (arrays replace, objects merge shallowly).
pub fn initial_content(
    template: &Template,
    sections: &[SectionName],
    overrides: &SectionContent,
) -> SectionContent {
    let mut content = SectionContent::new();

    for section in sections {
        let base = template
            .section_definitions
            .get(section)
            .map(|d| d.default_data.clone())
            .unwrap_or_else(|| {
                defaults::section_definition(section, template.category).default_data
            });
        content.insert(section.clone(), base);
    }

    for (section, payload) in overrides {
        let entry = content
            .entry(section.clone())
            .or_insert_with(|| Value::Object(Default::default()));
        match (entry.as_object_mut(), payload.as_object()) {
            (Some(target), Some(patch)) => {
                for (k, v) in patch {
                    target.insert(k.clone(), v.clone());
                }
            }
            _ => *entry = payload.clone(),
        }
    }

    content
}
