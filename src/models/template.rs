//! Template document model - a reusable design from which portfolios are built.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::section::SectionName;

/// Design category of a template. Unrecognized values deserialize to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TemplateCategory {
    Developer,
    Designer,
    Photographer,
    Creative,
    Business,
    Personal,
    Other,
}

impl TemplateCategory {
    pub const ALL: [TemplateCategory; 7] = [
        TemplateCategory::Developer,
        TemplateCategory::Designer,
        TemplateCategory::Photographer,
        TemplateCategory::Creative,
        TemplateCategory::Business,
        TemplateCategory::Personal,
        TemplateCategory::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TemplateCategory::Developer => "developer",
            TemplateCategory::Designer => "designer",
            TemplateCategory::Photographer => "photographer",
            TemplateCategory::Creative => "creative",
            TemplateCategory::Business => "business",
            TemplateCategory::Personal => "personal",
            TemplateCategory::Other => "other",
        }
    }

    /// Strict parse; `None` for anything outside the enum.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl From<String> for TemplateCategory {
    fn from(s: String) -> Self {
        TemplateCategory::parse(&s).unwrap_or(TemplateCategory::Other)
    }
}

impl From<TemplateCategory> for String {
    fn from(c: TemplateCategory) -> Self {
        c.as_str().to_string()
    }
}

impl fmt::Display for TemplateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role -> hex color, e.g. `primary` -> `#3b82f6`.
pub type ColorMap = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spacing {
    pub section: String,
    pub component: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutStructure {
    #[serde(default)]
    pub sections: Vec<SectionName>,
    pub grid_system: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<Spacing>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub id: String,
    pub name: String,
    pub structure: LayoutStructure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDefinition {
    #[serde(rename = "type")]
    pub section_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub allowed_components: Vec<String>,
    #[serde(default)]
    pub default_data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorScheme {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub colors: ColorMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSet {
    pub heading: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mono: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontPairing {
    pub id: String,
    pub name: String,
    pub fonts: FontSet,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeOptions {
    #[serde(default, deserialize_with = "null_as_default")]
    pub color_schemes: Vec<ColorScheme>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub font_pairings: Vec<FontPairing>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionVariant {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePreset {
    pub name: String,
    pub border_radius: String,
    pub shadow: String,
    pub spacing: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animation {
    pub name: String,
    pub duration_ms: u32,
    pub easing: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsiveLayout {
    pub min_width: u32,
    pub columns: u32,
    pub gutter: String,
}

/// A stored template document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub category: TemplateCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_image: Option<String>,
    #[serde(default = "default_true", deserialize_with = "null_as_true")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub layouts: Vec<Layout>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub section_definitions: BTreeMap<SectionName, SectionDefinition>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub theme_options: ThemeOptions,
    #[serde(default, deserialize_with = "null_as_default")]
    pub component_mapping: BTreeMap<SectionName, Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub style_presets: BTreeMap<String, StylePreset>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub animations: BTreeMap<String, Animation>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub section_variants: BTreeMap<SectionName, Vec<SectionVariant>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub responsive_layouts: BTreeMap<String, ResponsiveLayout>,
    /// Absent on documents written before versioning existed.
    #[serde(default, deserialize_with = "null_as_default")]
    pub schema_version: u32,
    /// Optimistic concurrency token, bumped by the store on every write.
    #[serde(default)]
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// Older documents carry `null` where a collection was never filled in.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_true<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

impl Template {
    /// Bare template with every collection empty and version 0.
    pub fn new(name: impl Into<String>, description: impl Into<String>, category: TemplateCategory) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            category,
            preview_image: None,
            is_active: true,
            layouts: Vec::new(),
            section_definitions: BTreeMap::new(),
            theme_options: ThemeOptions::default(),
            component_mapping: BTreeMap::new(),
            style_presets: BTreeMap::new(),
            animations: BTreeMap::new(),
            section_variants: BTreeMap::new(),
            responsive_layouts: BTreeMap::new(),
            schema_version: 0,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn layout(&self, id: &str) -> Option<&Layout> {
        self.layouts.iter().find(|l| l.id == id)
    }

    pub fn color_scheme(&self, id: &str) -> Option<&ColorScheme> {
        self.theme_options.color_schemes.iter().find(|s| s.id == id)
    }

    pub fn font_pairing(&self, id: &str) -> Option<&FontPairing> {
        self.theme_options.font_pairings.iter().find(|p| p.id == id)
    }
}

/// Summary returned by template listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: TemplateCategory,
    pub preview_image: Option<String>,
    pub layout_count: usize,
    pub color_scheme_count: usize,
}

impl From<&Template> for TemplateSummary {
    fn from(t: &Template) -> Self {
        Self {
            id: t.id,
            name: t.name.clone(),
            description: t.description.clone(),
            category: t.category,
            preview_image: t.preview_image.clone(),
            layout_count: t.layouts.len(),
            color_scheme_count: t.theme_options.color_schemes.len(),
        }
    }
}
