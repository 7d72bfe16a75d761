//! Section names and the payload shape each one carries.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A named content block. Known sections have a fixed payload shape;
/// anything else is carried as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SectionName {
    Header,
    About,
    Projects,
    Work,
    Skills,
    Experience,
    Education,
    Gallery,
    Galleries,
    Categories,
    Services,
    Pricing,
    Clients,
    Testimonials,
    Contact,
    Custom(String),
}

/// How a section stores its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionShape {
    /// `{ items: [...] }`
    Items,
    /// `{ categories: [{ name, skills: [...] }] }`
    Categories,
    /// Flat key/value payload.
    Object,
}

impl SectionShape {
    /// Key of the array a section of this shape holds, if any.
    pub fn array_key(self) -> Option<&'static str> {
        match self {
            SectionShape::Items => Some("items"),
            SectionShape::Categories => Some("categories"),
            SectionShape::Object => None,
        }
    }
}

impl SectionName {
    pub fn as_str(&self) -> &str {
        match self {
            SectionName::Header => "header",
            SectionName::About => "about",
            SectionName::Projects => "projects",
            SectionName::Work => "work",
            SectionName::Skills => "skills",
            SectionName::Experience => "experience",
            SectionName::Education => "education",
            SectionName::Gallery => "gallery",
            SectionName::Galleries => "galleries",
            SectionName::Categories => "categories",
            SectionName::Services => "services",
            SectionName::Pricing => "pricing",
            SectionName::Clients => "clients",
            SectionName::Testimonials => "testimonials",
            SectionName::Contact => "contact",
            SectionName::Custom(name) => name,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, SectionName::Custom(_))
    }

    /// Fixed shape of a known section. Custom sections have none; their
    /// shape is read from the stored payload instead.
    pub fn known_shape(&self) -> Option<SectionShape> {
        match self {
            SectionName::Header | SectionName::About | SectionName::Contact => {
                Some(SectionShape::Object)
            }
            SectionName::Skills => Some(SectionShape::Categories),
            SectionName::Custom(_) => None,
            _ => Some(SectionShape::Items),
        }
    }

    /// Shape of this section given its currently stored payload.
    pub fn shape_for(&self, stored: Option<&Value>) -> SectionShape {
        if let Some(shape) = self.known_shape() {
            return shape;
        }
        match stored {
            Some(v) if v.get("items").map(Value::is_array).unwrap_or(false) => SectionShape::Items,
            Some(v) if v.get("categories").map(Value::is_array).unwrap_or(false) => {
                SectionShape::Categories
            }
            _ => SectionShape::Object,
        }
    }

    /// Display title, e.g. `testimonials` -> `Testimonials`.
    pub fn title(&self) -> String {
        capitalize(self.as_str())
    }
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl From<&str> for SectionName {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "header" => SectionName::Header,
            "about" => SectionName::About,
            "projects" => SectionName::Projects,
            "work" => SectionName::Work,
            "skills" => SectionName::Skills,
            "experience" => SectionName::Experience,
            "education" => SectionName::Education,
            "gallery" => SectionName::Gallery,
            "galleries" => SectionName::Galleries,
            "categories" => SectionName::Categories,
            "services" => SectionName::Services,
            "pricing" => SectionName::Pricing,
            "clients" => SectionName::Clients,
            "testimonials" => SectionName::Testimonials,
            "contact" => SectionName::Contact,
            _ => SectionName::Custom(s.trim().to_string()),
        }
    }
}

impl From<String> for SectionName {
    fn from(s: String) -> Self {
        SectionName::from(s.as_str())
    }
}

impl From<SectionName> for String {
    fn from(name: SectionName) -> Self {
        name.as_str().to_string()
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_known_names_parse_case_insensitively() {
        assert_eq!(SectionName::from("Projects"), SectionName::Projects);
        assert_eq!(SectionName::from(" skills "), SectionName::Skills);
    }

    #[test]
    fn test_unknown_name_is_custom() {
        let name = SectionName::from("podcasts");
        assert_eq!(name, SectionName::Custom("podcasts".to_string()));
        assert_eq!(name.as_str(), "podcasts");
        assert!(name.known_shape().is_none());
    }

    #[test]
    fn test_known_shapes() {
        assert_eq!(SectionName::About.known_shape(), Some(SectionShape::Object));
        assert_eq!(SectionName::Gallery.known_shape(), Some(SectionShape::Items));
        assert_eq!(
            SectionName::Skills.known_shape(),
            Some(SectionShape::Categories)
        );
    }

    #[test]
    fn test_custom_shape_follows_stored_payload() {
        let name = SectionName::from("talks");
        let stored = serde_json::json!({ "items": [] });
        assert_eq!(name.shape_for(Some(&stored)), SectionShape::Items);
        assert_eq!(name.shape_for(None), SectionShape::Object);
    }

    #[test]
    fn test_section_name_works_as_json_map_key() {
        let mut map = BTreeMap::new();
        map.insert(SectionName::About, 1);
        map.insert(SectionName::from("talks"), 2);
        let json = serde_json::to_string(&map).unwrap();
        let back: BTreeMap<SectionName, i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(&SectionName::About), Some(&1));
        assert_eq!(back.get(&SectionName::from("talks")), Some(&2));
    }

    #[test]
    fn test_title_capitalizes() {
        assert_eq!(SectionName::Testimonials.title(), "Testimonials");
    }
}
