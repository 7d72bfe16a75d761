//! Portfolio document model - a user's instantiation of a template.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::section::SectionName;
use super::template::{ColorMap, FontSet};

/// Section name -> section payload.
pub type SectionContent = BTreeMap<SectionName, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSettings {
    #[serde(default)]
    pub sections: Vec<SectionName>,
    #[serde(default = "default_true")]
    pub show_header: bool,
    #[serde(default = "default_true")]
    pub show_footer: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_scheme_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_pairing_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_id: Option<String>,
    #[serde(default)]
    pub colors: ColorMap,
    pub fonts: FontSet,
    pub layout: LayoutSettings,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: Uuid,
    pub user_id: Uuid,
    pub template_id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub subdomain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    pub settings: PortfolioSettings,
    #[serde(default, alias = "content")]
    pub section_content: SectionContent,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subdomains that address the service itself.
pub const RESERVED_SUBDOMAINS: &[&str] = &["www", "api", "admin", "app", "mail", "static"];

pub const SUBDOMAIN_MIN_LEN: usize = 3;
pub const SUBDOMAIN_MAX_LEN: usize = 63;

lazy_static! {
    /// Lowercase letters, digits and inner hyphens
    static ref SUBDOMAIN_REGEX: Regex = Regex::new(r"^[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$").unwrap();
}

/// Check a subdomain, returning a message describing the first problem.
/// Input is never normalized: `Jane` is rejected rather than lowercased.
pub fn validate_subdomain(subdomain: &str) -> Result<(), String> {
    if subdomain.len() < SUBDOMAIN_MIN_LEN {
        return Err(format!(
            "Subdomain must be at least {} characters long",
            SUBDOMAIN_MIN_LEN
        ));
    }
    if subdomain.len() > SUBDOMAIN_MAX_LEN {
        return Err(format!(
            "Subdomain must be at most {} characters long",
            SUBDOMAIN_MAX_LEN
        ));
    }
    if !SUBDOMAIN_REGEX.is_match(subdomain) {
        return Err(
            "Subdomain may only contain lowercase letters, numbers and inner hyphens".to_string(),
        );
    }
    if RESERVED_SUBDOMAINS.contains(&subdomain) {
        return Err(format!("Subdomain '{}' is reserved", subdomain));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_subdomains() {
        assert!(validate_subdomain("jane").is_ok());
        assert!(validate_subdomain("jane-doe-2").is_ok());
        assert!(validate_subdomain("abc").is_ok());
    }

    #[test]
    fn test_short_subdomain_rejected() {
        assert!(validate_subdomain("ab").is_err());
    }

    #[test]
    fn test_uppercase_subdomain_rejected_not_coerced() {
        assert!(validate_subdomain("Jane").is_err());
    }

    #[test]
    fn test_edge_hyphens_and_symbols_rejected() {
        assert!(validate_subdomain("-jane").is_err());
        assert!(validate_subdomain("jane-").is_err());
        assert!(validate_subdomain("jane_doe").is_err());
        assert!(validate_subdomain("jane.doe").is_err());
    }

    #[test]
    fn test_reserved_subdomain_rejected() {
        let err = validate_subdomain("admin").unwrap_err();
        assert!(err.contains("reserved"));
    }

    #[test]
    fn test_content_alias_accepted_on_input() {
        let doc = serde_json::json!({
            "id": Uuid::new_v4(),
            "userId": Uuid::new_v4(),
            "templateId": Uuid::new_v4(),
            "title": "Jane",
            "subdomain": "jane",
            "settings": {
                "colors": {},
                "fonts": { "heading": "Inter", "body": "Inter" },
                "layout": { "sections": ["about"] }
            },
            "content": { "about": { "bio": "hi" } },
            "createdAt": Utc::now(),
            "updatedAt": Utc::now()
        });
        let p: Portfolio = serde_json::from_value(doc).unwrap();
        assert_eq!(p.section_content[&SectionName::About]["bio"], "hi");
        assert!(p.settings.layout.show_header);
        assert!(!p.is_published);
    }
}
