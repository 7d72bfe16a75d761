//! Portfolio Content Merge Engine
//!
//! Applies partial section updates to a portfolio's content map. Every
//! operation works on a copy of the addressed section and commits it only
//! when the whole patch is valid; sibling sections are never touched.

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Portfolio, SectionName, SectionShape};

/// Issued by the authorization layer once the caller is known to own a
/// portfolio. The engine refuses to mutate a portfolio without a proof for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipProof {
    portfolio_id: Uuid,
    user_id: Uuid,
}

impl OwnershipProof {
    /// Succeeds only when `user_id` owns `portfolio`.
    pub fn for_owner(portfolio: &Portfolio, user_id: Uuid) -> AppResult<Self> {
        if portfolio.user_id != user_id {
            return Err(AppError::forbidden(
                "You do not have permission to modify this portfolio",
            ));
        }
        Ok(Self {
            portfolio_id: portfolio.id,
            user_id,
        })
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    fn check(&self, portfolio: &Portfolio) -> AppResult<()> {
        if self.portfolio_id != portfolio.id {
            return Err(AppError::forbidden(
                "Ownership was not verified for this portfolio",
            ));
        }
        Ok(())
    }
}

/// Addresses one item (or skill category) for deletion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSelector {
    #[serde(default, deserialize_with = "string_or_number")]
    pub item_id: Option<String>,
    #[serde(default)]
    pub item_index: Option<usize>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn section_label(section: &SectionName) -> String {
    format!("Section '{}'", section)
}

/// Stored payload as an object. Legacy bare arrays are wrapped under the
/// section's array key.
fn normalized(section: &SectionName, stored: Option<&Value>, shape: SectionShape) -> AppResult<Value> {
    match stored {
        None | Some(Value::Null) => Ok(Value::Object(Map::new())),
        Some(Value::Object(_)) => Ok(stored.cloned().unwrap_or_default()),
        Some(Value::Array(items)) => {
            let key = shape.array_key().ok_or_else(|| {
                AppError::validation(format!("{} holds an array but is not a list", section_label(section)))
            })?;
            let mut map = Map::new();
            map.insert(key.to_string(), Value::Array(items.clone()));
            Ok(Value::Object(map))
        }
        Some(_) => Err(AppError::validation(format!(
            "{} has a malformed stored payload",
            section_label(section)
        ))),
    }
}

fn validate_items(section: &SectionName, items: &[Value]) -> AppResult<()> {
    for (index, item) in items.iter().enumerate() {
        if !item.is_object() {
            return Err(AppError::validation(format!(
                "{}: item {} must be an object",
                section_label(section),
                index
            )));
        }
    }
    Ok(())
}

fn validate_categories(section: &SectionName, categories: &[Value]) -> AppResult<()> {
    for (index, category) in categories.iter().enumerate() {
        let name = category.get("name").and_then(Value::as_str).unwrap_or("");
        if name.trim().is_empty() {
            return Err(AppError::validation(format!(
                "{}: category {} requires a name",
                section_label(section),
                index
            )));
        }
        if let Some(skills) = category.get("skills") {
            if !skills.is_array() {
                return Err(AppError::validation(format!(
                    "{}: skills of category {} must be an array",
                    section_label(section),
                    index
                )));
            }
        }
    }
    Ok(())
}

fn shape_mismatch(section: &SectionName, key: &str) -> AppError {
    AppError::validation(format!(
        "{} does not accept '{}'",
        section_label(section),
        key
    ))
}

/// Apply `patch` to one section and return the updated section payload.
///
/// * `patch.items` array: replaces the section's items wholesale.
/// * `patch.categories` array: replaces the section's categories.
/// * anything else: shallow-merged into the section object.
pub fn update_section(
    portfolio: &mut Portfolio,
    proof: &OwnershipProof,
    section: &SectionName,
    patch: &Value,
) -> AppResult<Value> {
    proof.check(portfolio)?;

    let patch_obj = patch
        .as_object()
        .ok_or_else(|| AppError::validation("Section update must be a JSON object"))?;

    let stored = portfolio.section_content.get(section);
    let shape = section.shape_for(stored.or(Some(patch)));
    let mut updated = normalized(section, stored, shape)?;
    let target = updated
        .as_object_mut()
        .ok_or_else(|| AppError::validation("Section payload must be an object"))?;

    if let Some(items) = patch_obj.get("items").and_then(Value::as_array) {
        if shape != SectionShape::Items {
            return Err(shape_mismatch(section, "items"));
        }
        validate_items(section, items)?;
        target.insert("items".to_string(), Value::Array(items.clone()));
    } else if let Some(categories) = patch_obj.get("categories").and_then(Value::as_array) {
        if shape != SectionShape::Categories {
            return Err(shape_mismatch(section, "categories"));
        }
        validate_categories(section, categories)?;
        target.insert("categories".to_string(), Value::Array(categories.clone()));
    } else {
        if let Some(key) = shape.array_key() {
            if patch_obj.contains_key(key) {
                return Err(AppError::validation(format!(
                    "{}: '{}' must be an array",
                    section_label(section),
                    key
                )));
            }
        }
        for (key, value) in patch_obj {
            target.insert(key.clone(), value.clone());
        }
    }

    portfolio
        .section_content
        .insert(section.clone(), updated.clone());
    portfolio.updated_at = Utc::now();
    Ok(updated)
}

fn item_matches(item: &Value, id: &str) -> bool {
    ["id", "_id"].iter().any(|key| match item.get(*key) {
        Some(Value::String(s)) => s == id,
        Some(Value::Number(n)) => n.to_string() == id,
        _ => false,
    })
}

fn remove_at(list: &mut Vec<Value>, index: usize, what: &str) -> AppResult<Value> {
    if index >= list.len() {
        return Err(AppError::validation(format!(
            "{} index {} is out of range ({} present)",
            what,
            index,
            list.len()
        )));
    }
    Ok(list.remove(index))
}

fn array_mut<'a>(section: &SectionName, payload: &'a mut Value, key: &str) -> AppResult<&'a mut Vec<Value>> {
    payload
        .get_mut(key)
        .and_then(Value::as_array_mut)
        .ok_or_else(|| AppError::validation(format!("{} has no '{}' to delete from", section_label(section), key)))
}

fn resolve_category(categories: &[Value], id: &str) -> AppResult<usize> {
    if let Ok(index) = id.parse::<usize>() {
        if index >= categories.len() {
            return Err(AppError::validation(format!(
                "Category index {} is out of range ({} present)",
                index,
                categories.len()
            )));
        }
        return Ok(index);
    }
    categories
        .iter()
        .position(|c| item_matches(c, id) || c.get("name").and_then(Value::as_str) == Some(id))
        .ok_or_else(|| AppError::not_found(format!("Skill category '{}'", id)))
}

/// Remove one item from an array-bearing section and return the updated
/// section payload.
pub fn delete_item(
    portfolio: &mut Portfolio,
    proof: &OwnershipProof,
    section: &SectionName,
    selector: &ItemSelector,
) -> AppResult<Value> {
    proof.check(portfolio)?;

    let stored = portfolio
        .section_content
        .get(section)
        .ok_or_else(|| AppError::not_found(section_label(section)))?;
    let shape = section.shape_for(Some(stored));
    let mut updated = normalized(section, Some(stored), shape)?;

    match shape {
        SectionShape::Object => {
            return Err(AppError::validation(format!(
                "{} does not hold items",
                section_label(section)
            )));
        }
        SectionShape::Items => {
            let items = array_mut(section, &mut updated, "items")?;
            match (&selector.item_id, selector.item_index) {
                (Some(id), _) => {
                    let index = items
                        .iter()
                        .position(|item| item_matches(item, id))
                        .ok_or_else(|| AppError::not_found(format!("Item '{}'", id)))?;
                    items.remove(index);
                }
                (None, Some(index)) => {
                    remove_at(items, index, "Item")?;
                }
                (None, None) => return Err(AppError::validation("itemId or itemIndex is required")),
            }
        }
        SectionShape::Categories => {
            let categories = array_mut(section, &mut updated, "categories")?;
            match (&selector.item_id, selector.item_index) {
                (Some(id), Some(skill_index)) => {
                    let category_index = resolve_category(categories, id)?;
                    let skills = categories[category_index]
                        .get_mut("skills")
                        .and_then(Value::as_array_mut)
                        .ok_or_else(|| AppError::validation("Category has no skills"))?;
                    remove_at(skills, skill_index, "Skill")?;
                }
                (Some(id), None) => {
                    let category_index = resolve_category(categories, id)?;
                    categories.remove(category_index);
                }
                (None, Some(index)) => {
                    remove_at(categories, index, "Category")?;
                }
                (None, None) => return Err(AppError::validation("itemId or itemIndex is required")),
            }
        }
    }

    portfolio
        .section_content
        .insert(section.clone(), updated.clone());
    portfolio.updated_at = Utc::now();
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FontSet, LayoutSettings, PortfolioSettings, SectionContent};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn portfolio() -> Portfolio {
        let mut content = SectionContent::new();
        content.insert(SectionName::About, json!({ "title": "About", "bio": "Hi" }));
        content.insert(
            SectionName::Projects,
            json!({ "title": "Projects", "items": [{ "id": "a" }, { "id": "b" }] }),
        );
        content.insert(
            SectionName::Gallery,
            json!({ "items": [{ "url": "1.png" }, { "url": "2.png" }] }),
        );
        content.insert(
            SectionName::Skills,
            json!({
                "categories": [
                    { "name": "Frontend", "skills": [{ "name": "React" }, { "name": "Vue" }] },
                    { "id": "be", "name": "Backend", "skills": [{ "name": "Rust" }] }
                ]
            }),
        );
        Portfolio {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            template_id: Uuid::new_v4(),
            title: "Jane".to_string(),
            subtitle: None,
            subdomain: "jane".to_string(),
            custom_domain: None,
            is_published: false,
            settings: PortfolioSettings {
                color_scheme_id: None,
                font_pairing_id: None,
                layout_id: None,
                colors: Default::default(),
                fonts: FontSet {
                    heading: "Inter".to_string(),
                    body: "Inter".to_string(),
                    mono: None,
                },
                layout: LayoutSettings {
                    sections: vec![],
                    show_header: true,
                    show_footer: true,
                },
            },
            section_content: content,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn proof(p: &Portfolio) -> OwnershipProof {
        OwnershipProof::for_owner(p, p.user_id).unwrap()
    }

    #[test]
    fn test_non_owner_cannot_obtain_proof() {
        let p = portfolio();
        let err = OwnershipProof::for_owner(&p, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_proof_for_other_portfolio_is_rejected() {
        let other = portfolio();
        let mut p = portfolio();
        let before = p.clone();
        let err = update_section(&mut p, &proof(&other), &SectionName::About, &json!({ "bio": "x" }))
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(p, before);
    }

    #[test]
    fn test_items_update_leaves_other_sections_untouched() {
        let mut p = portfolio();
        let before = p.clone();
        let pf = proof(&p);
        update_section(&mut p, &pf, &SectionName::Projects, &json!({ "items": [{ "id": "c" }] }))
            .unwrap();

        for (name, payload) in &before.section_content {
            if *name != SectionName::Projects {
                assert_eq!(&p.section_content[name], payload);
            }
        }
        // sibling keys within the section survive too
        assert_eq!(p.section_content[&SectionName::Projects]["title"], "Projects");
    }

    #[test]
    fn test_items_are_replaced_not_appended() {
        let mut p = portfolio();
        let pf = proof(&p);
        update_section(
            &mut p,
            &pf,
            &SectionName::Projects,
            &json!({ "items": [{ "id": "A" }, { "id": "B" }] }),
        )
        .unwrap();
        let section = update_section(
            &mut p,
            &pf,
            &SectionName::Projects,
            &json!({ "items": [{ "id": "C" }] }),
        )
        .unwrap();
        assert_eq!(section["items"], json!([{ "id": "C" }]));
        assert_eq!(p.section_content[&SectionName::Projects]["items"], json!([{ "id": "C" }]));
    }

    #[test]
    fn test_scalar_section_is_shallow_merged() {
        let mut p = portfolio();
        let pf = proof(&p);
        let about = update_section(
            &mut p,
            &pf,
            &SectionName::About,
            &json!({ "bio": "Updated", "location": "Remote" }),
        )
        .unwrap();
        assert_eq!(about, json!({ "title": "About", "bio": "Updated", "location": "Remote" }));
    }

    #[test]
    fn test_categories_replace_only_categories() {
        let mut p = portfolio();
        let pf = proof(&p);
        let skills = update_section(
            &mut p,
            &pf,
            &SectionName::Skills,
            &json!({ "categories": [{ "name": "Tools", "skills": [] }] }),
        )
        .unwrap();
        assert_eq!(skills["categories"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_shape_conflation_is_rejected() {
        let mut p = portfolio();
        let before = p.clone();
        let pf = proof(&p);
        assert!(update_section(&mut p, &pf, &SectionName::About, &json!({ "items": [] })).is_err());
        assert!(
            update_section(&mut p, &pf, &SectionName::Projects, &json!({ "categories": [] }))
                .is_err()
        );
        assert!(
            update_section(&mut p, &pf, &SectionName::Projects, &json!({ "items": "nope" }))
                .is_err()
        );
        assert_eq!(p, before);
    }

    #[test]
    fn test_invalid_items_leave_content_unchanged() {
        let mut p = portfolio();
        let before = p.clone();
        let pf = proof(&p);
        let err = update_section(
            &mut p,
            &pf,
            &SectionName::Projects,
            &json!({ "items": [{ "id": "ok" }, 42] }),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(p, before);

        let err = update_section(
            &mut p,
            &pf,
            &SectionName::Skills,
            &json!({ "categories": [{ "skills": [] }] }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("requires a name"));
    }

    #[test]
    fn test_non_object_patch_is_rejected() {
        let mut p = portfolio();
        let pf = proof(&p);
        assert!(update_section(&mut p, &pf, &SectionName::About, &json!([1, 2])).is_err());
    }

    #[test]
    fn test_custom_section_shape_comes_from_first_payload() {
        let mut p = portfolio();
        let pf = proof(&p);
        let talks = SectionName::from("talks");
        update_section(&mut p, &pf, &talks, &json!({ "items": [{ "id": "t1" }] })).unwrap();
        let err = update_section(&mut p, &pf, &talks, &json!({ "categories": [] })).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_legacy_array_payload_is_wrapped() {
        let mut p = portfolio();
        p.section_content
            .insert(SectionName::Experience, json!([{ "id": "x" }]));
        let pf = proof(&p);
        let section =
            update_section(&mut p, &pf, &SectionName::Experience, &json!({ "title": "Work" }))
                .unwrap();
        assert_eq!(section, json!({ "items": [{ "id": "x" }], "title": "Work" }));
    }

    #[test]
    fn test_delete_out_of_range_index_is_validation_error() {
        let mut p = portfolio();
        let before = p.clone();
        let pf = proof(&p);
        let err = delete_item(
            &mut p,
            &pf,
            &SectionName::Gallery,
            &ItemSelector {
                item_id: None,
                item_index: Some(99),
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(p.section_content[&SectionName::Gallery], before.section_content[&SectionName::Gallery]);
    }

    #[test]
    fn test_delete_by_id_and_index() {
        let mut p = portfolio();
        let pf = proof(&p);
        let projects = delete_item(
            &mut p,
            &pf,
            &SectionName::Projects,
            &ItemSelector {
                item_id: Some("a".to_string()),
                item_index: None,
            },
        )
        .unwrap();
        assert_eq!(projects["items"], json!([{ "id": "b" }]));

        let gallery = delete_item(
            &mut p,
            &pf,
            &SectionName::Gallery,
            &ItemSelector {
                item_id: None,
                item_index: Some(0),
            },
        )
        .unwrap();
        assert_eq!(gallery["items"], json!([{ "url": "2.png" }]));
    }

    #[test]
    fn test_delete_matches_underscore_id() {
        let mut p = portfolio();
        p.section_content.insert(
            SectionName::Education,
            json!({ "items": [{ "_id": "e1" }, { "_id": "e2" }] }),
        );
        let pf = proof(&p);
        let education = delete_item(
            &mut p,
            &pf,
            &SectionName::Education,
            &ItemSelector {
                item_id: Some("e2".to_string()),
                item_index: None,
            },
        )
        .unwrap();
        assert_eq!(education["items"], json!([{ "_id": "e1" }]));
    }

    #[test]
    fn test_delete_unknown_id_is_not_found() {
        let mut p = portfolio();
        let pf = proof(&p);
        let err = delete_item(
            &mut p,
            &pf,
            &SectionName::Projects,
            &ItemSelector {
                item_id: Some("zzz".to_string()),
                item_index: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_delete_skill_within_category() {
        let mut p = portfolio();
        let pf = proof(&p);
        let skills = delete_item(
            &mut p,
            &pf,
            &SectionName::Skills,
            &ItemSelector {
                item_id: Some("0".to_string()),
                item_index: Some(1),
            },
        )
        .unwrap();
        assert_eq!(skills["categories"][0]["skills"], json!([{ "name": "React" }]));
        assert_eq!(skills["categories"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_delete_whole_category_by_id_or_name() {
        let mut p = portfolio();
        let pf = proof(&p);
        let skills = delete_item(
            &mut p,
            &pf,
            &SectionName::Skills,
            &ItemSelector {
                item_id: Some("be".to_string()),
                item_index: None,
            },
        )
        .unwrap();
        assert_eq!(skills["categories"].as_array().unwrap().len(), 1);

        let skills = delete_item(
            &mut p,
            &pf,
            &SectionName::Skills,
            &ItemSelector {
                item_id: Some("Frontend".to_string()),
                item_index: None,
            },
        )
        .unwrap();
        assert_eq!(skills["categories"], json!([]));
    }

    #[test]
    fn test_delete_skill_out_of_range() {
        let mut p = portfolio();
        let pf = proof(&p);
        let err = delete_item(
            &mut p,
            &pf,
            &SectionName::Skills,
            &ItemSelector {
                item_id: Some("1".to_string()),
                item_index: Some(5),
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_delete_from_scalar_section_or_without_selector() {
        let mut p = portfolio();
        let pf = proof(&p);
        let err = delete_item(
            &mut p,
            &pf,
            &SectionName::About,
            &ItemSelector {
                item_id: None,
                item_index: Some(0),
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = delete_item(&mut p, &pf, &SectionName::Projects, &ItemSelector::default())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_delete_from_missing_section_is_not_found() {
        let mut p = portfolio();
        let pf = proof(&p);
        let err = delete_item(
            &mut p,
            &pf,
            &SectionName::Pricing,
            &ItemSelector {
                item_id: None,
                item_index: Some(0),
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_selector_accepts_numeric_item_id() {
        let selector: ItemSelector =
            serde_json::from_value(json!({ "itemId": 2, "itemIndex": 1 })).unwrap();
        assert_eq!(selector.item_id.as_deref(), Some("2"));
        assert_eq!(selector.item_index, Some(1));
    }
}
