use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::categories::models::{Category, SortDirection, SortField};
use crate::shared::validation::validate_image_url;

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`)
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

// Create request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryDto {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 500, message = "Description cannot be more than 500 characters"))]
    pub description: Option<String>,

    pub parent_id: Option<Uuid>,

    #[validate(custom(function = "validate_image_url"))]
    pub image_url: Option<String>,
}

impl CreateCategoryDto {
    /// Trim text fields; a blank description counts as absent
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            description: trimmed(self.description).filter(|d| !d.is_empty()),
            parent_id: self.parent_id,
            image_url: trimmed(self.image_url),
        }
    }
}

// Update request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryDto {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    /// An empty string clears the description
    #[validate(length(max = 500, message = "Description cannot be more than 500 characters"))]
    pub description: Option<String>,

    /// Omit to keep the parent, `null` to make the category a root
    #[serde(default, deserialize_with = "deserialize_present")]
    #[schema(value_type = Option<Uuid>)]
    pub parent_id: Option<Option<Uuid>>,

    #[validate(custom(function = "validate_image_url"))]
    pub image_url: Option<String>,

    pub is_active: Option<bool>,
}

impl UpdateCategoryDto {
    pub fn normalized(self) -> Self {
        Self {
            name: trimmed(self.name),
            description: trimmed(self.description),
            parent_id: self.parent_id,
            image_url: trimmed(self.image_url),
            is_active: self.is_active,
        }
    }
}

// Query params for listing categories
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CategoryQueryParams {
    /// Case-insensitive substring of the category name
    pub name: Option<String>,

    /// Parent category id, or `null` for root categories
    pub parent_id: Option<String>,

    /// Filter by active status
    pub is_active: Option<bool>,

    /// Page number (1-indexed, default: 1)
    #[param(minimum = 1)]
    pub page: Option<i64>,

    /// Items per page (default: 10, max: 100)
    #[param(minimum = 1, maximum = 100)]
    pub limit: Option<i64>,

    /// Sort field (default: name)
    #[serde(default)]
    pub sort_by: SortField,

    /// Sort direction (default: asc)
    #[serde(default)]
    pub sort_order: SortDirection,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CategoryTreeQuery {
    /// Only include categories with this active status
    pub is_active: Option<bool>,
}

/// Minimal view of a parent category embedded in responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryParentDto {
    pub id: Uuid,
    pub name: String,
}

impl From<&Category> for CategoryParentDto {
    fn from(c: &Category) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
        }
    }
}

/// Response DTO for category
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponseDto {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<CategoryParentDto>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: String,
    pub level: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CategoryResponseDto {
    pub fn with_parent(mut self, parent: Option<CategoryParentDto>) -> Self {
        self.parent = parent;
        self
    }
}

impl From<Category> for CategoryResponseDto {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            parent_id: c.parent_id,
            parent: None,
            name: c.name,
            slug: c.slug,
            description: c.description,
            image_url: c.image_url,
            level: c.level,
            is_active: c.is_active,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Response DTO for category tree (hierarchical structure)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(no_recursion)]
pub struct CategoryTreeDto {
    #[serde(flatten)]
    pub category: CategoryResponseDto,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CategoryTreeDto>,
}

impl CategoryTreeDto {
    /// Build the forest from a flat snapshot of categories.
    ///
    /// Siblings are ordered by name (stable). Categories whose parent is not in
    /// the snapshot are unreachable from a root and left out. Assembly is
    /// iterative so deep chains do not grow the call stack.
    pub fn build_tree(mut categories: Vec<Category>) -> Vec<CategoryTreeDto> {
        categories.sort_by(|a, b| a.name.cmp(&b.name));

        let mut roots: Vec<usize> = Vec::new();
        let mut children: HashMap<Uuid, Vec<usize>> = HashMap::new();
        for (idx, category) in categories.iter().enumerate() {
            match category.parent_id {
                None => roots.push(idx),
                Some(parent_id) => children.entry(parent_id).or_default().push(idx),
            }
        }

        // Pre-order walk; reversing it visits every child before its parent
        let mut order = Vec::with_capacity(categories.len());
        let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            order.push(idx);
            if let Some(kids) = children.get(&categories[idx].id) {
                stack.extend(kids.iter().rev());
            }
        }

        let mut slots: Vec<Option<Category>> = categories.into_iter().map(Some).collect();
        let mut built: Vec<Option<CategoryTreeDto>> = (0..slots.len()).map(|_| None).collect();

        for &idx in order.iter().rev() {
            let Some(category) = slots[idx].take() else {
                continue;
            };
            let kids = children
                .get(&category.id)
                .map(|kids| kids.iter().filter_map(|&k| built[k].take()).collect())
                .unwrap_or_default();

            built[idx] = Some(CategoryTreeDto {
                category: category.into(),
                children: kids,
            });
        }

        roots.into_iter().filter_map(|r| built[r].take()).collect()
    }

    /// Number of nodes in this subtree, including itself
    pub fn size(&self) -> usize {
        let mut total = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            total += 1;
            stack.extend(node.children.iter());
        }
        total
    }
}

// Tear nested children down from a flat stack so deep chains do not
// recurse once per level on drop
impl Drop for CategoryTreeDto {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str, parent_id: Option<Uuid>) -> Category {
        let now = Utc::now();
        Category {
            id: Uuid::now_v7(),
            parent_id,
            name: name.to_string(),
            slug: name.to_lowercase(),
            description: None,
            image_url: String::new(),
            level: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_build_tree_nests_chain() {
        let r = category("R", None);
        let a = category("A", Some(r.id));
        let b = category("B", Some(a.id));

        let tree = CategoryTreeDto::build_tree(vec![b.clone(), r.clone(), a.clone()]);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].category.id, r.id);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].category.id, a.id);
        assert_eq!(tree[0].children[0].children.len(), 1);
        assert_eq!(tree[0].children[0].children[0].category.id, b.id);
        assert!(tree[0].children[0].children[0].children.is_empty());
    }

    #[test]
    fn test_build_tree_orders_siblings_by_name() {
        let root = category("Root", None);
        let zed = category("Zed", Some(root.id));
        let alpha = category("Alpha", Some(root.id));
        let other_root = category("Books", None);

        let tree = CategoryTreeDto::build_tree(vec![
            root.clone(),
            zed.clone(),
            alpha.clone(),
            other_root.clone(),
        ]);

        let root_names: Vec<_> = tree.iter().map(|n| n.category.name.as_str()).collect();
        assert_eq!(root_names, vec!["Books", "Root"]);
        let child_names: Vec<_> = tree[1]
            .children
            .iter()
            .map(|n| n.category.name.as_str())
            .collect();
        assert_eq!(child_names, vec!["Alpha", "Zed"]);
    }

    #[test]
    fn test_build_tree_skips_orphans_and_cycles() {
        let root = category("Root", None);
        let orphan = category("Orphan", Some(Uuid::now_v7()));
        let mut x = category("X", None);
        let mut y = category("Y", Some(x.id));
        x.parent_id = Some(y.id);
        y.parent_id = Some(x.id);

        let tree = CategoryTreeDto::build_tree(vec![root.clone(), orphan, x, y]);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].category.id, root.id);
        assert_eq!(tree[0].size(), 1);
    }

    #[test]
    fn test_build_tree_handles_deep_chains() {
        let mut categories = Vec::new();
        let mut parent = None;
        for i in 0..5000 {
            let c = category(&format!("node-{:05}", i), parent);
            parent = Some(c.id);
            categories.push(c);
        }

        let tree = CategoryTreeDto::build_tree(categories);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].size(), 5000);

        // Dropped here at full depth
        drop(tree);
    }

    #[test]
    fn test_dropping_a_very_deep_tree_does_not_recurse() {
        let mut node = CategoryTreeDto {
            category: category("leaf", None).into(),
            children: Vec::new(),
        };
        for i in 0..200_000 {
            node = CategoryTreeDto {
                category: category(&format!("n{}", i), None).into(),
                children: vec![node],
            };
        }
        assert_eq!(node.size(), 200_001);
        drop(node);
    }

    #[test]
    fn test_tree_json_omits_empty_children() {
        let r = category("R", None);
        let a = category("A", Some(r.id));
        let tree = CategoryTreeDto::build_tree(vec![r, a]);

        let value = serde_json::to_value(&tree).unwrap();
        assert_eq!(value[0]["name"], "R");
        assert_eq!(value[0]["children"][0]["name"], "A");
        assert!(value[0]["children"][0].get("children").is_none());
        assert!(value[0].get("parent").is_none());
        assert!(value[0].get("isActive").is_some());
    }

    #[test]
    fn test_update_dto_distinguishes_null_parent() {
        let absent: UpdateCategoryDto = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(absent.parent_id, None);

        let root: UpdateCategoryDto = serde_json::from_str(r#"{"parentId":null}"#).unwrap();
        assert_eq!(root.parent_id, Some(None));

        let id = Uuid::now_v7();
        let moved: UpdateCategoryDto =
            serde_json::from_str(&format!(r#"{{"parentId":"{}"}}"#, id)).unwrap();
        assert_eq!(moved.parent_id, Some(Some(id)));
    }

    #[test]
    fn test_create_dto_validation() {
        let ok = CreateCategoryDto {
            name: "  Garden  ".to_string(),
            description: Some("   ".to_string()),
            parent_id: None,
            image_url: Some("".to_string()),
        }
        .normalized();
        assert_eq!(ok.name, "Garden");
        assert_eq!(ok.description, None);
        assert!(ok.validate().is_ok());

        let blank = CreateCategoryDto {
            name: "   ".to_string(),
            description: None,
            parent_id: None,
            image_url: None,
        }
        .normalized();
        assert!(blank.validate().is_err());

        let long = CreateCategoryDto {
            name: "x".repeat(101),
            description: Some("y".repeat(501)),
            parent_id: None,
            image_url: Some("nope".to_string()),
        };
        let errors = long.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 3);
    }
}
