//! Boxes and the physical items they contain

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::enums::ItemStatus;

/// A box grouping items that are borrowed together
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemBox {
    pub id: Uuid,
    pub name: String,
    pub box_type: String,
    pub cover_image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Box with item counts for listing
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedBox {
    #[serde(flatten)]
    pub item_box: ItemBox,
    pub item_count: usize,
    pub available_count: usize,
}

/// One physical item
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    pub box_id: Uuid,
    pub name: String,
    pub status: ItemStatus,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data needed to insert an item
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub box_id: Uuid,
    pub name: String,
    pub image_url: String,
}

/// Desired quantity of identically named items in a box
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemSpec {
    #[validate(length(min = 1, message = "Item name is required"))]
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    #[validate(range(min = 0, max = 500, message = "Quantity must be between 0 and 500"))]
    pub quantity: u32,
}

/// Create box request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBox {
    #[validate(length(min = 1, message = "Box name is required"))]
    pub name: String,
    #[serde(default)]
    pub box_type: String,
    pub cover_image_url: Option<String>,
    #[validate(nested)]
    #[serde(default)]
    pub items: Vec<ItemSpec>,
}

/// Update box request; `items` replaces the full item configuration
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBox {
    #[validate(length(min = 1, message = "Box name cannot be empty"))]
    pub name: Option<String>,
    pub box_type: Option<String>,
    pub cover_image_url: Option<String>,
    #[validate(nested)]
    pub items: Vec<ItemSpec>,
}

/// Data needed to insert a box
#[derive(Debug, Clone)]
pub struct NewBox {
    pub name: String,
    pub box_type: String,
    pub cover_image_url: String,
}

/// Field changes applied to a stored box
#[derive(Debug, Clone, Default)]
pub struct BoxPatch {
    pub name: Option<String>,
    pub box_type: Option<String>,
    pub cover_image_url: Option<String>,
}

/// Item changes needed to bring a box in line with a new configuration
#[derive(Debug, Default, PartialEq)]
pub struct ItemPlan {
    /// (item id, new image url)
    pub retag: Vec<(Uuid, String)>,
    pub add: Vec<NewItem>,
    pub remove: Vec<Uuid>,
}

/// Plan the item changes for a box update.
///
/// Items are matched by name. Raising a quantity adds available items,
/// lowering it removes available items only (borrowed ones are kept even if
/// that leaves the box above target), and names absent from `specs` are
/// removed outright.
pub fn plan_item_changes(box_id: Uuid, existing: &[Item], specs: &[ItemSpec]) -> ItemPlan {
    let mut plan = ItemPlan::default();
    let mut kept = std::collections::HashSet::new();

    for spec in specs {
        let matches: Vec<&Item> = existing.iter().filter(|i| i.name == spec.name).collect();

        for item in &matches {
            if item.image_url != spec.image_url {
                plan.retag.push((item.id, spec.image_url.clone()));
            }
        }

        let current = matches.len();
        let target = spec.quantity as usize;

        if target >= current {
            kept.extend(matches.iter().map(|i| i.id));
            for _ in current..target {
                plan.add.push(NewItem {
                    box_id,
                    name: spec.name.clone(),
                    image_url: spec.image_url.clone(),
                });
            }
        } else {
            let mut to_remove = current - target;
            for item in &matches {
                if to_remove > 0 && item.status == ItemStatus::Available {
                    to_remove -= 1;
                } else {
                    kept.insert(item.id);
                }
            }
        }
    }

    plan.remove = existing
        .iter()
        .filter(|i| !kept.contains(&i.id))
        .map(|i| i.id)
        .collect();
    plan.retag.retain(|(id, _)| kept.contains(id));

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(box_id: Uuid, name: &str, status: ItemStatus) -> Item {
        Item {
            id: Uuid::new_v4(),
            box_id,
            name: name.to_string(),
            status,
            image_url: "img".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn spec(name: &str, quantity: u32) -> ItemSpec {
        ItemSpec {
            name: name.to_string(),
            image_url: "img".to_string(),
            quantity,
        }
    }

    #[test]
    fn test_plan_adds_missing_quantity() {
        let box_id = Uuid::new_v4();
        let existing = vec![item(box_id, "stapler", ItemStatus::Available)];
        let plan = plan_item_changes(box_id, &existing, &[spec("stapler", 3)]);
        assert_eq!(plan.add.len(), 2);
        assert!(plan.remove.is_empty());
        assert!(plan.retag.is_empty());
    }

    #[test]
    fn test_plan_removes_only_available_items() {
        let box_id = Uuid::new_v4();
        let borrowed = item(box_id, "scissors", ItemStatus::Borrowing);
        let free = item(box_id, "scissors", ItemStatus::Available);
        let existing = vec![borrowed.clone(), free.clone()];

        let plan = plan_item_changes(box_id, &existing, &[spec("scissors", 0)]);
        assert_eq!(plan.remove, vec![free.id]);
    }

    #[test]
    fn test_plan_drops_unlisted_names() {
        let box_id = Uuid::new_v4();
        let gone = item(box_id, "tape", ItemStatus::Available);
        let stays = item(box_id, "ruler", ItemStatus::Available);
        let plan = plan_item_changes(box_id, &[gone.clone(), stays], &[spec("ruler", 1)]);
        assert_eq!(plan.remove, vec![gone.id]);
        assert!(plan.add.is_empty());
    }

    #[test]
    fn test_plan_retags_kept_items() {
        let box_id = Uuid::new_v4();
        let existing = vec![item(box_id, "pen", ItemStatus::Available)];
        let mut new_spec = spec("pen", 1);
        new_spec.image_url = "new-img".to_string();
        let plan = plan_item_changes(box_id, &existing, &[new_spec]);
        assert_eq!(plan.retag, vec![(existing[0].id, "new-img".to_string())]);
    }
}
