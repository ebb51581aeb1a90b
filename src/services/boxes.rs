//! Box and item management service

use std::sync::Arc;

use uuid::Uuid;

use super::bus::{ChangeBus, ChangedEntity};
use crate::{
    clock::Clock,
    error::AppResult,
    models::{
        item_box::{plan_item_changes, BoxPatch, CreateBox, ItemSpec, NewBox, NewItem, UpdateBox},
        Item, ItemBox, ItemStatus, PopulatedBox,
    },
    repository::{BoxStore, ItemStore, Store},
};

#[derive(Clone)]
pub struct BoxesService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    bus: ChangeBus,
}

fn populate(item_box: ItemBox, items: &[Item]) -> PopulatedBox {
    let contained = items.iter().filter(|i| i.box_id == item_box.id);
    let (item_count, available_count) = contained.fold((0, 0), |(total, free), item| {
        (total + 1, free + usize::from(item.status == ItemStatus::Available))
    });

    PopulatedBox {
        item_box,
        item_count,
        available_count,
    }
}

fn expand_specs(box_id: Uuid, specs: &[ItemSpec]) -> Vec<NewItem> {
    specs
        .iter()
        .flat_map(|spec| {
            (0..spec.quantity).map(move |_| NewItem {
                box_id,
                name: spec.name.clone(),
                image_url: spec.image_url.clone(),
            })
        })
        .collect()
}

impl BoxesService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, bus: ChangeBus) -> Self {
        Self { store, clock, bus }
    }

    /// All boxes with their item counts
    pub async fn list(&self) -> AppResult<Vec<PopulatedBox>> {
        let boxes = self.store.box_list().await?;
        let items = self.store.item_list(None).await?;
        Ok(boxes.into_iter().map(|b| populate(b, &items)).collect())
    }

    pub async fn get(&self, box_id: Uuid) -> AppResult<PopulatedBox> {
        let item_box = self.store.box_get(box_id).await?;
        let items = self.store.item_list(Some(box_id)).await?;
        Ok(populate(item_box, &items))
    }

    pub async fn items(&self, box_id: Uuid) -> AppResult<Vec<Item>> {
        self.store.box_get(box_id).await?;
        self.store.item_list(Some(box_id)).await
    }

    pub async fn all_items(&self) -> AppResult<Vec<Item>> {
        self.store.item_list(None).await
    }

    /// Create a box and `quantity` available items per item spec
    pub async fn create(&self, request: CreateBox) -> AppResult<PopulatedBox> {
        let now = self.clock.now();
        let item_box = self
            .store
            .box_insert(
                &NewBox {
                    name: request.name.trim().to_string(),
                    box_type: request.box_type,
                    cover_image_url: request.cover_image_url.unwrap_or_default(),
                },
                now,
            )
            .await?;

        let items = self
            .store
            .item_insert(&expand_specs(item_box.id, &request.items), now)
            .await?;

        tracing::info!(box_id = %item_box.id, items = items.len(), "Box created");
        self.bus.publish(ChangedEntity::Boxes, now);
        self.bus.publish(ChangedEntity::Items, now);
        Ok(populate(item_box, &items))
    }

    /// Update box fields and reconcile its items with the requested configuration
    pub async fn update(&self, box_id: Uuid, request: UpdateBox) -> AppResult<PopulatedBox> {
        let now = self.clock.now();
        let patch = BoxPatch {
            name: request.name.map(|n| n.trim().to_string()),
            box_type: request.box_type,
            cover_image_url: request.cover_image_url,
        };
        let item_box = self.store.box_update(box_id, &patch, now).await?;

        let existing = self.store.item_list(Some(box_id)).await?;
        let plan = plan_item_changes(box_id, &existing, &request.items);

        for (item_id, image_url) in &plan.retag {
            self.store.item_set_image(*item_id, image_url, now).await?;
        }
        self.store.item_insert(&plan.add, now).await?;
        self.store.item_delete(&plan.remove).await?;

        tracing::info!(
            box_id = %box_id,
            added = plan.add.len(),
            removed = plan.remove.len(),
            "Box updated"
        );
        self.bus.publish(ChangedEntity::Boxes, now);
        self.bus.publish(ChangedEntity::Items, now);

        let items = self.store.item_list(Some(box_id)).await?;
        Ok(populate(item_box, &items))
    }

    /// Delete a box and its items; borrow records are kept
    pub async fn delete(&self, box_id: Uuid) -> AppResult<()> {
        self.store.box_delete(box_id).await?;
        tracing::info!(box_id = %box_id, "Box deleted");
        let now = self.clock.now();
        self.bus.publish(ChangedEntity::Boxes, now);
        self.bus.publish(ChangedEntity::Items, now);
        Ok(())
    }
}
