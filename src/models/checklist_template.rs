use crate::database::get_db;
use crate::error::CompletionError;
use crate::models::checklist_item::ChecklistCategoryKind;
use mongodb::{
    bson::{doc, oid::ObjectId},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct ChecklistTemplate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub org_id: ObjectId,
    pub item: Vec<ChecklistTemplateItem>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChecklistTemplateItem {
    pub category: ChecklistCategoryKind,
    pub name: String,
    pub is_required: bool,
    pub sort_order: i32,
}

impl ChecklistTemplate {
    pub async fn find_by_org(org_id: &ObjectId) -> Result<Option<ChecklistTemplate>, CompletionError> {
        let db: Database = get_db();
        let collection: Collection<ChecklistTemplate> =
            db.collection::<ChecklistTemplate>("checklist-templates");

        collection
            .find_one(doc! { "org_id": org_id }, None)
            .await
            .map_err(|_| CompletionError::Database("COLLECTING_FAILED"))
    }

    /// Fallback checklist used when an organization has not stored its own.
    pub fn default_items() -> Vec<ChecklistTemplateItem> {
        let items = [
            (ChecklistCategoryKind::Safety, "Air monitoring clearance passed", true),
            (ChecklistCategoryKind::Safety, "Containment barriers removed", true),
            (ChecklistCategoryKind::Safety, "Respirators decontaminated and stored", false),
            (ChecklistCategoryKind::Quality, "Abated surfaces visually inspected", true),
            (ChecklistCategoryKind::Quality, "Final walkthrough with site supervisor", true),
            (ChecklistCategoryKind::Cleanup, "Work area HEPA vacuumed", true),
            (ChecklistCategoryKind::Cleanup, "Decontamination unit broken down", false),
            (ChecklistCategoryKind::Cleanup, "Waste staged for licensed transport", true),
            (ChecklistCategoryKind::Documentation, "Waste manifests signed", true),
            (ChecklistCategoryKind::Documentation, "Disposal receipts collected", false),
            (ChecklistCategoryKind::Documentation, "Completion photos uploaded", true),
        ];

        items
            .into_iter()
            .enumerate()
            .map(|(index, (category, name, is_required))| ChecklistTemplateItem {
                category,
                name: name.to_string(),
                is_required,
                sort_order: index as i32,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_has_required_items_in_every_fixed_category() {
        let items = ChecklistTemplate::default_items();
        for category in [
            ChecklistCategoryKind::Safety,
            ChecklistCategoryKind::Quality,
            ChecklistCategoryKind::Cleanup,
            ChecklistCategoryKind::Documentation,
        ] {
            assert!(items
                .iter()
                .any(|item| item.category == category && item.is_required));
        }
    }

    #[test]
    fn default_template_sort_order_is_stable() {
        let items = ChecklistTemplate::default_items();
        let orders: Vec<i32> = items.iter().map(|item| item.sort_order).collect();
        let mut sorted = orders.clone();
        sorted.sort_unstable();
        assert_eq!(orders, sorted);
    }
}
