use crate::database::get_db;
use crate::error::CompletionError;
use crate::models::checklist_template::ChecklistTemplate;
use crate::models::job_completion::JobCompletion;
use futures::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, to_bson, DateTime},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistCategoryKind {
    Safety,
    Quality,
    Cleanup,
    Documentation,
    Custom,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChecklistItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub job_id: ObjectId,
    pub category: ChecklistCategoryKind,
    pub name: String,
    pub is_required: bool,
    pub is_completed: bool,
    pub completed_at: Option<DateTime>,
    pub completed_by: Option<ObjectId>,
    pub completion_notes: Option<String>,
    pub evidence_photo_id: Vec<ObjectId>,
    pub sort_order: i32,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ChecklistItemUpdateRequest {
    pub name: Option<String>,
    pub is_completed: Option<bool>,
    pub completion_notes: Option<String>,
    pub evidence_photo_id: Option<Vec<ObjectId>>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ChecklistProgress {
    pub completed_count: u64,
    pub required_completed_count: u64,
    pub required_total: u64,
    pub total: u64,
}

#[derive(Debug, Default, Serialize)]
pub struct ChecklistGroupedResponse {
    pub safety: Vec<ChecklistItem>,
    pub quality: Vec<ChecklistItem>,
    pub cleanup: Vec<ChecklistItem>,
    pub documentation: Vec<ChecklistItem>,
    pub custom: Vec<ChecklistItem>,
}

impl ChecklistItem {
    /// Copies the organization template into per-job rows. Calling it again
    /// once items exist returns the existing set untouched.
    pub async fn initialize(
        job_id: &ObjectId,
        org_id: &ObjectId,
    ) -> Result<Vec<ChecklistItem>, CompletionError> {
        let existing = Self::find_by_job(job_id).await?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        let template_items = match ChecklistTemplate::find_by_org(org_id).await? {
            Some(template) => template.item,
            None => ChecklistTemplate::default_items(),
        };

        let items: Vec<ChecklistItem> = template_items
            .into_iter()
            .map(|template_item| ChecklistItem {
                _id: Some(ObjectId::new()),
                job_id: *job_id,
                category: template_item.category,
                name: template_item.name,
                is_required: template_item.is_required,
                is_completed: false,
                completed_at: None,
                completed_by: None,
                completion_notes: None,
                evidence_photo_id: Vec::new(),
                sort_order: template_item.sort_order,
            })
            .collect();

        if items.is_empty() {
            return Ok(items);
        }

        let db: Database = get_db();
        let collection: Collection<ChecklistItem> = db.collection::<ChecklistItem>("checklist-items");

        collection
            .insert_many(&items, None)
            .await
            .map_err(|_| CompletionError::Database("INSERTING_FAILED"))?;

        Ok(items)
    }

    pub async fn update(
        _id: &ObjectId,
        payload: ChecklistItemUpdateRequest,
        actor: ObjectId,
    ) -> Result<ChecklistItem, CompletionError> {
        let mut item = Self::find_by_id(_id)
            .await?
            .ok_or(CompletionError::NotFound("CHECKLIST_ITEM"))?;
        JobCompletion::ensure_open(&item.job_id).await?;

        item.apply(payload, actor, DateTime::now());

        let db: Database = get_db();
        let collection: Collection<ChecklistItem> = db.collection::<ChecklistItem>("checklist-items");

        collection
            .update_one(
                doc! { "_id": item._id.unwrap() },
                doc! { "$set": to_bson::<ChecklistItem>(&item).unwrap() },
                None,
            )
            .await
            .map_err(|_| CompletionError::Database("UPDATE_FAILED"))?;

        Ok(item)
    }

    pub fn apply(&mut self, payload: ChecklistItemUpdateRequest, actor: ObjectId, now: DateTime) {
        if let Some(name) = payload.name {
            self.name = name;
        }
        if let Some(notes) = payload.completion_notes {
            self.completion_notes = Some(notes);
        }
        if let Some(evidence) = payload.evidence_photo_id {
            self.evidence_photo_id = evidence;
        }
        match payload.is_completed {
            Some(true) if !self.is_completed => {
                self.is_completed = true;
                self.completed_at = Some(now);
                self.completed_by = Some(actor);
            }
            Some(false) => {
                self.is_completed = false;
                self.completed_at = None;
                self.completed_by = None;
            }
            _ => {}
        }
    }

    pub fn progress(items: &[ChecklistItem]) -> ChecklistProgress {
        ChecklistProgress {
            completed_count: items.iter().filter(|item| item.is_completed).count() as u64,
            required_completed_count: items
                .iter()
                .filter(|item| item.is_required && item.is_completed)
                .count() as u64,
            required_total: items.iter().filter(|item| item.is_required).count() as u64,
            total: items.len() as u64,
        }
    }

    pub fn group(items: Vec<ChecklistItem>) -> ChecklistGroupedResponse {
        let mut grouped = ChecklistGroupedResponse::default();
        for item in items {
            match item.category {
                ChecklistCategoryKind::Safety => grouped.safety.push(item),
                ChecklistCategoryKind::Quality => grouped.quality.push(item),
                ChecklistCategoryKind::Cleanup => grouped.cleanup.push(item),
                ChecklistCategoryKind::Documentation => grouped.documentation.push(item),
                ChecklistCategoryKind::Custom => grouped.custom.push(item),
            }
        }
        grouped
    }

    pub async fn find_by_id(_id: &ObjectId) -> Result<Option<ChecklistItem>, CompletionError> {
        let db: Database = get_db();
        let collection: Collection<ChecklistItem> = db.collection::<ChecklistItem>("checklist-items");

        collection
            .find_one(doc! { "_id": _id }, None)
            .await
            .map_err(|_| CompletionError::Database("COLLECTING_FAILED"))
    }

    // Rows whose category does not deserialize into a known bucket are
    // skipped here rather than failing the whole read.
    pub async fn find_by_job(job_id: &ObjectId) -> Result<Vec<ChecklistItem>, CompletionError> {
        let db: Database = get_db();
        let collection: Collection<ChecklistItem> = db.collection::<ChecklistItem>("checklist-items");

        let mut items: Vec<ChecklistItem> = Vec::new();
        if let Ok(mut cursor) = collection.find(doc! { "job_id": job_id }, None).await {
            while let Some(result) = cursor.next().await {
                if let Ok(item) = result {
                    items.push(item);
                }
            }
            items.sort_by_key(|item| item.sort_order);
            Ok(items)
        } else {
            Err(CompletionError::Database("COLLECTING_FAILED"))
        }
    }

    pub async fn progress_for_job(job_id: &ObjectId) -> Result<ChecklistProgress, CompletionError> {
        let items = Self::find_by_job(job_id).await?;
        Ok(Self::progress(&items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(category: ChecklistCategoryKind, is_required: bool, is_completed: bool) -> ChecklistItem {
        ChecklistItem {
            _id: Some(ObjectId::new()),
            job_id: ObjectId::new(),
            category,
            name: "item".to_string(),
            is_required,
            is_completed,
            completed_at: None,
            completed_by: None,
            completion_notes: None,
            evidence_photo_id: Vec::new(),
            sort_order: 0,
        }
    }

    #[test]
    fn progress_counts() {
        let items = vec![
            item(ChecklistCategoryKind::Safety, true, true),
            item(ChecklistCategoryKind::Safety, true, false),
            item(ChecklistCategoryKind::Cleanup, false, true),
            item(ChecklistCategoryKind::Custom, false, false),
        ];

        assert_eq!(
            ChecklistItem::progress(&items),
            ChecklistProgress {
                completed_count: 2,
                required_completed_count: 1,
                required_total: 2,
                total: 4,
            }
        );
    }

    #[test]
    fn progress_of_empty_checklist() {
        assert_eq!(
            ChecklistItem::progress(&[]),
            ChecklistProgress {
                completed_count: 0,
                required_completed_count: 0,
                required_total: 0,
                total: 0,
            }
        );
    }

    #[test]
    fn grouping_buckets_by_category() {
        let items = vec![
            item(ChecklistCategoryKind::Safety, true, false),
            item(ChecklistCategoryKind::Documentation, true, false),
            item(ChecklistCategoryKind::Safety, false, false),
            item(ChecklistCategoryKind::Custom, false, false),
        ];

        let grouped = ChecklistItem::group(items);
        assert_eq!(grouped.safety.len(), 2);
        assert_eq!(grouped.documentation.len(), 1);
        assert_eq!(grouped.custom.len(), 1);
        assert!(grouped.quality.is_empty());
        assert!(grouped.cleanup.is_empty());
    }

    #[test]
    fn completing_stamps_and_uncompleting_clears() {
        let mut checklist_item = item(ChecklistCategoryKind::Quality, true, false);
        let actor = ObjectId::new();
        let now = DateTime::from_millis(1_000);

        checklist_item.apply(
            ChecklistItemUpdateRequest {
                is_completed: Some(true),
                completion_notes: Some("verified on site".to_string()),
                ..Default::default()
            },
            actor,
            now,
        );
        assert!(checklist_item.is_completed);
        assert_eq!(checklist_item.completed_at, Some(now));
        assert_eq!(checklist_item.completed_by, Some(actor));

        checklist_item.apply(
            ChecklistItemUpdateRequest {
                is_completed: Some(false),
                ..Default::default()
            },
            actor,
            DateTime::from_millis(2_000),
        );
        assert!(!checklist_item.is_completed);
        assert_eq!(checklist_item.completed_at, None);
        assert_eq!(checklist_item.completed_by, None);
    }

    #[test]
    fn recompleting_keeps_the_first_stamp() {
        let mut checklist_item = item(ChecklistCategoryKind::Safety, true, false);
        let first = DateTime::from_millis(1_000);

        checklist_item.apply(
            ChecklistItemUpdateRequest {
                is_completed: Some(true),
                ..Default::default()
            },
            ObjectId::new(),
            first,
        );
        checklist_item.apply(
            ChecklistItemUpdateRequest {
                is_completed: Some(true),
                ..Default::default()
            },
            ObjectId::new(),
            DateTime::from_millis(2_000),
        );
        assert_eq!(checklist_item.completed_at, Some(first));
    }
}
