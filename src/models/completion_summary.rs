use crate::error::CompletionError;
use crate::models::checklist_item::{ChecklistGroupedResponse, ChecklistItem, ChecklistProgress};
use crate::models::completion_photo::CompletionPhoto;
use crate::models::job_completion::JobCompletion;
use crate::models::material_usage::MaterialUsageEntry;
use crate::models::time_entry::TimeEntry;
use crate::variance::{self, BudgetClassification};
use mongodb::bson::oid::ObjectId;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CompletionSummaryResponse {
    pub completion: Option<JobCompletion>,
    pub budget: BudgetClassification,
    pub time_entry: Vec<TimeEntry>,
    pub material_usage: Vec<MaterialUsageEntry>,
    pub material_attention: Vec<ObjectId>,
    pub photo: Vec<CompletionPhoto>,
    pub checklist: ChecklistGroupedResponse,
    pub checklist_progress: ChecklistProgress,
}

impl CompletionSummaryResponse {
    /// Read-only snapshot of everything attached to a job; valid in every
    /// workflow state, including before a completion exists.
    pub async fn assemble(job_id: &ObjectId) -> Result<CompletionSummaryResponse, CompletionError> {
        let (completion, time_entry, material_usage, photo, checklist_items) = futures::join!(
            JobCompletion::find_by_job_id(job_id),
            TimeEntry::find_by_job(job_id),
            MaterialUsageEntry::find_by_job(job_id),
            CompletionPhoto::find_by_job(job_id),
            ChecklistItem::find_by_job(job_id),
        );

        let completion = completion?;
        let time_entry = time_entry?;
        let material_usage = material_usage?;
        let photo = photo?;
        let checklist_items = checklist_items?;

        let budget = variance::classify_budget(
            completion
                .as_ref()
                .and_then(|completion| completion.variance.cost_variance_percent),
        );
        let material_attention: Vec<ObjectId> = material_usage
            .iter()
            .filter(|entry| entry.needs_attention())
            .filter_map(|entry| entry._id)
            .collect();
        let checklist_progress = ChecklistItem::progress(&checklist_items);
        let checklist = ChecklistItem::group(checklist_items);

        Ok(CompletionSummaryResponse {
            completion,
            budget,
            time_entry,
            material_usage,
            material_attention,
            photo,
            checklist,
            checklist_progress,
        })
    }
}
