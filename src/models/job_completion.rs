use crate::database::get_db;
use crate::error::CompletionError;
use crate::models::job::JobEstimate;
use crate::models::material_usage::MaterialUsageEntry;
use crate::models::time_entry::TimeEntry;
use crate::variance::{self, LedgerTotals};
use async_trait::async_trait;
use mongodb::{
    bson::{doc, oid::ObjectId, to_bson, DateTime},
    Collection, Database,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability the workflow needs from the job subsystem: estimates at
/// creation time, the completion back-link, and the status flip on approval.
#[async_trait]
pub trait JobCompleter {
    async fn estimate(job_id: &ObjectId) -> Result<JobEstimate, CompletionError>;
    async fn link_completion(
        job_id: &ObjectId,
        completion_id: &ObjectId,
    ) -> Result<(), CompletionError>;
    async fn mark_completed(job_id: &ObjectId, end_date: DateTime) -> Result<(), CompletionError>;
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobCompletionStatusKind {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl JobCompletionStatusKind {
    pub fn permits(self, next: JobCompletionStatusKind) -> bool {
        use JobCompletionStatusKind::*;
        matches!(
            (self, next),
            (Draft, Submitted) | (Rejected, Submitted) | (Submitted, Approved) | (Submitted, Rejected)
        )
    }
    pub fn is_terminal(self) -> bool {
        matches!(self, JobCompletionStatusKind::Approved)
    }
}

impl fmt::Display for JobCompletionStatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            JobCompletionStatusKind::Draft => "draft",
            JobCompletionStatusKind::Submitted => "submitted",
            JobCompletionStatusKind::Approved => "approved",
            JobCompletionStatusKind::Rejected => "rejected",
        };
        write!(f, "{status}")
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct JobCompletionEstimate {
    pub hours: Option<f64>,
    pub material_cost: Option<f64>,
    pub total: Option<f64>,
}

/// Rewritten only by [`JobCompletion::recompute`]; callers never set these.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct JobCompletionVariance {
    pub actual_hours: f64,
    pub actual_total: f64,
    pub hours_variance: f64,
    pub hours_variance_percent: Option<f64>,
    pub cost_variance: f64,
    pub cost_variance_percent: Option<f64>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct JobCompletion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub job_id: ObjectId,
    pub status: JobCompletionStatusKind,
    pub estimate: JobCompletionEstimate,
    pub variance: JobCompletionVariance,
    pub field_notes: Option<String>,
    pub issues_encountered: Option<String>,
    pub recommendations: Option<String>,
    pub customer_signed: bool,
    pub customer_signed_at: Option<DateTime>,
    pub submitted_at: Option<DateTime>,
    pub submitted_by: Option<ObjectId>,
    pub reviewed_at: Option<DateTime>,
    pub reviewed_by: Option<ObjectId>,
    pub review_notes: Option<String>,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct JobCompletionRequest {
    pub estimated_hours: Option<f64>,
    pub estimated_material_cost: Option<f64>,
    pub estimated_total: Option<f64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct JobCompletionUpdateRequest {
    pub estimated_hours: Option<f64>,
    pub estimated_material_cost: Option<f64>,
    pub estimated_total: Option<f64>,
    pub field_notes: Option<String>,
    pub issues_encountered: Option<String>,
    pub recommendations: Option<String>,
    pub customer_signed: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct JobCompletionSubmitRequest {
    pub field_notes: Option<String>,
    pub issues_encountered: Option<String>,
    pub recommendations: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct JobCompletionApproveRequest {
    pub review_notes: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct JobCompletionRejectRequest {
    pub rejection_reason: String,
    pub review_notes: Option<String>,
}

impl JobCompletion {
    pub fn new(job_id: ObjectId, estimate: JobCompletionEstimate) -> JobCompletion {
        JobCompletion {
            _id: Some(ObjectId::new()),
            job_id,
            status: JobCompletionStatusKind::Draft,
            estimate,
            variance: JobCompletionVariance::default(),
            field_notes: None,
            issues_encountered: None,
            recommendations: None,
            customer_signed: false,
            customer_signed_at: None,
            submitted_at: None,
            submitted_by: None,
            reviewed_at: None,
            reviewed_by: None,
            review_notes: None,
            rejection_reason: None,
        }
    }

    pub async fn create<J: JobCompleter>(
        job_id: &ObjectId,
        payload: JobCompletionRequest,
    ) -> Result<JobCompletion, CompletionError> {
        if let Some(existing) = Self::find_by_job_id(job_id).await? {
            return Ok(existing);
        }

        let job_estimate = J::estimate(job_id).await?;
        let estimate = JobCompletionEstimate {
            hours: payload.estimated_hours.or(job_estimate.duration_hours),
            material_cost: payload.estimated_material_cost,
            total: payload.estimated_total.or(job_estimate.contract_amount),
        };

        let mut completion = JobCompletion::new(*job_id, estimate);

        let db: Database = get_db();
        let collection: Collection<JobCompletion> =
            db.collection::<JobCompletion>("job-completions");

        collection
            .insert_one(&completion, None)
            .await
            .map_err(|_| CompletionError::Database("INSERTING_FAILED"))?;

        J::link_completion(job_id, &completion._id.unwrap()).await?;

        if let Some(variance) = Self::recompute(job_id).await? {
            completion.variance = variance;
        }

        Ok(completion)
    }

    pub async fn update(
        job_id: &ObjectId,
        payload: JobCompletionUpdateRequest,
    ) -> Result<JobCompletion, CompletionError> {
        let mut completion = Self::find_by_job_id(job_id)
            .await?
            .ok_or(CompletionError::NotFound("COMPLETION"))?;

        completion.apply_update(payload, DateTime::now())?;
        completion.persist().await?;

        Ok(completion)
    }

    pub async fn submit(
        job_id: &ObjectId,
        payload: JobCompletionSubmitRequest,
        actor: ObjectId,
    ) -> Result<JobCompletion, CompletionError> {
        let mut completion = Self::find_by_job_id(job_id)
            .await?
            .ok_or(CompletionError::NotFound("COMPLETION"))?;

        if !completion.status.permits(JobCompletionStatusKind::Submitted) {
            return Err(CompletionError::InvalidTransition {
                job_id: *job_id,
                current: completion.status,
                attempted: "submit",
            });
        }

        // the submitted snapshot must reflect the ledger as of this call
        if let Some(variance) = Self::recompute(job_id).await? {
            completion.variance = variance;
        }

        completion.apply_submit(payload, actor, DateTime::now())?;
        completion.persist().await?;

        Ok(completion)
    }

    pub async fn approve<J: JobCompleter>(
        job_id: &ObjectId,
        payload: JobCompletionApproveRequest,
        reviewer: ObjectId,
    ) -> Result<JobCompletion, CompletionError> {
        let mut completion = Self::find_by_job_id(job_id)
            .await?
            .ok_or(CompletionError::NotFound("COMPLETION"))?;

        let now = DateTime::now();
        completion.apply_approve(payload.review_notes, reviewer, now)?;
        completion.persist().await?;

        J::mark_completed(job_id, now).await?;
        tracing::info!(job_id = %job_id, "job completion approved, job marked completed");

        Ok(completion)
    }

    pub async fn reject(
        job_id: &ObjectId,
        payload: JobCompletionRejectRequest,
        reviewer: ObjectId,
    ) -> Result<JobCompletion, CompletionError> {
        let mut completion = Self::find_by_job_id(job_id)
            .await?
            .ok_or(CompletionError::NotFound("COMPLETION"))?;

        completion.apply_reject(
            &payload.rejection_reason,
            payload.review_notes,
            reviewer,
            DateTime::now(),
        )?;
        completion.persist().await?;

        Ok(completion)
    }

    /// Total recalculation from the current ledger; a no-op when the job has
    /// no completion yet. Safe to call after every ledger mutation.
    pub async fn recompute(
        job_id: &ObjectId,
    ) -> Result<Option<JobCompletionVariance>, CompletionError> {
        let completion = match Self::find_by_job_id(job_id).await? {
            Some(completion) => completion,
            None => return Ok(None),
        };

        let (hours, labor_cost) = TimeEntry::aggregate_for_job(job_id).await?;
        let material_cost = MaterialUsageEntry::aggregate_for_job(job_id).await?;
        let totals = LedgerTotals {
            hours,
            labor_cost,
            material_cost,
        };
        let variance = variance::compute(&completion.estimate, &totals);

        let db: Database = get_db();
        let collection: Collection<JobCompletion> =
            db.collection::<JobCompletion>("job-completions");

        collection
            .update_one(
                doc! { "_id": completion._id.unwrap() },
                doc! { "$set": { "variance": to_bson::<JobCompletionVariance>(&variance).unwrap() } },
                None,
            )
            .await
            .map_err(|_| CompletionError::Database("UPDATE_FAILED"))?;

        Ok(Some(variance))
    }

    /// Refuses ledger/photo/checklist mutations once the completion is
    /// terminal; jobs without a completion are always open.
    pub async fn ensure_open(job_id: &ObjectId) -> Result<(), CompletionError> {
        match Self::find_by_job_id(job_id).await? {
            Some(completion) if completion.status.is_terminal() => {
                Err(CompletionError::InvalidTransition {
                    job_id: *job_id,
                    current: completion.status,
                    attempted: "modify_ledger",
                })
            }
            _ => Ok(()),
        }
    }

    pub async fn find_by_job_id(
        job_id: &ObjectId,
    ) -> Result<Option<JobCompletion>, CompletionError> {
        let db: Database = get_db();
        let collection: Collection<JobCompletion> =
            db.collection::<JobCompletion>("job-completions");

        collection
            .find_one(doc! { "job_id": job_id }, None)
            .await
            .map_err(|_| CompletionError::Database("COLLECTING_FAILED"))
    }

    async fn persist(&self) -> Result<ObjectId, CompletionError> {
        let db: Database = get_db();
        let collection: Collection<JobCompletion> =
            db.collection::<JobCompletion>("job-completions");

        collection
            .update_one(
                doc! { "_id": self._id.unwrap() },
                doc! { "$set": to_bson::<JobCompletion>(self).unwrap() },
                None,
            )
            .await
            .map_err(|_| CompletionError::Database("UPDATE_FAILED"))
            .map(|_| self._id.unwrap())
    }

    pub fn apply_update(
        &mut self,
        payload: JobCompletionUpdateRequest,
        now: DateTime,
    ) -> Result<(), CompletionError> {
        let wants_estimate_change = payload.estimated_hours.is_some()
            || payload.estimated_material_cost.is_some()
            || payload.estimated_total.is_some();
        if wants_estimate_change && self.status != JobCompletionStatusKind::Draft {
            return Err(CompletionError::InvalidTransition {
                job_id: self.job_id,
                current: self.status,
                attempted: "update_estimate",
            });
        }

        if let Some(hours) = payload.estimated_hours {
            self.estimate.hours = Some(hours);
        }
        if let Some(material_cost) = payload.estimated_material_cost {
            self.estimate.material_cost = Some(material_cost);
        }
        if let Some(total) = payload.estimated_total {
            self.estimate.total = Some(total);
        }
        if let Some(field_notes) = payload.field_notes {
            self.field_notes = Some(field_notes);
        }
        if let Some(issues) = payload.issues_encountered {
            self.issues_encountered = Some(issues);
        }
        if let Some(recommendations) = payload.recommendations {
            self.recommendations = Some(recommendations);
        }
        // the signature timestamp is stamped exactly once
        if payload.customer_signed == Some(true) && !self.customer_signed {
            self.customer_signed = true;
            self.customer_signed_at = Some(now);
        }

        Ok(())
    }

    pub fn apply_submit(
        &mut self,
        payload: JobCompletionSubmitRequest,
        actor: ObjectId,
        now: DateTime,
    ) -> Result<(), CompletionError> {
        if !self.status.permits(JobCompletionStatusKind::Submitted) {
            return Err(CompletionError::InvalidTransition {
                job_id: self.job_id,
                current: self.status,
                attempted: "submit",
            });
        }

        if let Some(field_notes) = payload.field_notes {
            self.field_notes = Some(field_notes);
        }
        if let Some(issues) = payload.issues_encountered {
            self.issues_encountered = Some(issues);
        }
        if let Some(recommendations) = payload.recommendations {
            self.recommendations = Some(recommendations);
        }

        self.status = JobCompletionStatusKind::Submitted;
        self.submitted_at = Some(now);
        self.submitted_by = Some(actor);

        Ok(())
    }

    pub fn apply_approve(
        &mut self,
        review_notes: Option<String>,
        reviewer: ObjectId,
        now: DateTime,
    ) -> Result<(), CompletionError> {
        if !self.status.permits(JobCompletionStatusKind::Approved) {
            return Err(CompletionError::InvalidTransition {
                job_id: self.job_id,
                current: self.status,
                attempted: "approve",
            });
        }

        self.status = JobCompletionStatusKind::Approved;
        self.reviewed_at = Some(now);
        self.reviewed_by = Some(reviewer);
        if let Some(notes) = review_notes {
            self.review_notes = Some(notes);
        }

        Ok(())
    }

    pub fn apply_reject(
        &mut self,
        rejection_reason: &str,
        review_notes: Option<String>,
        reviewer: ObjectId,
        now: DateTime,
    ) -> Result<(), CompletionError> {
        if rejection_reason.trim().is_empty() {
            return Err(CompletionError::Validation("REJECTION_REASON_REQUIRED"));
        }
        if !self.status.permits(JobCompletionStatusKind::Rejected) {
            return Err(CompletionError::InvalidTransition {
                job_id: self.job_id,
                current: self.status,
                attempted: "reject",
            });
        }

        self.status = JobCompletionStatusKind::Rejected;
        self.rejection_reason = Some(rejection_reason.to_string());
        self.reviewed_at = Some(now);
        self.reviewed_by = Some(reviewer);
        if let Some(notes) = review_notes {
            self.review_notes = Some(notes);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> JobCompletion {
        JobCompletion::new(
            ObjectId::new(),
            JobCompletionEstimate {
                hours: Some(24.0),
                material_cost: None,
                total: Some(5000.0),
            },
        )
    }

    #[test]
    fn transition_table() {
        use JobCompletionStatusKind::*;

        let legal = [
            (Draft, Submitted),
            (Rejected, Submitted),
            (Submitted, Approved),
            (Submitted, Rejected),
        ];
        for (from, to) in [Draft, Submitted, Approved, Rejected]
            .iter()
            .flat_map(|from| {
                [Draft, Submitted, Approved, Rejected]
                    .iter()
                    .map(move |to| (*from, *to))
                    .collect::<Vec<_>>()
            })
        {
            assert_eq!(
                from.permits(to),
                legal.contains(&(from, to)),
                "{from} -> {to}"
            );
        }
    }

    #[test]
    fn resubmission_after_rejection() {
        let mut completion = draft();
        let actor = ObjectId::new();
        let reviewer = ObjectId::new();
        let now = DateTime::from_millis(1_000);

        completion
            .apply_submit(JobCompletionSubmitRequest::default(), actor, now)
            .unwrap();
        assert_eq!(completion.status, JobCompletionStatusKind::Submitted);
        assert_eq!(completion.submitted_by, Some(actor));

        completion
            .apply_reject("missing clearance photos", None, reviewer, now)
            .unwrap();
        assert_eq!(completion.status, JobCompletionStatusKind::Rejected);
        assert_eq!(
            completion.rejection_reason.as_deref(),
            Some("missing clearance photos")
        );

        completion
            .apply_submit(JobCompletionSubmitRequest::default(), actor, now)
            .unwrap();
        assert_eq!(completion.status, JobCompletionStatusKind::Submitted);

        completion
            .apply_approve(Some("looks good".to_string()), reviewer, now)
            .unwrap();
        assert_eq!(completion.status, JobCompletionStatusKind::Approved);
        assert_eq!(completion.reviewed_by, Some(reviewer));
        assert!(completion.status.is_terminal());
    }

    #[test]
    fn approve_from_draft_is_rejected() {
        let mut completion = draft();
        let error = completion
            .apply_approve(None, ObjectId::new(), DateTime::from_millis(1_000))
            .unwrap_err();

        assert!(matches!(
            error,
            CompletionError::InvalidTransition {
                current: JobCompletionStatusKind::Draft,
                attempted: "approve",
                ..
            }
        ));
        assert_eq!(completion.status, JobCompletionStatusKind::Draft);
        assert_eq!(completion.reviewed_at, None);
    }

    #[test]
    fn reject_requires_a_reason() {
        let mut completion = draft();
        completion
            .apply_submit(
                JobCompletionSubmitRequest::default(),
                ObjectId::new(),
                DateTime::from_millis(1_000),
            )
            .unwrap();

        let error = completion
            .apply_reject("   ", None, ObjectId::new(), DateTime::from_millis(2_000))
            .unwrap_err();

        assert_eq!(
            error,
            CompletionError::Validation("REJECTION_REASON_REQUIRED")
        );
        assert_eq!(completion.status, JobCompletionStatusKind::Submitted);
        assert_eq!(completion.reviewed_at, None);
    }

    #[test]
    fn customer_signature_stamps_once() {
        let mut completion = draft();
        let first = DateTime::from_millis(1_000);
        let second = DateTime::from_millis(2_000);

        completion
            .apply_update(
                JobCompletionUpdateRequest {
                    customer_signed: Some(true),
                    ..Default::default()
                },
                first,
            )
            .unwrap();
        assert_eq!(completion.customer_signed_at, Some(first));

        completion
            .apply_update(
                JobCompletionUpdateRequest {
                    customer_signed: Some(true),
                    ..Default::default()
                },
                second,
            )
            .unwrap();
        assert_eq!(completion.customer_signed_at, Some(first));
    }

    #[test]
    fn estimate_is_locked_outside_draft() {
        let mut completion = draft();
        completion
            .apply_submit(
                JobCompletionSubmitRequest::default(),
                ObjectId::new(),
                DateTime::from_millis(1_000),
            )
            .unwrap();

        let error = completion
            .apply_update(
                JobCompletionUpdateRequest {
                    estimated_hours: Some(40.0),
                    ..Default::default()
                },
                DateTime::from_millis(2_000),
            )
            .unwrap_err();

        assert!(matches!(
            error,
            CompletionError::InvalidTransition {
                attempted: "update_estimate",
                ..
            }
        ));
        assert_eq!(completion.estimate.hours, Some(24.0));

        // narrative fields stay editable after submission
        completion
            .apply_update(
                JobCompletionUpdateRequest {
                    field_notes: Some("crew demobilized".to_string()),
                    ..Default::default()
                },
                DateTime::from_millis(3_000),
            )
            .unwrap();
        assert_eq!(completion.field_notes.as_deref(), Some("crew demobilized"));
    }
}
