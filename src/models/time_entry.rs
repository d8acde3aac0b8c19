use crate::database::get_db;
use crate::error::CompletionError;
use crate::models::job_completion::JobCompletion;
use chrono::NaiveDate;
use futures::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, to_bson},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimeEntryKind {
    Regular,
    Overtime,
    Travel,
    Other,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TimeEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub job_id: ObjectId,
    pub worker_id: ObjectId,
    pub work_date: NaiveDate,
    pub hours: f64,
    pub kind: TimeEntryKind,
    pub hourly_rate: Option<f64>,
    pub billable: bool,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TimeEntryRequest {
    pub worker_id: ObjectId,
    pub work_date: NaiveDate,
    pub hours: f64,
    pub kind: TimeEntryKind,
    pub hourly_rate: Option<f64>,
    pub billable: Option<bool>,
    pub description: Option<String>,
}

impl TimeEntry {
    pub fn from_request(
        job_id: ObjectId,
        payload: TimeEntryRequest,
    ) -> Result<TimeEntry, CompletionError> {
        if payload.hours <= 0.0 {
            return Err(CompletionError::Validation(
                "TIME_ENTRY_MUST_HAVE_POSITIVE_HOURS",
            ));
        }

        Ok(TimeEntry {
            _id: None,
            job_id,
            worker_id: payload.worker_id,
            work_date: payload.work_date,
            hours: payload.hours,
            kind: payload.kind,
            hourly_rate: payload.hourly_rate,
            billable: payload.billable.unwrap_or(true),
            description: payload.description,
        })
    }

    /// (total hours, total labor cost). Entries without a rate contribute
    /// hours but no labor cost.
    pub fn totals(entries: &[TimeEntry]) -> (f64, f64) {
        let hours = entries.iter().map(|entry| entry.hours).sum();
        let labor_cost = entries
            .iter()
            .filter_map(|entry| entry.hourly_rate.map(|rate| entry.hours * rate))
            .sum();
        (hours, labor_cost)
    }

    pub async fn save(&mut self) -> Result<ObjectId, CompletionError> {
        JobCompletion::ensure_open(&self.job_id).await?;

        let db: Database = get_db();
        let collection: Collection<TimeEntry> = db.collection::<TimeEntry>("time-entries");

        self._id = Some(ObjectId::new());

        let _id = collection
            .insert_one(&*self, None)
            .await
            .map_err(|_| CompletionError::Database("INSERTING_FAILED"))
            .map(|result| result.inserted_id.as_object_id().unwrap())?;

        JobCompletion::recompute(&self.job_id).await?;

        Ok(_id)
    }

    pub async fn update(
        _id: &ObjectId,
        payload: TimeEntryRequest,
    ) -> Result<TimeEntry, CompletionError> {
        let existing = Self::find_by_id(_id)
            .await?
            .ok_or(CompletionError::NotFound("TIME_ENTRY"))?;
        JobCompletion::ensure_open(&existing.job_id).await?;

        let mut entry = Self::from_request(existing.job_id, payload)?;
        entry._id = existing._id;

        let db: Database = get_db();
        let collection: Collection<TimeEntry> = db.collection::<TimeEntry>("time-entries");

        collection
            .update_one(
                doc! { "_id": entry._id.unwrap() },
                doc! { "$set": to_bson::<TimeEntry>(&entry).unwrap() },
                None,
            )
            .await
            .map_err(|_| CompletionError::Database("UPDATE_FAILED"))?;

        JobCompletion::recompute(&entry.job_id).await?;

        Ok(entry)
    }

    pub async fn delete_by_id(_id: &ObjectId) -> Result<u64, CompletionError> {
        // resolve the owning job before the row disappears
        let existing = Self::find_by_id(_id)
            .await?
            .ok_or(CompletionError::NotFound("TIME_ENTRY"))?;
        JobCompletion::ensure_open(&existing.job_id).await?;

        let db: Database = get_db();
        let collection: Collection<TimeEntry> = db.collection::<TimeEntry>("time-entries");

        let deleted = collection
            .delete_one(doc! { "_id": _id }, None)
            .await
            .map_err(|_| CompletionError::Database("DELETION_FAILED"))
            .map(|result| result.deleted_count)?;

        JobCompletion::recompute(&existing.job_id).await?;

        Ok(deleted)
    }

    pub async fn find_by_id(_id: &ObjectId) -> Result<Option<TimeEntry>, CompletionError> {
        let db: Database = get_db();
        let collection: Collection<TimeEntry> = db.collection::<TimeEntry>("time-entries");

        collection
            .find_one(doc! { "_id": _id }, None)
            .await
            .map_err(|_| CompletionError::Database("COLLECTING_FAILED"))
    }

    pub async fn find_by_job(job_id: &ObjectId) -> Result<Vec<TimeEntry>, CompletionError> {
        let db: Database = get_db();
        let collection: Collection<TimeEntry> = db.collection::<TimeEntry>("time-entries");

        let mut entries: Vec<TimeEntry> = Vec::new();
        if let Ok(mut cursor) = collection.find(doc! { "job_id": job_id }, None).await {
            while let Some(Ok(entry)) = cursor.next().await {
                entries.push(entry);
            }
            Ok(entries)
        } else {
            Err(CompletionError::Database("COLLECTING_FAILED"))
        }
    }

    pub async fn aggregate_for_job(job_id: &ObjectId) -> Result<(f64, f64), CompletionError> {
        let entries = Self::find_by_job(job_id).await?;
        Ok(Self::totals(&entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(hours: f64, hourly_rate: Option<f64>) -> TimeEntryRequest {
        TimeEntryRequest {
            worker_id: ObjectId::new(),
            work_date: NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
            hours,
            kind: TimeEntryKind::Regular,
            hourly_rate,
            billable: None,
            description: None,
        }
    }

    #[test]
    fn rejects_non_positive_hours() {
        let job_id = ObjectId::new();
        assert_eq!(
            TimeEntry::from_request(job_id, request(0.0, None)).unwrap_err(),
            CompletionError::Validation("TIME_ENTRY_MUST_HAVE_POSITIVE_HOURS")
        );
        assert_eq!(
            TimeEntry::from_request(job_id, request(-4.0, None)).unwrap_err(),
            CompletionError::Validation("TIME_ENTRY_MUST_HAVE_POSITIVE_HOURS")
        );
    }

    #[test]
    fn billable_defaults_to_true() {
        let entry = TimeEntry::from_request(ObjectId::new(), request(8.0, None)).unwrap();
        assert!(entry.billable);
    }

    #[test]
    fn totals_skip_labor_cost_without_rate() {
        let job_id = ObjectId::new();
        let entries = vec![
            TimeEntry::from_request(job_id, request(8.0, Some(45.0))).unwrap(),
            TimeEntry::from_request(job_id, request(6.0, None)).unwrap(),
            TimeEntry::from_request(job_id, request(2.5, Some(60.0))).unwrap(),
        ];

        let (hours, labor_cost) = TimeEntry::totals(&entries);
        assert_eq!(hours, 16.5);
        assert_eq!(labor_cost, 8.0 * 45.0 + 2.5 * 60.0);
    }

    #[test]
    fn totals_of_empty_ledger_are_zero() {
        let (hours, labor_cost) = TimeEntry::totals(&[]);
        assert_eq!(hours, 0.0);
        assert_eq!(labor_cost, 0.0);
    }
}
