use crate::database::get_db;
use crate::error::CompletionError;
use crate::models::job_completion::JobCompleter;
use async_trait::async_trait;
use mongodb::{
    bson::{doc, oid::ObjectId, to_bson, DateTime},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatusKind {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Job {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub org_id: ObjectId,
    pub name: String,
    pub code: String,
    pub status: JobStatusKind,
    pub estimated_duration_hours: Option<f64>,
    pub contract_amount: Option<f64>,
    pub actual_end_date: Option<DateTime>,
    pub completion_id: Option<ObjectId>,
}

#[derive(Clone, Copy, Debug)]
pub struct JobEstimate {
    pub duration_hours: Option<f64>,
    pub contract_amount: Option<f64>,
}

impl Job {
    pub async fn find_by_id(_id: &ObjectId) -> Result<Option<Job>, CompletionError> {
        let db: Database = get_db();
        let collection: Collection<Job> = db.collection::<Job>("jobs");

        collection
            .find_one(doc! { "_id": _id }, None)
            .await
            .map_err(|_| CompletionError::Database("COLLECTING_FAILED"))
    }
}

#[async_trait]
impl JobCompleter for Job {
    async fn estimate(job_id: &ObjectId) -> Result<JobEstimate, CompletionError> {
        match Job::find_by_id(job_id).await? {
            Some(job) => Ok(JobEstimate {
                duration_hours: job.estimated_duration_hours,
                contract_amount: job.contract_amount,
            }),
            None => Err(CompletionError::NotFound("JOB")),
        }
    }

    async fn link_completion(
        job_id: &ObjectId,
        completion_id: &ObjectId,
    ) -> Result<(), CompletionError> {
        let db: Database = get_db();
        let collection: Collection<Job> = db.collection::<Job>("jobs");

        collection
            .update_one(
                doc! { "_id": job_id },
                doc! { "$set": { "completion_id": completion_id } },
                None,
            )
            .await
            .map_err(|_| CompletionError::Database("UPDATE_FAILED"))
            .map(|_| ())
    }

    async fn mark_completed(job_id: &ObjectId, end_date: DateTime) -> Result<(), CompletionError> {
        let db: Database = get_db();
        let collection: Collection<Job> = db.collection::<Job>("jobs");

        collection
            .update_one(
                doc! { "_id": job_id },
                doc! { "$set": {
                    "status": to_bson::<JobStatusKind>(&JobStatusKind::Completed).unwrap(),
                    "actual_end_date": end_date,
                } },
                None,
            )
            .await
            .map_err(|_| CompletionError::Database("UPDATE_FAILED"))
            .map(|_| ())
    }
}
