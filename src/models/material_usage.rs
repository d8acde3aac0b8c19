use crate::database::get_db;
use crate::error::CompletionError;
use crate::models::job_completion::JobCompletion;
use crate::variance;
use futures::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, to_bson},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MaterialUsageEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub job_id: ObjectId,
    pub name: String,
    pub quantity_estimated: Option<f64>,
    pub quantity_used: f64,
    pub unit: Option<String>,
    pub unit_cost: Option<f64>,
    pub total_cost: Option<f64>,
    pub variance_quantity: Option<f64>,
    pub variance_percent: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MaterialUsageRequest {
    pub name: String,
    pub quantity_estimated: Option<f64>,
    pub quantity_used: f64,
    pub unit: Option<String>,
    pub unit_cost: Option<f64>,
}

impl MaterialUsageEntry {
    pub fn from_request(
        job_id: ObjectId,
        payload: MaterialUsageRequest,
    ) -> Result<MaterialUsageEntry, CompletionError> {
        if payload.name.trim().is_empty() {
            return Err(CompletionError::Validation("MATERIAL_MUST_HAVE_NAME"));
        }
        if payload.quantity_used < 0.0 {
            return Err(CompletionError::Validation(
                "MATERIAL_QUANTITY_MUST_NOT_BE_NEGATIVE",
            ));
        }

        let mut entry = MaterialUsageEntry {
            _id: None,
            job_id,
            name: payload.name,
            quantity_estimated: payload.quantity_estimated,
            quantity_used: payload.quantity_used,
            unit: payload.unit,
            unit_cost: payload.unit_cost,
            total_cost: None,
            variance_quantity: None,
            variance_percent: None,
        };
        entry.derive();

        Ok(entry)
    }

    /// total_cost, variance_quantity and variance_percent are never accepted
    /// from a caller; they are rebuilt here on every write.
    pub fn derive(&mut self) {
        self.total_cost = self.unit_cost.map(|unit_cost| self.quantity_used * unit_cost);
        self.variance_quantity = self
            .quantity_estimated
            .map(|estimated| self.quantity_used - estimated);
        self.variance_percent = self
            .variance_quantity
            .and_then(|variance| variance::percent_of_estimate(variance, self.quantity_estimated));
    }

    pub fn needs_attention(&self) -> bool {
        variance::material_needs_attention(self.variance_percent)
    }

    pub fn total_cost(entries: &[MaterialUsageEntry]) -> f64 {
        entries.iter().filter_map(|entry| entry.total_cost).sum()
    }

    pub async fn save(&mut self) -> Result<ObjectId, CompletionError> {
        JobCompletion::ensure_open(&self.job_id).await?;

        let db: Database = get_db();
        let collection: Collection<MaterialUsageEntry> =
            db.collection::<MaterialUsageEntry>("material-usages");

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
        payload: MaterialUsageRequest,
    ) -> Result<MaterialUsageEntry, CompletionError> {
        let existing = Self::find_by_id(_id)
            .await?
            .ok_or(CompletionError::NotFound("MATERIAL_USAGE"))?;
        JobCompletion::ensure_open(&existing.job_id).await?;

        let mut entry = Self::from_request(existing.job_id, payload)?;
        entry._id = existing._id;

        let db: Database = get_db();
        let collection: Collection<MaterialUsageEntry> =
            db.collection::<MaterialUsageEntry>("material-usages");

        collection
            .update_one(
                doc! { "_id": entry._id.unwrap() },
                doc! { "$set": to_bson::<MaterialUsageEntry>(&entry).unwrap() },
                None,
            )
            .await
            .map_err(|_| CompletionError::Database("UPDATE_FAILED"))?;

        JobCompletion::recompute(&entry.job_id).await?;

        Ok(entry)
    }

    pub async fn delete_by_id(_id: &ObjectId) -> Result<u64, CompletionError> {
        let existing = Self::find_by_id(_id)
            .await?
            .ok_or(CompletionError::NotFound("MATERIAL_USAGE"))?;
        JobCompletion::ensure_open(&existing.job_id).await?;

        let db: Database = get_db();
        let collection: Collection<MaterialUsageEntry> =
            db.collection::<MaterialUsageEntry>("material-usages");

        let deleted = collection
            .delete_one(doc! { "_id": _id }, None)
            .await
            .map_err(|_| CompletionError::Database("DELETION_FAILED"))
            .map(|result| result.deleted_count)?;

        JobCompletion::recompute(&existing.job_id).await?;

        Ok(deleted)
    }

    pub async fn find_by_id(_id: &ObjectId) -> Result<Option<MaterialUsageEntry>, CompletionError> {
        let db: Database = get_db();
        let collection: Collection<MaterialUsageEntry> =
            db.collection::<MaterialUsageEntry>("material-usages");

        collection
            .find_one(doc! { "_id": _id }, None)
            .await
            .map_err(|_| CompletionError::Database("COLLECTING_FAILED"))
    }

    pub async fn find_by_job(
        job_id: &ObjectId,
    ) -> Result<Vec<MaterialUsageEntry>, CompletionError> {
        let db: Database = get_db();
        let collection: Collection<MaterialUsageEntry> =
            db.collection::<MaterialUsageEntry>("material-usages");

        let mut entries: Vec<MaterialUsageEntry> = Vec::new();
        if let Ok(mut cursor) = collection.find(doc! { "job_id": job_id }, None).await {
            while let Some(Ok(entry)) = cursor.next().await {
                entries.push(entry);
            }
            Ok(entries)
        } else {
            Err(CompletionError::Database("COLLECTING_FAILED"))
        }
    }

    pub async fn aggregate_for_job(job_id: &ObjectId) -> Result<f64, CompletionError> {
        let entries = Self::find_by_job(job_id).await?;
        Ok(Self::total_cost(&entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(estimated: Option<f64>, used: f64, unit_cost: Option<f64>) -> MaterialUsageRequest {
        MaterialUsageRequest {
            name: "6-mil poly sheeting".to_string(),
            quantity_estimated: estimated,
            quantity_used: used,
            unit: Some("roll".to_string()),
            unit_cost,
        }
    }

    #[test]
    fn derives_cost_and_variance() {
        let entry =
            MaterialUsageEntry::from_request(ObjectId::new(), request(Some(10.0), 12.0, Some(5.0)))
                .unwrap();

        assert_eq!(entry.total_cost, Some(60.0));
        assert_eq!(entry.variance_quantity, Some(2.0));
        assert_eq!(entry.variance_percent, Some(20.0));
        assert!(entry.needs_attention());
    }

    #[test]
    fn variance_is_undefined_without_estimate() {
        let entry =
            MaterialUsageEntry::from_request(ObjectId::new(), request(None, 3.0, Some(2.5)))
                .unwrap();
        assert_eq!(entry.total_cost, Some(7.5));
        assert_eq!(entry.variance_quantity, None);
        assert_eq!(entry.variance_percent, None);

        let entry =
            MaterialUsageEntry::from_request(ObjectId::new(), request(Some(0.0), 3.0, None))
                .unwrap();
        assert_eq!(entry.total_cost, None);
        assert_eq!(entry.variance_quantity, Some(3.0));
        assert_eq!(entry.variance_percent, None);
    }

    #[test]
    fn rejects_blank_name_and_negative_quantity() {
        let mut payload = request(None, 1.0, None);
        payload.name = "  ".to_string();
        assert_eq!(
            MaterialUsageEntry::from_request(ObjectId::new(), payload).unwrap_err(),
            CompletionError::Validation("MATERIAL_MUST_HAVE_NAME")
        );

        assert_eq!(
            MaterialUsageEntry::from_request(ObjectId::new(), request(None, -1.0, None))
                .unwrap_err(),
            CompletionError::Validation("MATERIAL_QUANTITY_MUST_NOT_BE_NEGATIVE")
        );
    }

    #[test]
    fn total_cost_sums_only_priced_entries() {
        let job_id = ObjectId::new();
        let entries = vec![
            MaterialUsageEntry::from_request(job_id, request(Some(10.0), 12.0, Some(5.0))).unwrap(),
            MaterialUsageEntry::from_request(job_id, request(None, 4.0, None)).unwrap(),
        ];
        assert_eq!(MaterialUsageEntry::total_cost(&entries), 60.0);
        assert_eq!(MaterialUsageEntry::total_cost(&[]), 0.0);
    }
}
