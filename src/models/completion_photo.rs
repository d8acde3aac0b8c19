use crate::database::get_db;
use crate::error::CompletionError;
use crate::models::job_completion::JobCompletion;
use crate::storage;
use actix_multipart::form::{tempfile::TempFile, MultipartForm};
use futures::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPhotoKind {
    Before,
    During,
    After,
    Issue,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CompletionPhoto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub job_id: ObjectId,
    pub locator: String,
    pub kind: CompletionPhotoKind,
    pub caption: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub camera: Option<String>,
    pub taken_at: Option<DateTime>,
    pub uploaded_by: ObjectId,
    pub uploaded_at: DateTime,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CompletionPhotoRequest {
    pub kind: CompletionPhotoKind,
    pub locator: Option<String>,
    pub extension: Option<String>,
    pub caption: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub camera: Option<String>,
    pub taken_at: Option<DateTime>,
}

#[derive(Debug, MultipartForm)]
pub struct CompletionPhotoFileRequest {
    #[multipart(rename = "file")]
    pub file: TempFile,
}

#[derive(Debug, Serialize)]
pub struct CompletionPhotoRemoval {
    pub deleted: u64,
    pub warning: Option<String>,
}

impl CompletionPhoto {
    pub fn from_request(
        job_id: ObjectId,
        payload: CompletionPhotoRequest,
        uploader: ObjectId,
    ) -> Result<CompletionPhoto, CompletionError> {
        let _id = ObjectId::new();
        let locator = match (payload.locator, payload.extension) {
            (Some(locator), _) => locator,
            (None, Some(extension)) => {
                storage::photo_locator(&job_id.to_string(), &_id.to_string(), &extension)
            }
            (None, None) => return Err(CompletionError::Validation("PHOTO_MUST_HAVE_LOCATOR")),
        };

        Ok(CompletionPhoto {
            _id: Some(_id),
            job_id,
            locator,
            kind: payload.kind,
            caption: payload.caption,
            latitude: payload.latitude,
            longitude: payload.longitude,
            camera: payload.camera,
            taken_at: payload.taken_at,
            uploaded_by: uploader,
            uploaded_at: DateTime::now(),
        })
    }

    pub async fn save(&self) -> Result<ObjectId, CompletionError> {
        JobCompletion::ensure_open(&self.job_id).await?;

        let db: Database = get_db();
        let collection: Collection<CompletionPhoto> =
            db.collection::<CompletionPhoto>("completion-photos");

        collection
            .insert_one(self, None)
            .await
            .map_err(|_| CompletionError::Database("INSERTING_FAILED"))
            .map(|result| result.inserted_id.as_object_id().unwrap())
    }

    /// Deletes the metadata row, then makes a best-effort attempt to release
    /// the backing object; a failed release is reported as a warning.
    pub async fn remove(_id: &ObjectId) -> Result<CompletionPhotoRemoval, CompletionError> {
        let photo = Self::find_by_id(_id)
            .await?
            .ok_or(CompletionError::NotFound("PHOTO"))?;
        JobCompletion::ensure_open(&photo.job_id).await?;

        let db: Database = get_db();
        let collection: Collection<CompletionPhoto> =
            db.collection::<CompletionPhoto>("completion-photos");

        let deleted = collection
            .delete_one(doc! { "_id": _id }, None)
            .await
            .map_err(|_| CompletionError::Database("DELETION_FAILED"))
            .map(|result| result.deleted_count)?;

        let warning = match storage::release(&photo.locator) {
            Ok(()) => None,
            Err(code) => {
                tracing::warn!(locator = %photo.locator, "photo storage release failed");
                Some(code)
            }
        };

        Ok(CompletionPhotoRemoval { deleted, warning })
    }

    pub async fn find_by_id(_id: &ObjectId) -> Result<Option<CompletionPhoto>, CompletionError> {
        let db: Database = get_db();
        let collection: Collection<CompletionPhoto> =
            db.collection::<CompletionPhoto>("completion-photos");

        collection
            .find_one(doc! { "_id": _id }, None)
            .await
            .map_err(|_| CompletionError::Database("COLLECTING_FAILED"))
    }

    pub async fn find_by_job(job_id: &ObjectId) -> Result<Vec<CompletionPhoto>, CompletionError> {
        let db: Database = get_db();
        let collection: Collection<CompletionPhoto> =
            db.collection::<CompletionPhoto>("completion-photos");

        let mut photos: Vec<CompletionPhoto> = Vec::new();
        if let Ok(mut cursor) = collection.find(doc! { "job_id": job_id }, None).await {
            while let Some(Ok(photo)) = cursor.next().await {
                photos.push(photo);
            }
            Ok(photos)
        } else {
            Err(CompletionError::Database("COLLECTING_FAILED"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(locator: Option<&str>, extension: Option<&str>) -> CompletionPhotoRequest {
        CompletionPhotoRequest {
            kind: CompletionPhotoKind::After,
            locator: locator.map(str::to_string),
            extension: extension.map(str::to_string),
            caption: None,
            latitude: None,
            longitude: None,
            camera: None,
            taken_at: None,
        }
    }

    #[test]
    fn explicit_locator_wins() {
        let photo = CompletionPhoto::from_request(
            ObjectId::new(),
            request(Some("s3://bucket/abc.jpg"), Some("jpg")),
            ObjectId::new(),
        )
        .unwrap();
        assert_eq!(photo.locator, "s3://bucket/abc.jpg");
    }

    #[test]
    fn locator_is_derived_from_extension() {
        let job_id = ObjectId::new();
        let photo =
            CompletionPhoto::from_request(job_id, request(None, Some("jpg")), ObjectId::new())
                .unwrap();
        assert!(photo.locator.contains(&job_id.to_string()));
        assert!(photo.locator.ends_with(".jpg"));
    }

    #[test]
    fn locator_or_extension_is_required() {
        assert_eq!(
            CompletionPhoto::from_request(ObjectId::new(), request(None, None), ObjectId::new())
                .unwrap_err(),
            CompletionError::Validation("PHOTO_MUST_HAVE_LOCATOR")
        );
    }
}
