use actix_web::{get, web, HttpResponse};
use mime_guess::from_path;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::storage;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    CompletionPhoto,
}

#[derive(Deserialize)]
pub struct FileQueryParams {
    pub kind: FileKind,
    pub name: String,
}

pub mod checklist;
pub mod completion_photo;
pub mod job_completion;
pub mod material_usage;
pub mod summary;
pub mod time_entry;

#[get("/files")]
pub async fn get_file(query: web::Query<FileQueryParams>) -> HttpResponse {
    let path = match query.kind {
        FileKind::CompletionPhoto => format!("{}/jobs/{}", storage::files_dir(), query.name),
    };
    if let Ok(file) = fs::read(path.clone()) {
        let mime = from_path(path).first_or_octet_stream();
        HttpResponse::Ok().content_type(mime).body(file)
    } else {
        HttpResponse::NotFound().body("CONTENT_NOT_FOUND")
    }
}
