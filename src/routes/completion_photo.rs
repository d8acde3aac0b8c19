use std::{
    fs::{create_dir_all, rename},
    path::PathBuf,
};

use actix_multipart::form::MultipartForm;
use actix_web::{delete, get, post, put, web, HttpMessage, HttpRequest, HttpResponse};
use mongodb::bson::oid::ObjectId;

use crate::models::{
    completion_photo::{CompletionPhoto, CompletionPhotoFileRequest, CompletionPhotoRequest},
    user::UserAuthentication,
};

#[get("/jobs/{job_id}/photos")]
pub async fn get_photos(job_id: web::Path<String>) -> HttpResponse {
    let job_id: ObjectId = match job_id.parse() {
        Ok(job_id) => job_id,
        Err(_) => return HttpResponse::BadRequest().body("INVALID_ID"),
    };

    match CompletionPhoto::find_by_job(&job_id).await {
        Ok(photos) => HttpResponse::Ok().json(photos),
        Err(error) => error.response(),
    }
}

#[post("/jobs/{job_id}/photos")]
pub async fn create_photo(
    job_id: web::Path<String>,
    payload: web::Json<CompletionPhotoRequest>,
    req: HttpRequest,
) -> HttpResponse {
    let issuer = match req.extensions().get::<UserAuthentication>().cloned() {
        Some(issuer) => issuer,
        None => return HttpResponse::Unauthorized().body("UNAUTHORIZED"),
    };

    let job_id: ObjectId = match job_id.parse() {
        Ok(job_id) => job_id,
        Err(_) => return HttpResponse::BadRequest().body("INVALID_ID"),
    };

    let photo = match CompletionPhoto::from_request(job_id, payload.into_inner(), issuer._id) {
        Ok(photo) => photo,
        Err(error) => return error.response(),
    };

    match photo.save().await {
        Ok(_) => HttpResponse::Created().json(photo),
        Err(error) => error.response(),
    }
}

#[put("/photos/{photo_id}/file")]
pub async fn upload_photo_file(
    photo_id: web::Path<String>,
    form: MultipartForm<CompletionPhotoFileRequest>,
    req: HttpRequest,
) -> HttpResponse {
    if req.extensions().get::<UserAuthentication>().is_none() {
        return HttpResponse::Unauthorized().body("UNAUTHORIZED");
    }

    let photo_id: ObjectId = match photo_id.parse() {
        Ok(photo_id) => photo_id,
        Err(_) => return HttpResponse::BadRequest().body("INVALID_ID"),
    };

    let photo = match CompletionPhoto::find_by_id(&photo_id).await {
        Ok(Some(photo)) => photo,
        Ok(None) => return HttpResponse::NotFound().body("PHOTO_NOT_FOUND"),
        Err(error) => return error.response(),
    };

    let file_path = PathBuf::from(&photo.locator);
    let save_dir = match file_path.parent() {
        Some(parent) => parent.to_path_buf(),
        None => return HttpResponse::BadRequest().body("PHOTO_LOCATOR_INVALID"),
    };

    if create_dir_all(&save_dir).is_err() {
        return HttpResponse::InternalServerError().body("DIRECTORY_CREATION_FAILED");
    }

    let file_path_temp = form.file.file.path();
    if rename(file_path_temp, &file_path).is_ok() {
        HttpResponse::Ok().body(photo._id.unwrap().to_string())
    } else {
        HttpResponse::InternalServerError().body("PHOTO_STORE_FAILED")
    }
}

#[delete("/photos/{photo_id}")]
pub async fn delete_photo(photo_id: web::Path<String>, req: HttpRequest) -> HttpResponse {
    if req.extensions().get::<UserAuthentication>().is_none() {
        return HttpResponse::Unauthorized().body("UNAUTHORIZED");
    }

    let photo_id: ObjectId = match photo_id.parse() {
        Ok(photo_id) => photo_id,
        Err(_) => return HttpResponse::BadRequest().body("INVALID_ID"),
    };

    match CompletionPhoto::remove(&photo_id).await {
        Ok(removal) => HttpResponse::Ok().json(removal),
        Err(error) => error.response(),
    }
}
