use actix_web::{get, post, put, web, HttpMessage, HttpRequest, HttpResponse};
use mongodb::bson::oid::ObjectId;

use crate::models::{
    checklist_item::{ChecklistItem, ChecklistItemUpdateRequest},
    user::UserAuthentication,
};

#[post("/jobs/{job_id}/checklist")]
pub async fn initialize_checklist(job_id: web::Path<String>, req: HttpRequest) -> HttpResponse {
    let issuer = match req.extensions().get::<UserAuthentication>().cloned() {
        Some(issuer) => issuer,
        None => return HttpResponse::Unauthorized().body("UNAUTHORIZED"),
    };

    let job_id: ObjectId = match job_id.parse() {
        Ok(job_id) => job_id,
        Err(_) => return HttpResponse::BadRequest().body("INVALID_ID"),
    };

    match ChecklistItem::initialize(&job_id, &issuer.org_id).await {
        Ok(items) => HttpResponse::Ok().json(items),
        Err(error) => error.response(),
    }
}

#[get("/jobs/{job_id}/checklist")]
pub async fn get_checklist(job_id: web::Path<String>) -> HttpResponse {
    let job_id: ObjectId = match job_id.parse() {
        Ok(job_id) => job_id,
        Err(_) => return HttpResponse::BadRequest().body("INVALID_ID"),
    };

    match ChecklistItem::find_by_job(&job_id).await {
        Ok(items) => HttpResponse::Ok().json(ChecklistItem::group(items)),
        Err(error) => error.response(),
    }
}

#[get("/jobs/{job_id}/checklist/progress")]
pub async fn get_checklist_progress(job_id: web::Path<String>) -> HttpResponse {
    let job_id: ObjectId = match job_id.parse() {
        Ok(job_id) => job_id,
        Err(_) => return HttpResponse::BadRequest().body("INVALID_ID"),
    };

    match ChecklistItem::progress_for_job(&job_id).await {
        Ok(progress) => HttpResponse::Ok().json(progress),
        Err(error) => error.response(),
    }
}

#[put("/checklist-items/{item_id}")]
pub async fn update_checklist_item(
    item_id: web::Path<String>,
    payload: web::Json<ChecklistItemUpdateRequest>,
    req: HttpRequest,
) -> HttpResponse {
    let issuer = match req.extensions().get::<UserAuthentication>().cloned() {
        Some(issuer) => issuer,
        None => return HttpResponse::Unauthorized().body("UNAUTHORIZED"),
    };

    let item_id: ObjectId = match item_id.parse() {
        Ok(item_id) => item_id,
        Err(_) => return HttpResponse::BadRequest().body("INVALID_ID"),
    };

    match ChecklistItem::update(&item_id, payload.into_inner(), issuer._id).await {
        Ok(item) => HttpResponse::Ok().json(item),
        Err(error) => error.response(),
    }
}
