use actix_web::{delete, get, post, put, web, HttpMessage, HttpRequest, HttpResponse};
use mongodb::bson::oid::ObjectId;

use crate::models::{
    time_entry::{TimeEntry, TimeEntryRequest},
    user::UserAuthentication,
};

#[get("/jobs/{job_id}/time-entries")]
pub async fn get_time_entries(job_id: web::Path<String>) -> HttpResponse {
    let job_id: ObjectId = match job_id.parse() {
        Ok(job_id) => job_id,
        Err(_) => return HttpResponse::BadRequest().body("INVALID_ID"),
    };

    match TimeEntry::find_by_job(&job_id).await {
        Ok(entries) => HttpResponse::Ok().json(entries),
        Err(error) => error.response(),
    }
}

#[post("/jobs/{job_id}/time-entries")]
pub async fn create_time_entry(
    job_id: web::Path<String>,
    payload: web::Json<TimeEntryRequest>,
    req: HttpRequest,
) -> HttpResponse {
    if req.extensions().get::<UserAuthentication>().is_none() {
        return HttpResponse::Unauthorized().body("UNAUTHORIZED");
    }

    let job_id: ObjectId = match job_id.parse() {
        Ok(job_id) => job_id,
        Err(_) => return HttpResponse::BadRequest().body("INVALID_ID"),
    };

    let mut entry = match TimeEntry::from_request(job_id, payload.into_inner()) {
        Ok(entry) => entry,
        Err(error) => return error.response(),
    };

    match entry.save().await {
        Ok(_) => HttpResponse::Created().json(entry),
        Err(error) => error.response(),
    }
}

#[put("/time-entries/{entry_id}")]
pub async fn update_time_entry(
    entry_id: web::Path<String>,
    payload: web::Json<TimeEntryRequest>,
    req: HttpRequest,
) -> HttpResponse {
    if req.extensions().get::<UserAuthentication>().is_none() {
        return HttpResponse::Unauthorized().body("UNAUTHORIZED");
    }

    let entry_id: ObjectId = match entry_id.parse() {
        Ok(entry_id) => entry_id,
        Err(_) => return HttpResponse::BadRequest().body("INVALID_ID"),
    };

    match TimeEntry::update(&entry_id, payload.into_inner()).await {
        Ok(entry) => HttpResponse::Ok().json(entry),
        Err(error) => error.response(),
    }
}

#[delete("/time-entries/{entry_id}")]
pub async fn delete_time_entry(entry_id: web::Path<String>, req: HttpRequest) -> HttpResponse {
    if req.extensions().get::<UserAuthentication>().is_none() {
        return HttpResponse::Unauthorized().body("UNAUTHORIZED");
    }

    let entry_id: ObjectId = match entry_id.parse() {
        Ok(entry_id) => entry_id,
        Err(_) => return HttpResponse::BadRequest().body("INVALID_ID"),
    };

    match TimeEntry::delete_by_id(&entry_id).await {
        Ok(count) => HttpResponse::Ok().body(format!("Deleted {count} time entry")),
        Err(error) => error.response(),
    }
}
