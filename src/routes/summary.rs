use actix_web::{get, web, HttpResponse};
use mongodb::bson::oid::ObjectId;

use crate::models::completion_summary::CompletionSummaryResponse;

#[get("/jobs/{job_id}/summary")]
pub async fn get_completion_summary(job_id: web::Path<String>) -> HttpResponse {
    let job_id: ObjectId = match job_id.parse() {
        Ok(job_id) => job_id,
        Err(_) => return HttpResponse::BadRequest().body("INVALID_ID"),
    };

    match CompletionSummaryResponse::assemble(&job_id).await {
        Ok(summary) => HttpResponse::Ok().json(summary),
        Err(error) => error.response(),
    }
}
