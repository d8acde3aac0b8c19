use actix_web::{get, post, put, web, HttpMessage, HttpRequest, HttpResponse};
use mongodb::bson::oid::ObjectId;

use crate::models::{
    job::Job,
    job_completion::{
        JobCompletion, JobCompletionApproveRequest, JobCompletionRejectRequest,
        JobCompletionRequest, JobCompletionSubmitRequest, JobCompletionUpdateRequest,
    },
    user::UserAuthentication,
};

#[get("/jobs/{job_id}/completion")]
pub async fn get_completion(job_id: web::Path<String>) -> HttpResponse {
    let job_id: ObjectId = match job_id.parse() {
        Ok(job_id) => job_id,
        Err(_) => return HttpResponse::BadRequest().body("INVALID_ID"),
    };

    match JobCompletion::find_by_job_id(&job_id).await {
        Ok(Some(completion)) => HttpResponse::Ok().json(completion),
        Ok(None) => HttpResponse::NotFound().body("COMPLETION_NOT_FOUND"),
        Err(error) => error.response(),
    }
}

#[post("/jobs/{job_id}/completion")]
pub async fn create_completion(
    job_id: web::Path<String>,
    payload: web::Json<JobCompletionRequest>,
    req: HttpRequest,
) -> HttpResponse {
    if req.extensions().get::<UserAuthentication>().is_none() {
        return HttpResponse::Unauthorized().body("UNAUTHORIZED");
    }

    let job_id: ObjectId = match job_id.parse() {
        Ok(job_id) => job_id,
        Err(_) => return HttpResponse::BadRequest().body("INVALID_ID"),
    };

    match JobCompletion::create::<Job>(&job_id, payload.into_inner()).await {
        Ok(completion) => HttpResponse::Ok().json(completion),
        Err(error) => error.response(),
    }
}

#[put("/jobs/{job_id}/completion")]
pub async fn update_completion(
    job_id: web::Path<String>,
    payload: web::Json<JobCompletionUpdateRequest>,
    req: HttpRequest,
) -> HttpResponse {
    if req.extensions().get::<UserAuthentication>().is_none() {
        return HttpResponse::Unauthorized().body("UNAUTHORIZED");
    }

    let job_id: ObjectId = match job_id.parse() {
        Ok(job_id) => job_id,
        Err(_) => return HttpResponse::BadRequest().body("INVALID_ID"),
    };

    match JobCompletion::update(&job_id, payload.into_inner()).await {
        Ok(completion) => HttpResponse::Ok().json(completion),
        Err(error) => error.response(),
    }
}

#[post("/jobs/{job_id}/completion/submit")]
pub async fn submit_completion(
    job_id: web::Path<String>,
    payload: web::Json<JobCompletionSubmitRequest>,
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

    match JobCompletion::submit(&job_id, payload.into_inner(), issuer._id).await {
        Ok(completion) => HttpResponse::Ok().json(completion),
        Err(error) => error.response(),
    }
}

#[post("/jobs/{job_id}/completion/approve")]
pub async fn approve_completion(
    job_id: web::Path<String>,
    payload: web::Json<JobCompletionApproveRequest>,
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

    match JobCompletion::approve::<Job>(&job_id, payload.into_inner(), issuer._id).await {
        Ok(completion) => HttpResponse::Ok().json(completion),
        Err(error) => error.response(),
    }
}

#[post("/jobs/{job_id}/completion/reject")]
pub async fn reject_completion(
    job_id: web::Path<String>,
    payload: web::Json<JobCompletionRejectRequest>,
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

    match JobCompletion::reject(&job_id, payload.into_inner(), issuer._id).await {
        Ok(completion) => HttpResponse::Ok().json(completion),
        Err(error) => error.response(),
    }
}
