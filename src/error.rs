use actix_web::HttpResponse;
use mongodb::bson::oid::ObjectId;
use thiserror::Error;

use crate::models::job_completion::JobCompletionStatusKind;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum CompletionError {
    #[error("UNAUTHORIZED")]
    Unauthorized,
    #[error("{0}_NOT_FOUND")]
    NotFound(&'static str),
    #[error("INVALID_TRANSITION: completion for job {job_id} is {current}, cannot {attempted}")]
    InvalidTransition {
        job_id: ObjectId,
        current: JobCompletionStatusKind,
        attempted: &'static str,
    },
    #[error("{0}")]
    Validation(&'static str),
    #[error("{0}")]
    Database(&'static str),
}

impl CompletionError {
    pub fn response(&self) -> HttpResponse {
        match self {
            CompletionError::Unauthorized => HttpResponse::Unauthorized().body(self.to_string()),
            CompletionError::NotFound(_) => HttpResponse::NotFound().body(self.to_string()),
            CompletionError::InvalidTransition { .. } => {
                HttpResponse::Conflict().body(self.to_string())
            }
            CompletionError::Validation(_) => HttpResponse::BadRequest().body(self.to_string()),
            CompletionError::Database(_) => {
                HttpResponse::InternalServerError().body(self.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_renders_entity_code() {
        assert_eq!(
            CompletionError::NotFound("COMPLETION").to_string(),
            "COMPLETION_NOT_FOUND"
        );
    }

    #[test]
    fn invalid_transition_carries_context() {
        let job_id = ObjectId::new();
        let error = CompletionError::InvalidTransition {
            job_id,
            current: JobCompletionStatusKind::Draft,
            attempted: "approve",
        };
        let message = error.to_string();
        assert!(message.contains(&job_id.to_string()));
        assert!(message.contains("draft"));
        assert!(message.contains("approve"));
    }
}
