use std::time::Duration;

use actix_web::{HttpResponse, Responder, post, web};
use serde::{Deserialize, Serialize};

use super::{ErrorResponse, ErrorResponseWithMessage};
use crate::create_timestamp;
use crate::error::GradingError;
use crate::grader::{Grader, GradingOutcome};

#[derive(Serialize, Deserialize, Debug)]
pub struct SubmissionBody {
    pub question_id: u32,
    pub source_code: String,
}

#[derive(Serialize, Debug)]
pub struct SubmissionResponse {
    pub question_id: u32,
    pub graded_time: String,
    pub outcome: GradingOutcome,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ExtractResponse {
    pub fragment: String,
}

/// Deployment-level bound on one grading request
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestTimeout(pub Option<Duration>);

#[post("/submissions")]
pub async fn post_submission_handler(
    grader: web::Data<Grader>,
    timeout: web::Data<RequestTimeout>,
    body: web::Json<SubmissionBody>,
) -> impl Responder {
    let SubmissionBody {
        question_id,
        source_code,
    } = body.into_inner();

    let grading = grader.execute_and_score(question_id, &source_code);
    let result = match timeout.0 {
        Some(limit) => match tokio::time::timeout(limit, grading).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!("Grading question {question_id} exceeded {limit:?}");
                return HttpResponse::GatewayTimeout().json(ErrorResponse {
                    reason: "ERR_TIMEOUT",
                    code: 7,
                });
            }
        },
        None => grading.await,
    };

    match result {
        Ok(outcome) => HttpResponse::Ok().json(SubmissionResponse {
            question_id,
            graded_time: create_timestamp(),
            outcome,
        }),
        Err(e) => error_response(e),
    }
}

#[post("/extract")]
pub async fn post_extract_handler(
    grader: web::Data<Grader>,
    body: web::Json<SubmissionBody>,
) -> impl Responder {
    match grader.extract_fragment(body.question_id, &body.source_code) {
        Ok(fragment) => HttpResponse::Ok().json(ExtractResponse { fragment }),
        Err(e) => error_response(e),
    }
}

fn error_response(error: GradingError) -> HttpResponse {
    match error {
        GradingError::QuestionNotFound { question_id } => {
            log::info!("Question {question_id} not found");
            HttpResponse::NotFound().json(ErrorResponseWithMessage {
                reason: "ERR_NOT_FOUND",
                code: 3,
                message: format!("Question {question_id} not found."),
            })
        }
        e => {
            log::error!("Failed to grade submission: {e}");
            HttpResponse::InternalServerError().json(ErrorResponse {
                reason: "ERR_INTERNAL",
                code: 6,
            })
        }
    }
}
