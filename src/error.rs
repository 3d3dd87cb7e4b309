//! 🚨 에러 타입 정의 및 JSON 추출기
//!
//! Every client-facing failure is answered with `{"error": "..."}`. Domain
//! failures use `400 Bad Request`; persistence failures use `500`.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection}, // 본문 / 쿼리 파싱 실패
        FromRequest, FromRequestParts,              // 커스텀 추출기 derive
    },
    http::StatusCode,                   // 400 / 500
    response::{IntoResponse, Response}, // 에러 → HTTP 응답
};
use serde::Serialize; // `{"error": ...}` 직렬화
use thiserror::Error; // 에러 enum derive

use crate::persistence::PersistenceError; // 저장 실패 (500)

/// 요청 본문을 JSON 으로 추출하고, 실패하면 [`AppError`] 로 응답합니다.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl<T> IntoResponse for AppJson<T>
where
    axum::Json<T>: IntoResponse,
{
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// 쿼리 문자열 추출기. 실패하면 [`AppError`] 로 응답합니다.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid post details: {}", .0.to_string().replace('\n', ", "))]
    Validation(#[from] validator::ValidationErrors),

    #[error("cannot echo the reserved message 'echo'")]
    EchoRejected,

    #[error(transparent)]
    JsonRejection(#[from] JsonRejection),

    #[error(transparent)]
    QueryRejection(#[from] QueryRejection),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let status = self.status();
        let error = match &self {
            AppError::JsonRejection(rejection) => rejection.body_text(),
            AppError::QueryRejection(rejection) => rejection.body_text(),
            AppError::Persistence(err) => {
                // 내부 오류의 상세 내용은 클라이언트에 노출하지 않음
                tracing::error!(%err, "failed to persist forum data");
                "Something went wrong".to_owned()
            }
            other => other.to_string(),
        };

        if status == StatusCode::BAD_REQUEST {
            tracing::debug!(%error, "rejected request");
        }

        (status, AppJson(ErrorResponse { error })).into_response()
    }
}
