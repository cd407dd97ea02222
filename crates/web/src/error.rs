//! API errors and the rejection handler that turns them into JSON replies.

use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

/// Errors reported to API clients as `{"error": "..."}`.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("No song file selected")]
    MissingSongFile,

    #[error("Song file must be a .txt file")]
    InvalidSongFile,

    #[error("Template file must be a .pptx file")]
    InvalidTemplateFile,

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("File is too large. Maximum size is {max_mb}MB.")]
    TooLarge { max_mb: u64 },

    #[error("File not found or has expired")]
    FileNotFound,

    #[error("Route not found")]
    RouteNotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl warp::reject::Reject for ApiError {}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingSongFile
            | ApiError::InvalidSongFile
            | ApiError::InvalidTemplateFile
            | ApiError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            ApiError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::FileNotFound | ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_reply(self) -> warp::reply::WithStatus<warp::reply::Json> {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.to_string(),
        };
        warp::reply::with_status(warp::reply::json(&body), status)
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Map a rejection to a JSON error reply.
///
/// Custom rejections are checked before warp's own: a route that matched
/// and then failed must not be reported as "not found".
pub async fn recover_fn(rejection: Rejection, max_upload_mb: u64) -> Result<impl Reply, Infallible> {
    let err = rejection_to_error(&rejection, max_upload_mb);
    if err.status_code().is_server_error() {
        log::error!("Request failed: {:?}", rejection);
    } else {
        log::debug!("Request rejected: {}", err);
    }
    Ok(err.into_reply())
}

fn rejection_to_error(rejection: &Rejection, max_upload_mb: u64) -> ApiError {
    if let Some(err) = rejection.find::<ApiError>() {
        err.clone()
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        ApiError::TooLarge {
            max_mb: max_upload_mb,
        }
    } else if let Some(err) = rejection.find::<warp::reject::LengthRequired>() {
        ApiError::InvalidUpload(err.to_string())
    } else if let Some(err) = rejection.find::<warp::reject::InvalidHeader>() {
        ApiError::InvalidUpload(err.to_string())
    } else if let Some(err) = rejection.find::<warp::reject::MissingHeader>() {
        ApiError::InvalidUpload(err.to_string())
    } else if let Some(err) = rejection.find::<warp::reject::UnsupportedMediaType>() {
        ApiError::InvalidUpload(err.to_string())
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        ApiError::MethodNotAllowed
    } else if rejection.is_not_found() {
        ApiError::RouteNotFound
    } else {
        ApiError::Internal(format!("{:?}", rejection))
    }
}
