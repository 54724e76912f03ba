use crate::conversion::RawConversionRequest;
use crate::server::AppContext;
use crate::service::Submission;
use audioforged_common::{Encoding, Error, JobId};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

pub fn conversion_routes() -> Router<AppContext> {
    Router::new().route("/convert-file", get(get_conversion).post(submit_conversion))
}

#[derive(Deserialize)]
struct SubmitParams {
    src: String,
    dest: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBody {
    #[serde(default)]
    source_url: String,
}

#[derive(Serialize)]
struct SubmitResponse {
    id: String,
    accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Deserialize)]
struct QueryParams {
    id: String,
}

#[derive(Serialize)]
struct JobResponse {
    id: String,
    status: String,
    url: String,
}

/// Accept an encoding as a catalog name (any case) or an ordinal.
///
/// Ordinals are passed through unchecked so out-of-range values surface as
/// unsupported encodings during validation.
fn encoding_ordinal(param: &str) -> Result<i32, Error> {
    let param = param.trim();
    if let Ok(ordinal) = param.parse::<i32>() {
        return Ok(ordinal);
    }
    param.parse::<Encoding>().map(|e| e.ordinal())
}

fn status_for(error: &Error) -> StatusCode {
    if error.is_validation() {
        StatusCode::BAD_REQUEST
    } else if error.is_admission() {
        StatusCode::SERVICE_UNAVAILABLE
    } else if error.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn error_response(error: &Error) -> Response {
    (
        status_for(error),
        Json(serde_json::json!({ "error": error.to_string() })),
    )
        .into_response()
}

async fn submit_conversion(
    State(ctx): State<AppContext>,
    Query(params): Query<SubmitParams>,
    Json(body): Json<SubmitBody>,
) -> Response {
    let (source_encoding, target_encoding) =
        match (encoding_ordinal(&params.src), encoding_ordinal(&params.dest)) {
            (Ok(src), Ok(dest)) => (src, dest),
            (Err(e), _) | (_, Err(e)) => return error_response(&e),
        };

    let raw = RawConversionRequest {
        source_url: body.source_url,
        source_encoding,
        target_encoding,
    };

    match ctx.service.submit(&raw) {
        Submission::Accepted { id } => (
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                id: id.to_string(),
                accepted: true,
                error: None,
            }),
        )
            .into_response(),
        Submission::Rejected { id, error } => (
            status_for(&error),
            Json(SubmitResponse {
                id: id.to_string(),
                accepted: false,
                error: Some(error.to_string()),
            }),
        )
            .into_response(),
    }
}

async fn get_conversion(
    State(ctx): State<AppContext>,
    Query(params): Query<QueryParams>,
) -> Response {
    let id = match params.id.parse::<JobId>() {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    match ctx.service.query(id) {
        Ok(job) => Json(JobResponse {
            id: job.id.to_string(),
            status: job.status.to_string(),
            url: job.result_location,
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}
