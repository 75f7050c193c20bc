use crate::AppState;
use crate::api::models::files::FileUploadResponse;
use crate::errors::{Error, Result};
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};

fn multipart_error(err: MultipartError, max_file_size: usize) -> Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge { limit: max_file_size }
    } else {
        Error::BadRequest {
            message: format!("Failed to parse multipart data: {}", err),
        }
    }
}

#[utoipa::path(
    post,
    path = "/files",
    tag = "files",
    summary = "Upload file",
    description = "Upload a delimited time-series file. The first line is a header and is skipped; every other \
non-blank line must be `yyyy-MM-ddTHH-mm-ss.ffffZ;<execution time>;<value>`.

The uploaded file name identifies the batch. Uploading a file with the same name replaces everything \
previously stored under it. Content problems are reported with `success: false` and status 200.",
    request_body(
        content_type = "multipart/form-data",
        description = "Form with a single `file` field"
    ),
    responses(
        (status = 200, description = "File processed; see `success`", body = FileUploadResponse),
        (status = 400, description = "No file, empty file, or unnamed file"),
        (status = 413, description = "Payload too large"),
    )
)]
pub async fn upload_file(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<FileUploadResponse>> {
    let max_file_size = state.config.ingest.max_file_size;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_file_size))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let source_name = field
            .file_name()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::BadRequest {
                message: "Uploaded file must have a name".to_string(),
            })?;

        let mut contents = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, max_file_size))? {
            // Check size limit incrementally to fail fast
            if contents.len() + chunk.len() > max_file_size {
                tracing::warn!(source_name = %source_name, max_file_size, "File size limit exceeded, aborting upload");
                return Err(Error::PayloadTooLarge { limit: max_file_size });
            }
            contents.extend_from_slice(&chunk);
        }

        upload = Some((source_name, contents));
        break;
    }

    let Some((source_name, contents)) = upload.filter(|(_, contents)| !contents.is_empty()) else {
        return Err(Error::BadRequest {
            message: "No file selected or file is empty".to_string(),
        });
    };

    tracing::debug!(source_name = %source_name, size = contents.len(), "Received upload");

    // Abandon the ingest if the server starts shutting down
    let cancel = state.shutdown.child_token();
    let outcome = state.ingest.ingest(&source_name, contents.as_slice(), &cancel).await;

    Ok(Json(outcome.into()))
}

#[cfg(test)]
mod tests {
    use crate::api::models::files::FileUploadResponse;
    use crate::test_utils::{create_test_app, create_test_config};
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};

    fn csv_form(file_name: &str, contents: &str) -> MultipartForm {
        MultipartForm::new().add_part(
            "file",
            Part::bytes(contents.as_bytes().to_vec())
                .file_name(file_name)
                .mime_type("text/csv"),
        )
    }

    const VALID: &str = "Date;ExecutionTime;Value\n2024-03-01T10-00-00.0000Z;1.5;10\n2024-03-01T10-00-10.0000Z;2.5;30\n";

    #[test_log::test(tokio::test)]
    async fn test_upload_valid_file() {
        let server = create_test_app(create_test_config()).await;

        let response = server.post("/api/v1/files").multipart(csv_form("data.csv", VALID)).await;

        response.assert_status_ok();
        let body: FileUploadResponse = response.json();
        assert!(body.success, "{}", body.message);
        assert_eq!(body.source_name, "data.csv");
        assert_eq!(body.rows_saved, 2);
    }

    #[test_log::test(tokio::test)]
    async fn test_upload_invalid_content_is_reported_not_errored() {
        let server = create_test_app(create_test_config()).await;
        let bad = "Date;ExecutionTime;Value\n2024-03-01T10-00-00.0000Z;1.5\n";

        let response = server.post("/api/v1/files").multipart(csv_form("bad.csv", bad)).await;

        response.assert_status_ok();
        let body: FileUploadResponse = response.json();
        assert!(!body.success);
        assert_eq!(body.rows_saved, 0);
        assert!(body.message.contains("Line 1"), "{}", body.message);
    }

    #[test_log::test(tokio::test)]
    async fn test_upload_empty_file_is_bad_request() {
        let server = create_test_app(create_test_config()).await;

        let response = server.post("/api/v1/files").multipart(csv_form("empty.csv", "")).await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[test_log::test(tokio::test)]
    async fn test_upload_without_file_field_is_bad_request() {
        let server = create_test_app(create_test_config()).await;

        let form = MultipartForm::new().add_text("note", "no file here");
        let response = server.post("/api/v1/files").multipart(form).await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[test_log::test(tokio::test)]
    async fn test_upload_over_limit_is_rejected() {
        let mut config = create_test_config();
        config.ingest.max_file_size = 32;
        let server = create_test_app(config).await;

        let response = server.post("/api/v1/files").multipart(csv_form("big.csv", VALID)).await;

        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    }
}
