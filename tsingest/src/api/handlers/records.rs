use crate::AppState;
use crate::api::models::records::ValueRecordResponse;
use crate::errors::Result;
use axum::{
    Json,
    extract::{Path, State},
};

#[utoipa::path(
    get,
    path = "/records/{source_name}/recent",
    tag = "records",
    summary = "Recent records",
    description = "Returns the newest records stored for a file, newest first. Unknown or blank names yield an empty list.",
    params(
        ("source_name" = String, Path, description = "Name of the uploaded file")
    ),
    responses(
        (status = 200, description = "Up to the configured number of records", body = [ValueRecordResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn recent_records(
    State(state): State<AppState>,
    Path(source_name): Path<String>,
) -> Result<Json<Vec<ValueRecordResponse>>> {
    let records = state.queries.recent_records(&source_name).await?;

    Ok(Json(records.into_iter().map(ValueRecordResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use crate::api::models::records::ValueRecordResponse;
    use crate::test_utils::{create_test_app, create_test_config};
    use axum_test::multipart::{MultipartForm, Part};

    #[test_log::test(tokio::test)]
    async fn test_recent_records_newest_first() {
        let server = create_test_app(create_test_config()).await;
        let lines: Vec<String> = (0..15)
            .map(|i| format!("2024-02-01T08-{:02}-00.0000Z;1;{}", i, i))
            .collect();
        let contents = format!("header\n{}\n", lines.join("\n"));
        server
            .post("/api/v1/files")
            .multipart(MultipartForm::new().add_part("file", Part::bytes(contents.into_bytes()).file_name("many.csv")))
            .await
            .assert_status_ok();

        let response = server.get("/api/v1/records/many.csv/recent").await;

        response.assert_status_ok();
        let records: Vec<ValueRecordResponse> = response.json();
        assert_eq!(records.len(), 10);
        assert_eq!(records[0].value, 14.0);
        assert!(records.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
    }

    #[test_log::test(tokio::test)]
    async fn test_unknown_source_is_empty() {
        let server = create_test_app(create_test_config()).await;

        let records: Vec<ValueRecordResponse> = server.get("/api/v1/records/missing.csv/recent").await.json();
        assert!(records.is_empty());

        let records: Vec<ValueRecordResponse> = server.get("/api/v1/records/%20/recent").await.json();
        assert!(records.is_empty());
    }
}
