//! OpenAPI documentation for the `/api/v1` surface.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "tsingest API",
        description = "Upload delimited time-series files, then query per-file summaries and recent records."
    ),
    servers(
        (url = "/api/v1", description = "tsingest API server")
    ),
    paths(
        api::handlers::files::upload_file,
        api::handlers::summaries::list_summaries,
        api::handlers::records::recent_records,
        api::handlers::health::healthz,
    ),
    components(
        schemas(
            api::models::files::FileUploadResponse,
            api::models::summaries::SummaryResponse,
            api::models::records::ValueRecordResponse,
        )
    ),
    tags(
        (name = "files", description = "File upload and ingestion"),
        (name = "summaries", description = "Per-file aggregate statistics"),
        (name = "records", description = "Stored observations"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_routes_are_documented() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for expected in ["/files", "/summaries", "/records/{source_name}/recent", "/healthz"] {
            assert!(paths.contains(&expected), "missing {expected} in {paths:?}");
        }
    }

    #[test]
    fn test_ids_are_documented_as_uuid_strings() {
        let json = ApiDoc::openapi().to_json().unwrap();

        for schema in ["SummaryResponse", "ValueRecordResponse"] {
            let start = json.find(&format!("\"{schema}\":{{")).unwrap_or_else(|| panic!("missing {schema}"));
            let body = &json[start..];
            let id = body.find("\"id\":{").unwrap();
            let id_schema = &body[id..id + body[id..].find('}').unwrap()];
            assert!(id_schema.contains("\"format\":\"uuid\""), "{schema}: {id_schema}");
            assert!(id_schema.contains("\"type\":\"string\""), "{schema}: {id_schema}");
        }
    }
}
