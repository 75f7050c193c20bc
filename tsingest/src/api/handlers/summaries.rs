use crate::AppState;
use crate::api::models::summaries::{ListSummariesQuery, SummaryResponse};
use crate::db::models::summaries::SummaryFilter;
use crate::errors::Result;
use axum::{
    Json,
    extract::{Query, State},
};

#[utoipa::path(
    get,
    path = "/summaries",
    tag = "summaries",
    summary = "List summaries",
    description = "Returns per-file summaries ordered by first operation, then source name. \
Filters combine with AND; omit all of them to list everything.",
    params(ListSummariesQuery),
    responses(
        (status = 200, description = "Matching summaries", body = [SummaryResponse]),
        (status = 400, description = "Malformed date"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_summaries(
    State(state): State<AppState>,
    Query(query): Query<ListSummariesQuery>,
) -> Result<Json<Vec<SummaryResponse>>> {
    let filter = SummaryFilter::try_from(query)?;

    let summaries = state.queries.summaries(&filter).await?;

    Ok(Json(summaries.into_iter().map(SummaryResponse::from).collect()))
}
