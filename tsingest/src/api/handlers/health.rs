use crate::AppState;
use crate::errors::Result;
use axum::extract::State;

#[utoipa::path(
    get,
    path = "/healthz",
    tag = "health",
    summary = "Health check",
    responses(
        (status = 200, description = "Service and storage are reachable", body = String),
        (status = 500, description = "Storage is unreachable")
    )
)]
pub async fn healthz(State(state): State<AppState>) -> Result<&'static str> {
    state.repository.health_check().await?;
    Ok("OK")
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{create_test_app, create_test_config};

    #[tokio::test]
    async fn test_healthz() {
        let server = create_test_app(create_test_config()).await;

        let response = server.get("/api/v1/healthz").await;

        response.assert_status_ok();
        assert_eq!(response.text(), "OK");
    }
}
