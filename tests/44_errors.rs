mod common;

use anyhow::Result;
use axum::http::StatusCode;
use rowgate::store::StoreError;

#[tokio::test]
async fn undefined_schema_is_404_naming_schema_and_table() -> Result<()> {
    let app = common::test_app();
    app.mock.fail(StoreError::database("42P01", "relation \"nope.products\" does not exist"));

    let res = app.get("/api/nope/products").await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(
        res.json(),
        serde_json::json!({
            "httpCode": 404,
            "dbCode": "42P01",
            "message": "relation \"nope.products\" does not exist",
            "schema": "nope",
            "table": "products",
            "record": "",
        })
    );
    Ok(())
}

#[tokio::test]
async fn insufficient_privilege_is_403() -> Result<()> {
    let app = common::test_app();
    app.mock.fail(StoreError::database("42501", "permission denied for table secrets"));

    let res = app.get("/api/public/secrets/1").await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.json()["dbCode"], "42501");
    assert_eq!(res.json()["record"], "1");
    Ok(())
}

#[tokio::test]
async fn other_database_codes_are_400() -> Result<()> {
    let app = common::test_app();
    app.mock.fail(StoreError::database("23505", "duplicate key value violates unique constraint"));

    let res = app
        .send_json(axum::http::Method::POST, "/api/shop/products", r#"{"id":"1"}"#)
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()["dbCode"], "23505");
    Ok(())
}

#[tokio::test]
async fn pool_failures_are_503() -> Result<()> {
    let app = common::test_app();
    app.mock.fail(StoreError::Unavailable("pool timed out".to_string()));

    let res = app.get("/api/public/products").await?;
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.json()["dbCode"], "");
    Ok(())
}

#[tokio::test]
async fn shutdown_cancels_in_flight_queries() -> Result<()> {
    let app = common::test_app();
    app.state.shutdown.cancel();

    let res = app.get("/api/public/products").await?;
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.json()["message"], "Request cancelled");
    Ok(())
}

#[tokio::test]
async fn health_reports_degraded_database() -> Result<()> {
    let app = common::test_app();
    app.mock.set_unhealthy(true);

    let res = app.get("/health").await?;
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.json()["status"], "degraded");

    app.mock.set_unhealthy(false);
    let res = app.get("/health").await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["database"], "ok");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn slow_query_times_out_with_error_body() -> Result<()> {
    let mut config = common::test_config();
    config.api.request_timeout_secs = 1;
    let mock = rowgate::testing::MockExecutor::new().with_delay(std::time::Duration::from_secs(5));
    let app = common::test_app_with_executor(config, mock);
    app.mock.respond("[]");

    let res = app.get("/api/shop/products").await?;
    assert_eq!(res.status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(res.content_type(), Some("application/json"));
    assert_eq!(
        res.json(),
        serde_json::json!({
            "httpCode": 408,
            "dbCode": "",
            "message": "Request timed out",
            "schema": "shop",
            "table": "products",
            "record": "",
        })
    );
    Ok(())
}
