use footwear_storefront::routes::health::health_check;

#[tokio::test]
async fn health_check_returns_ok() {
    let response = health_check().await;
    assert_eq!(response.0.message, "Health check");
    assert!(response.0.data.is_some());
}

#[tokio::test]
async fn health_check_serializes_envelope() -> anyhow::Result<()> {
    let response = health_check().await;
    let body = serde_json::to_value(&response.0)?;

    assert_eq!(body["data"]["status"], "ok");
    assert!(body["meta"].is_object());
    Ok(())
}
