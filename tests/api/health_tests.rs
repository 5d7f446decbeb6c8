//! Health Check API Tests
//!
//! Placeholder tests for health check endpoints.
//! TODO: Implement full integration tests with TestApp infrastructure.

/// Test basic health check endpoint returns 200 OK
#[tokio::test]
async fn test_health_check_returns_ok() {
    // This test will be functional once we have test infrastructure
    // For now, we just define the test structure

    // Arrange
    // let app = TestApp::new().await;

    // Act
    // let response = app.get("/health").await;

    // Assert
    // assert_eq!(response.status(), StatusCode::OK);
    assert!(true); // Placeholder
}

/// Test health check returns JSON with status field
#[tokio::test]
async fn test_health_check_returns_json() {
    // Arrange
    // let app = TestApp::new().await;

    // Act
    // let response = app.get("/health").await;
    // let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
    // let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    // Assert
    // assert!(json.get("status").is_some());
    assert!(true); // Placeholder
}

/// Test liveness probe endpoint
#[tokio::test]
async fn test_liveness_probe() {
    // Kubernetes-style liveness probe should always return 200
    // even if dependencies are unhealthy

    // Arrange
    // let app = TestApp::new().await;

    // Act
    // let response = app.get("/health/live").await;

    // Assert
    // assert_eq!(response.status(), StatusCode::OK);
    assert!(true); // Placeholder
}

/// Test readiness probe endpoint
#[tokio::test]
async fn test_readiness_probe() {
    // Readiness probe should return 200 only when all dependencies are healthy

    // Arrange
    // let app = TestApp::new().await;

    // Act
    // let response = app.get("/health/ready").await;

    // Assert
    // Response should indicate database and Redis status
    assert!(true); // Placeholder
}
