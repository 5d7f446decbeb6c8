//! Authentication API Tests

use axum::http::StatusCode;

/// Test user registration with valid data
#[tokio::test]
async fn test_register_with_valid_data() {
    // Arrange
    // let app = TestApp::new().await;
    // let email = unique_email();
    // let username = unique_username();
    // let body = json!({
    //     "email": email,
    //     "username": username,
    //     "password": "ValidPassword123!"
    // });

    // Act
    // let response = app.post_json("/api/v1/auth/register", &body.to_string()).await;

    // Assert
    // assert_eq!(response.status(), StatusCode::CREATED);
    assert!(true); // Placeholder
}

/// Test registration fails with invalid email
#[tokio::test]
async fn test_register_with_invalid_email_fails() {
    // Arrange
    // let app = TestApp::new().await;
    // let body = json!({
    //     "email": "not-an-email",
    //     "username": "testuser",
    //     "password": "ValidPassword123!"
    // });

    // Act
    // let response = app.post_json("/api/v1/auth/register", &body.to_string()).await;

    // Assert
    // assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(true); // Placeholder
}

/// Test registration fails with short password
#[tokio::test]
async fn test_register_with_short_password_fails() {
    // Arrange
    // let app = TestApp::new().await;
    // let body = json!({
    //     "email": "test@example.com",
    //     "username": "testuser",
    //     "password": "short"
    // });

    // Act
    // let response = app.post_json("/api/v1/auth/register", &body.to_string()).await;

    // Assert
    // assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(true); // Placeholder
}

/// Test registration fails with duplicate email
#[tokio::test]
async fn test_register_with_duplicate_email_fails() {
    // Arrange
    // let app = TestApp::new().await;
    // First registration
    // let email = unique_email();
    // let body = json!({
    //     "email": email,
    //     "username": unique_username(),
    //     "password": "ValidPassword123!"
    // });
    // app.post_json("/api/v1/auth/register", &body.to_string()).await;

    // Second registration with same email
    // let body2 = json!({
    //     "email": email,
    //     "username": unique_username(),
    //     "password": "ValidPassword123!"
    // });

    // Act
    // let response = app.post_json("/api/v1/auth/register", &body2.to_string()).await;

    // Assert
    // assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(true); // Placeholder
}

/// Test login with valid credentials
#[tokio::test]
async fn test_login_with_valid_credentials() {
    // Arrange - register user first
    // let app = TestApp::new().await;
    // let email = unique_email();
    // let password = "ValidPassword123!";
    // Register user...

    // Act
    // let body = json!({
    //     "email": email,
    //     "password": password
    // });
    // let response = app.post_json("/api/v1/auth/login", &body.to_string()).await;

    // Assert
    // assert_eq!(response.status(), StatusCode::OK);
    // Response should contain access_token and refresh_token
    assert!(true); // Placeholder
}

/// Test login with invalid credentials fails
#[tokio::test]
async fn test_login_with_invalid_credentials_fails() {
    // Arrange
    // let app = TestApp::new().await;
    // let body = json!({
    //     "email": "nonexistent@example.com",
    //     "password": "WrongPassword123!"
    // });

    // Act
    // let response = app.post_json("/api/v1/auth/login", &body.to_string()).await;

    // Assert
    // assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(true); // Placeholder
}

/// Test token refresh with valid refresh token
#[tokio::test]
async fn test_refresh_token_with_valid_token() {
    // Arrange - login first to get tokens
    // let app = TestApp::new().await;
    // ...login and extract refresh_token...

    // Act
    // let body = json!({
    //     "refresh_token": refresh_token
    // });
    // let response = app.post_json("/api/v1/auth/refresh", &body.to_string()).await;

    // Assert
    // assert_eq!(response.status(), StatusCode::OK);
    // Response should contain new access_token
    assert!(true); // Placeholder
}

/// Test logout invalidates session
#[tokio::test]
async fn test_logout_invalidates_session() {
    // Arrange - login first
    // let app = TestApp::new().await;
    // ...login and extract tokens...

    // Act - logout
    // let response = app.post_json_auth("/api/v1/auth/logout", "{}", &access_token).await;

    // Assert
    // assert_eq!(response.status(), StatusCode::OK);

    // Try to use the token again - should fail
    // let response = app.get_auth("/api/v1/users/@me", &access_token).await;
    // assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(true); // Placeholder
}

/// Test authenticated endpoint requires token
#[tokio::test]
async fn test_protected_endpoint_requires_auth() {
    // Arrange
    // let app = TestApp::new().await;

    // Act - try to access protected endpoint without token
    // let response = app.get("/api/v1/users/@me").await;

    // Assert
    // assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(true); // Placeholder
}

/// Test authenticated endpoint works with valid token
#[tokio::test]
async fn test_protected_endpoint_works_with_valid_token() {
    // Arrange - register and login
    // let app = TestApp::new().await;
    // ...register, login, extract access_token...

    // Act
    // let response = app.get_auth("/api/v1/users/@me", &access_token).await;

    // Assert
    // assert_eq!(response.status(), StatusCode::OK);
    assert!(true); // Placeholder
}
