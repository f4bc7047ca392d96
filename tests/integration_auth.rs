mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{
    bearer_request, create_test_user, generate_unique_email, json_request, response_json,
    setup_test_app,
};
use serde_json::json;
use slateboard::modules::users::model::UserRole;
use sqlx::PgPool;
use tower::ServiceExt;

async fn token_flags(pool: &PgPool, token: &str) -> Option<(bool, bool)> {
    sqlx::query_as("SELECT expired, revoked FROM tokens WHERE token = $1")
        .bind(token)
        .fetch_optional(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
async fn test_register_returns_token_pair(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let email = generate_unique_email();

    let request = json_request(
        "POST",
        "/api/auth/register",
        &json!({
            "first_name": "Grace",
            "last_name": "Hopper",
            "email": email,
            "password": "password123",
            "role": "student"
        }),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    let access = body["access_token"].as_str().unwrap();
    let refresh = body["refresh_token"].as_str().unwrap();
    assert!(!access.is_empty());
    assert!(!refresh.is_empty());
    assert_ne!(access, refresh);

    // The access token is recorded in the ledger, valid.
    assert_eq!(token_flags(&pool, access).await, Some((false, false)));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_register_duplicate_email_conflicts(pool: PgPool) {
    let email = generate_unique_email();
    create_test_user(&pool, &email, "password123", UserRole::Student, true).await;

    let app = setup_test_app(pool.clone());
    let request = json_request(
        "POST",
        "/api/auth/register",
        &json!({
            "first_name": "Grace",
            "last_name": "Hopper",
            "email": email,
            "password": "password123",
            "role": "student"
        }),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_success(pool: PgPool) {
    let email = generate_unique_email();
    create_test_user(&pool, &email, "testpass123", UserRole::Teacher, true).await;

    let app = setup_test_app(pool.clone());
    let request = json_request(
        "POST",
        "/api/auth/login",
        &json!({ "email": email, "password": "testpass123" }),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert!(body.get("access_token").is_some());
    assert!(body.get("refresh_token").is_some());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_unknown_user(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let request = json_request(
        "POST",
        "/api/auth/login",
        &json!({ "email": "nobody@school.test", "password": "whatever123" }),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_wrong_password(pool: PgPool) {
    let email = generate_unique_email();
    create_test_user(&pool, &email, "correctpass", UserRole::Student, true).await;

    let app = setup_test_app(pool.clone());
    let request = json_request(
        "POST",
        "/api/auth/login",
        &json!({ "email": email, "password": "wrongpassword" }),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_disabled_account(pool: PgPool) {
    let email = generate_unique_email();
    create_test_user(&pool, &email, "testpass123", UserRole::Student, false).await;

    let app = setup_test_app(pool.clone());
    let request = json_request(
        "POST",
        "/api/auth/login",
        &json!({ "email": email, "password": "testpass123" }),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_second_login_revokes_first_access_token(pool: PgPool) {
    let email = generate_unique_email();
    create_test_user(&pool, &email, "testpass123", UserRole::Student, true).await;

    let app = setup_test_app(pool.clone());
    let login = json!({ "email": email, "password": "testpass123" });

    let first = response_json(
        app.clone()
            .oneshot(json_request("POST", "/api/auth/login", &login))
            .await
            .unwrap(),
    )
    .await;
    let second = response_json(
        app.oneshot(json_request("POST", "/api/auth/login", &login))
            .await
            .unwrap(),
    )
    .await;

    let first_access = first["access_token"].as_str().unwrap();
    let second_access = second["access_token"].as_str().unwrap();

    assert_eq!(token_flags(&pool, first_access).await, Some((true, true)));
    assert_eq!(token_flags(&pool, second_access).await, Some((false, false)));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_refresh_rotates_access_token_only(pool: PgPool) {
    let email = generate_unique_email();
    create_test_user(&pool, &email, "testpass123", UserRole::Student, true).await;

    let app = setup_test_app(pool.clone());
    let login = response_json(
        app.clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                &json!({ "email": email, "password": "testpass123" }),
            ))
            .await
            .unwrap(),
    )
    .await;

    let old_access = login["access_token"].as_str().unwrap();
    let refresh = login["refresh_token"].as_str().unwrap();

    let response = app
        .oneshot(bearer_request("POST", "/api/auth/refresh-token", refresh))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let new_access = body["access_token"].as_str().unwrap();
    assert_ne!(new_access, old_access);
    assert_eq!(body["refresh_token"].as_str().unwrap(), refresh);

    assert_eq!(token_flags(&pool, old_access).await, Some((true, true)));
    assert_eq!(token_flags(&pool, new_access).await, Some((false, false)));
    assert_eq!(token_flags(&pool, refresh).await, Some((false, false)));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_refresh_without_header_is_a_noop(pool: PgPool) {
    let app = setup_test_app(pool.clone());

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/refresh-token")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_refresh_with_garbage_token(pool: PgPool) {
    let app = setup_test_app(pool.clone());

    let response = app
        .oneshot(bearer_request("POST", "/api/auth/refresh-token", "garbage"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_logout_is_idempotent(pool: PgPool) {
    let email = generate_unique_email();
    create_test_user(&pool, &email, "testpass123", UserRole::Student, true).await;

    let app = setup_test_app(pool.clone());
    let login = response_json(
        app.clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                &json!({ "email": email, "password": "testpass123" }),
            ))
            .await
            .unwrap(),
    )
    .await;
    let access = login["access_token"].as_str().unwrap();

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(bearer_request("POST", "/api/auth/logout", access))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(token_flags(&pool, access).await, Some((true, true)));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_me_requires_authentication(pool: PgPool) {
    let app = setup_test_app(pool.clone());

    let request = Request::builder()
        .method("GET")
        .uri("/api/auth/me")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_me_with_valid_token(pool: PgPool) {
    let email = generate_unique_email();
    create_test_user(&pool, &email, "testpass123", UserRole::Teacher, true).await;

    let app = setup_test_app(pool.clone());
    let login = response_json(
        app.clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                &json!({ "email": email, "password": "testpass123" }),
            ))
            .await
            .unwrap(),
    )
    .await;
    let access = login["access_token"].as_str().unwrap();

    let response = app
        .oneshot(bearer_request("GET", "/api/auth/me", access))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["email"], email);
    assert_eq!(body["role"], "teacher");
    assert!(
        body["authorities"]
            .as_array()
            .unwrap()
            .contains(&json!("grades:create"))
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_me_with_revoked_token_is_unauthorized(pool: PgPool) {
    let email = generate_unique_email();
    create_test_user(&pool, &email, "testpass123", UserRole::Student, true).await;

    let app = setup_test_app(pool.clone());
    let login = response_json(
        app.clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                &json!({ "email": email, "password": "testpass123" }),
            ))
            .await
            .unwrap(),
    )
    .await;
    let access = login["access_token"].as_str().unwrap();

    app.clone()
        .oneshot(bearer_request("POST", "/api/auth/logout", access))
        .await
        .unwrap();

    // Well-formed, correctly signed, not yet past its embedded expiry, but
    // revoked in the ledger: the request proceeds with no principal and the
    // downstream layer rejects it.
    let response = app
        .oneshot(bearer_request("GET", "/api/auth/me", access))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_activation_flow_enables_login(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let email = generate_unique_email();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            &json!({
                "first_name": "Alan",
                "last_name": "Turing",
                "email": email,
                "password": "password123",
                "role": "parent"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Login is refused until the account is confirmed.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            &json!({ "email": email, "password": "password123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Pull the activation code straight from the ledger (mail is disabled
    // in tests).
    let (code,): (String,) = sqlx::query_as(
        "SELECT t.token FROM tokens t
         JOIN users u ON u.id = t.user_id
         WHERE u.email = $1 AND t.kind = 'activation_code'",
    )
    .bind(&email)
    .fetch_one(&pool)
    .await
    .unwrap();

    let request = Request::builder()
        .method("PUT")
        .uri(format!("/api/auth/confirm-account?code={code}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            &json!({ "email": email, "password": "password123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_confirm_with_unknown_code(pool: PgPool) {
    let app = setup_test_app(pool.clone());

    let request = Request::builder()
        .method("PUT")
        .uri("/api/auth/confirm-account?code=nonexistent")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_activation_code_for_unknown_user(pool: PgPool) {
    let app = setup_test_app(pool.clone());

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/activation-code",
            &json!({ "email": "nobody@school.test" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
