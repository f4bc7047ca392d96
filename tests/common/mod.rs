use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::Value;
use slateboard::config::cors::CorsConfig;
use slateboard::config::email::EmailConfig;
use slateboard::modules::users::model::UserRole;
use slateboard::router::init_router;
use slateboard::state::AppState;
use slateboard::testing::test_jwt_config;
use slateboard::utils::password::hash_password;
use sqlx::PgPool;
use uuid::Uuid;

pub fn setup_test_app(pool: PgPool) -> Router {
    dotenvy::dotenv().ok();
    let state = AppState {
        db: pool,
        jwt_config: test_jwt_config(),
        email_config: EmailConfig::from_env(),
        cors_config: CorsConfig::from_env(),
    };
    init_router(state)
}

pub fn generate_unique_email() -> String {
    format!("user-{}@school.test", Uuid::new_v4())
}

/// Insert a user directly, bypassing the registration endpoint.
#[allow(dead_code)]
pub async fn create_test_user(
    pool: &PgPool,
    email: &str,
    password: &str,
    role: UserRole,
    enabled: bool,
) -> Uuid {
    let hashed = hash_password(password).unwrap();

    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO users (first_name, last_name, email, password, role, enabled, locked)
         VALUES ($1, $2, $3, $4, $5, $6, FALSE)
         RETURNING id",
    )
    .bind("Test")
    .bind("User")
    .bind(email)
    .bind(hashed)
    .bind(role)
    .bind(enabled)
    .fetch_one(pool)
    .await
    .unwrap();

    id
}

#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

#[allow(dead_code)]
pub fn bearer_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub async fn response_json(response: Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}
