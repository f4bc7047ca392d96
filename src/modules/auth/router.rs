use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

use super::controller::{
    confirm_account, generate_activation_code, login, logout, me, refresh_token, register,
};

pub fn init_auth_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
        .route("/confirm-account", put(confirm_account))
        .route("/activation-code", post(generate_activation_code))
        .route("/logout", post(logout))
        .route("/me", get(me))
}
