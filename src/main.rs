use std::time::Duration;

use dotenvy::dotenv;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use slateboard::modules::auth::ledger::{PgTokenLedger, spawn_purge_sweep};
use slateboard::router::init_router;
use slateboard::state::init_app_state;

const PURGE_SWEEP_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "{}=debug,tower_http=debug,axum::rejection=trace",
                    env!("CARGO_CRATE_NAME")
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = init_app_state().await;

    // Daily sweep of expired+revoked ledger rows, decoupled from request
    // handling.
    spawn_purge_sweep(PgTokenLedger::new(state.db.clone()), PURGE_SWEEP_PERIOD);

    let app = init_router(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    println!("🚀 Server running on http://localhost:3000");
    println!("📚 Swagger UI available at http://localhost:3000/swagger-ui");
    println!("📖 Scalar UI available at http://localhost:3000/scalar");
    axum::serve(listener, app).await.unwrap();
}
