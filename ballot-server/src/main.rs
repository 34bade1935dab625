use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;

mod db;
mod error;
mod extractors;
mod handlers;

pub use error::Error;

use extractors::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let db_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(8)
        .connect(&db_url)
        .await
        .with_context(|| format!("opening database {:?}", db_url))?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("running migrations")?;

    let state = AppState {
        db: db::PgStore::new(pool),
    };

    let app = Router::new()
        .route(
            "/api/polls",
            post(handlers::create_poll).get(handlers::list_feed),
        )
        .route("/api/polls/:poll_id/vote", post(handlers::cast_vote))
        .route(
            "/api/polls/:poll_id/comments",
            post(handlers::add_comment).get(handlers::list_comments),
        )
        .route(
            "/api/profile",
            get(handlers::own_profile).put(handlers::update_profile),
        )
        .route("/api/profile/:username", get(handlers::profile_by_username))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state);

    let addr = match std::env::var("LISTEN_ADDR") {
        Ok(addr) => addr.parse().with_context(|| format!("parsing listen address {addr:?}"))?,
        Err(_) => SocketAddr::from(([127, 0, 0, 1], 3000)),
    };
    tracing::info!("listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .context("serving axum webserver")
}
