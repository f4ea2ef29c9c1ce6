use std::{
    env,
    net::{Ipv6Addr, SocketAddr},
};

use axum::{routing::get, Json};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

mod auth;
mod bookings;
mod context;
mod docs;
mod errors;
mod reviews;
mod schemas;
mod serialized;
mod slots;
mod venues;

pub use context::ServerContext;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9050;

pub type Router = axum::Router<ServerContext>;

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Playslot API - Ready to serve!" }))
}

/// Assembles the full route tree with the given context applied
pub fn router(context: ServerContext) -> axum::Router {
    Router::new()
        .route("/", get(root))
        .route("/api.json", get(docs::docs))
        .nest("/auth", auth::router())
        .nest("/venues", venues::router())
        .nest("/slots", slots::router())
        .nest("/bookings", bookings::router())
        .nest("/reviews", reviews::router())
        .with_state(context)
}

/// Starts the playslot server
pub async fn run_server(context: ServerContext) {
    let port = env::var("PLAYSLOT_SERVER_PORT")
        .map(|x| x.parse::<u16>().expect("Port must be a number"))
        .unwrap_or(DEFAULT_PORT);

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    axum::serve(listener, router(context).layer(cors).into_make_service())
        .await
        .unwrap();
}
