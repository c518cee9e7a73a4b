use std::{sync::Arc, time::Duration};

use axum::{response::Html, routing::get, Json};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as _};

use lyceum_backend::{
    cli::{Args, Command},
    config::Config,
    data::postgres::Postgres,
    routes, Error, Result, ServerState,
};

#[derive(OpenApi)]
#[openapi(components(schemas(
    common::types::User,
    common::types::Group,
    common::types::DirectMessage,
    common::types::GroupMessage,
    common::types::Conversation,
    common::types::GroupUnread,
    common::types::Notification,
    common::types::MessageCreate,
)))]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(&args.config)?;

    let sub = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.rust_log)?)
        .finish();
    tracing::subscriber::set_global_default(sub)?;

    match args.command {
        Command::Check {} => {
            println!("config ok");
            Ok(())
        }
        Command::Serve {} => serve(config).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let listen = config.listen.clone();
    let state = Arc::new(ServerState::new(config, Arc::new(Postgres::new(pool))));

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api/v1", routes::routes())
        .with_state(state)
        .split_for_parts();
    let api1 = api.clone();
    let router = router
        .route("/api/docs.json", get(|| async { Json(api) }))
        .route(
            "/api/docs",
            get(|| async { Html(Scalar::with_url("/scalar", api1).to_html()) }),
        )
        .route("/metrics", get(metrics))
        .layer(routes::cors())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind((listen.address, listen.port)).await?;
    info!("listening on http://{}:{}", listen.address, listen.port);
    axum::serve(listener, router).await?;
    Ok(())
}

async fn metrics() -> Result<String> {
    prometheus::TextEncoder::new()
        .encode_to_string(&prometheus::gather())
        .map_err(|err| Error::Internal(err.to_string()))
}
