#![deny(clippy::all, clippy::pedantic)]

mod config;
mod database;
mod error;
mod memory;
mod models;
mod service;
mod short_id;
mod store;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Extension, Json, Router,
    extract::{
        Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{
        HeaderMap, HeaderValue, StatusCode, Uri,
        header::{HOST, LOCATION},
    },
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
};
use config::{Config, StoreBackend};
use database::Database;
use error::ShortenerError;
use memory::MemoryStore;
use models::{
    CredentialParams, DeleteQuery, LinkSummary, MessageResponse, ShortenParams, ShortenResponse,
};
use service::Shortener;
use short_id::ShortId;
use store::UrlStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use url::Url;

const LANDING_PAGE: &str =
    "<h1>URL Shortener</h1><p>Use POST /shorten to create a short URL.</p>";

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ShortenerError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            tracing::debug!(%rejection, "rejected request body");
            Err(ShortenerError::Validation("Request body must be a JSON object"))
        }
    }
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ShortenerError> {
    match query {
        Ok(Query(params)) => Ok(params),
        Err(rejection) => {
            tracing::debug!(%rejection, "rejected query string");
            Err(ShortenerError::Validation("Query string is malformed"))
        }
    }
}

/// `BASE_URL` if configured, otherwise `https://` plus the request's host.
///
/// The host comes from the `Host` header, or from the request URI's authority for
/// HTTP/2 clients that only send `:authority`.
fn short_url_base(
    config: &Config,
    headers: &HeaderMap,
    uri: &Uri,
) -> Result<String, ShortenerError> {
    if let Some(base_url) = &config.base_url {
        return Ok(base_url.to_string());
    }

    headers
        .get(HOST)
        .and_then(|host| host.to_str().ok())
        .or_else(|| uri.authority().map(|authority| authority.as_str()))
        .filter(|host| !host.is_empty())
        .map(|host| format!("https://{host}"))
        .ok_or(ShortenerError::Validation("Host header is required"))
}

fn location_header(destination: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(destination).ok().or_else(|| {
        let url = Url::parse(destination).ok()?;
        HeaderValue::from_str(url.as_str()).ok()
    })
}

fn found(location: HeaderValue) -> Response {
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

fn fallback_redirect(config: &Config) -> Response {
    tracing::debug!("redirecting to fallback");
    let fallback = HeaderValue::from_str(&config.fallback_url)
        .unwrap_or_else(|_| HeaderValue::from_static("/"));
    found(fallback)
}

async fn landing_route() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

#[tracing::instrument(skip_all)]
async fn shorten_url_route(
    shortener: Extension<Shortener>,
    config: Extension<Arc<Config>>,
    headers: HeaderMap,
    uri: Uri,
    params: Result<Json<ShortenParams>, JsonRejection>,
) -> Result<Json<ShortenResponse>, ShortenerError> {
    let link = json_body(params)?.validate()?;
    let base_url = short_url_base(&config, &headers, &uri)?;

    let record = shortener.create(link).await?;

    Ok(Json(ShortenResponse {
        short_url: short_id::short_url(&base_url, &record.short_id),
    }))
}

/// Always answers with a redirect: unknown ids and failures go to the fallback location.
#[tracing::instrument(skip_all, fields(short_id = %path.0))]
async fn redirect_route(
    shortener: Extension<Shortener>,
    config: Extension<Arc<Config>>,
    path: Path<String>,
) -> Response {
    let destination = match ShortId::parse(path.0) {
        Ok(short_id) => match shortener.resolve(short_id.as_str()).await {
            Ok(destination) => destination,
            Err(err) => {
                tracing::error!(err = ?err, "redirect lookup failed");
                None
            }
        },
        Err(_) => None,
    };

    if let Some(location) = destination.as_deref().and_then(location_header) {
        tracing::debug!(?location, "redirecting");
        return found(location);
    }

    fallback_redirect(&config)
}

/// `GET` on a path owned by a `POST` route is a visit to an id that cannot exist.
async fn fallback_route(config: Extension<Arc<Config>>) -> Response {
    fallback_redirect(&config)
}

#[tracing::instrument(skip_all)]
async fn list_route(
    shortener: Extension<Shortener>,
    params: Result<Json<CredentialParams>, JsonRejection>,
) -> Result<Json<Vec<LinkSummary>>, ShortenerError> {
    let owner = json_body(params)?.validate()?;

    let records = shortener.list(&owner).await?;

    Ok(Json(records.into_iter().map(LinkSummary::from).collect()))
}

#[tracing::instrument(skip_all, fields(short_id = %path.0))]
async fn delete_route(
    shortener: Extension<Shortener>,
    config: Extension<Arc<Config>>,
    path: Path<String>,
    query: Result<Query<DeleteQuery>, QueryRejection>,
    params: Result<Json<CredentialParams>, JsonRejection>,
) -> Result<Json<MessageResponse>, ShortenerError> {
    let query = query_params(query)?;
    if let Some(secret) = &config.delete_secret
        && query.secret.as_deref() != Some(secret.as_str())
    {
        return Err(ShortenerError::Forbidden);
    }
    let owner = json_body(params)?.validate()?;

    shortener.delete(&path.0, &owner).await?;

    Ok(Json(MessageResponse {
        message: "URL deleted successfully".to_owned(),
    }))
}

fn app(shortener: Shortener, config: Arc<Config>) -> Router {
    Router::new()
        .route("/", get(landing_route))
        .route("/shorten", get(fallback_route).post(shorten_url_route))
        .route("/list", get(fallback_route).post(list_route))
        .route("/delete/{short_id}", delete(delete_route))
        .route("/{short_id}", get(redirect_route))
        .layer(Extension(shortener))
        .layer(Extension(config))
        .layer(TraceLayer::new_for_http())
}

/// Connects the configured store and builds the router.
///
/// # Errors
///
/// Fails if the MongoDB connection or index setup fails.
pub async fn setup(config: Config) -> anyhow::Result<Router> {
    let store: Arc<dyn UrlStore> = match config.store {
        StoreBackend::MongoDb => {
            let url = config
                .mongodb_url
                .as_deref()
                .context("MONGODB_URL is not set")?;
            let database = Database::new(url, &config.mongodb_database)
                .await
                .context("could not connect to MongoDB")?;
            Arc::new(database)
        }
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory store, records are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let shortener = Shortener::new(store, config.store_timeout);

    Ok(app(shortener, Arc::new(config)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let port = config.port;
    let app = setup(config).await?;

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("could not bind port {port}"))?;
    tracing::info!(port, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
