//! HTTP surface.
//!
//! Thin layer over [`crate::convert::Converter`]: parse parameters, delegate,
//! turn the result into JSON. Errors are rendered by [`error::ApiError`].

pub mod error;
pub mod models;
pub mod routes;
pub mod state;

pub use error::{ApiError, ErrorResponse};
pub use state::AppState;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Allowance for multipart framing and the `options` part on top of the
/// PDF size limit.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Build the application router.
///
/// `/files` serves the output directory when the default storage type
/// persists files.
pub fn router(state: AppState) -> Router {
    let config = state.config();

    let mut app = Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/convert", post(routes::convert))
        .route("/convert-advanced", post(routes::convert_advanced))
        .route("/convert-from-url", post(routes::convert_from_url))
        .route("/info", post(routes::pdf_info));

    if config.serves_files() {
        tracing::info!("Serving {} at /files", config.output_dir.display());
        app = app.nest_service("/files", ServeDir::new(&config.output_dir));
    }

    let body_limit = config.max_file_size.saturating_add(MULTIPART_OVERHEAD);
    let cors = cors_layer(&config.cors_origins);

    app.layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// `*` anywhere in `origins` allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o.trim() == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
