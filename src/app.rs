use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::handlers::{protected, public};
use crate::middleware::require_auth;
use crate::state::AppState;

/// Full router: public tier, protected tier behind bearer auth, global layers
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security);

    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::system::root_get))
        .route("/health", get(public::system::health_get))
        // Identity provider passthrough
        .route("/login", post(public::auth::login_post))
        .route("/register", post(public::auth::register_post))
        .route("/refresh", post(public::auth::refresh_post))
        .route("/profiles", get(public::profiles::profiles_get))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Session
        .route("/logout", post(protected::auth::logout_post))
        .route("/whoami", get(protected::auth::whoami_get))
        // Profiles
        .route("/profiles/me", put(protected::profiles::profile_me_put))
        // Entries
        .route(
            "/entries",
            get(protected::entries::entries_get)
                .post(protected::entries::entries_post)
                .put(protected::entries::entries_put),
        )
        .route("/delete", delete(protected::entries::entry_delete))
        // Pre-key bundles
        .route("/keys/bundle", post(protected::keys::bundle_post))
        .route("/keys/bundle/:user_id", get(protected::keys::bundle_get))
        .route("/keys/bundle/:user_id/count", get(protected::keys::bundle_count_get))
        .route_layer(from_fn_with_state(state, require_auth))
}

fn cors_layer(config: &SecurityConfig) -> CorsLayer {
    if !config.enable_cors {
        return CorsLayer::new();
    }
    if config.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any)
}
