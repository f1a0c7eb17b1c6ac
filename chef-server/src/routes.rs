use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{Method, StatusCode},
    routing::get,
    Router,
};
use chef::{ParameterSet, PromptKind, PromptService};
use tower_http::cors::{Any, CorsLayer};

use crate::errors::WebResult;

#[derive(Clone)]
pub struct AppState {
    pub prompts: Arc<PromptService>,
}

/// Build the application router.
///
/// The two prompt routes are served both at the root and under `/springAI`,
/// which is where the web front end looks for them.
pub fn router(state: AppState) -> Router {
    let prompts = Router::new()
        // `GET /recipe-creater` goes to `create_recipe`
        .route("/recipe-creater", get(create_recipe))
        // `GET /cuisinesacross` goes to `cuisines_across`
        .route("/cuisinesacross", get(cuisines_across));

    Router::new()
        // `GET /health` goes to `health`
        .route("/health", get(health))
        .merge(prompts.clone())
        .nest("/springAI", prompts)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
        .layer(
            tower_http::compression::CompressionLayer::new()
                .quality(tower_http::CompressionLevel::Fastest),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

// Just reply that everything is okay
async fn health() -> StatusCode {
    StatusCode::OK
}

/// Generate a recipe from `ingredients`, `cuisine` and `dieteryRestrictions`.
///
/// The query goes to the renderer as-is, so a parameter that was left out is
/// reported as missing while one that was sent empty is rendered empty.
async fn create_recipe(
    State(state): State<AppState>,
    Query(parameters): Query<ParameterSet>,
) -> WebResult<String> {
    tracing::info!("Entered recipe creater");
    Ok(state
        .prompts
        .generate(PromptKind::Recipe, &parameters)
        .await?)
}

/// List the cuisines native to `continent`, as free text.
async fn cuisines_across(
    State(state): State<AppState>,
    Query(parameters): Query<ParameterSet>,
) -> WebResult<String> {
    tracing::info!("Entered cuisines across");
    Ok(state
        .prompts
        .generate(PromptKind::NativeCuisines, &parameters)
        .await?)
}
