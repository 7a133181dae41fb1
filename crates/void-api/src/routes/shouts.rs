//! Routes for posting shouts.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use void_notifications::application::command_handlers;
use void_notifications::domain::commands;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateShoutRequest {
    /// The posting user.
    pub author_id: i64,
    /// The shout text.
    pub content: String,
}

/// Response body returned after a shout is stored.
#[derive(Debug, Serialize)]
pub struct CreateShoutResponse {
    /// Id of the stored shout.
    pub shout_id: i64,
}

/// POST /
#[instrument(skip(state, request), fields(author_id = request.author_id))]
async fn create_shout(
    State(state): State<AppState>,
    Json(request): Json<CreateShoutRequest>,
) -> Result<(StatusCode, Json<CreateShoutResponse>), ApiError> {
    let command = commands::CreateShout {
        correlation_id: Uuid::new_v4(),
        author_id: request.author_id,
        content: request.content,
    };

    info!(correlation_id = %command.correlation_id, "handling create_shout command");

    let shout = command_handlers::handle_create_shout(
        &command,
        state.clock.as_ref(),
        &*state.shout_repository,
        &state.publisher,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateShoutResponse { shout_id: shout.id }),
    ))
}

/// Returns the router for shouts.
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create_shout))
}
