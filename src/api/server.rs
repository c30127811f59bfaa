//! API Server Module
//!
//! This module implements the REST server in front of the chain and the
//! validation pool.
//!
//! # Flow
//! 1. `POST /requestValidation` opens a request and returns the message to sign
//! 2. `POST /message-signature/validate` checks the signature
//! 3. `POST /block` registers one star per confirmed request
//! 4. `GET` routes look blocks up by height, hash or address

use super::error::ApiError;
use crate::{
    Block, Body, ConfirmedRequest, PendingRequest, Star,
    chain::Blockchain,
    clock::Clock,
    config::Config,
    pool::Mempool,
};
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state that is accessible across all request handlers
///
/// - `blockchain`: The ledger blocks are appended to
/// - `mempool`: Pending and confirmed validation requests
/// - `clock`: Time source for request timestamps
/// - `max_story_len`: Longest star story accepted
#[derive(Clone)]
pub struct AppState {
    blockchain: Arc<Blockchain>,
    mempool: Arc<Mempool>,
    clock: Arc<dyn Clock>,
    max_story_len: usize,
}

impl AppState {
    pub fn new(
        blockchain: Arc<Blockchain>,
        mempool: Arc<Mempool>,
        clock: Arc<dyn Clock>,
        max_story_len: usize,
    ) -> Self {
        Self {
            blockchain,
            mempool,
            clock,
            max_story_len,
        }
    }
}

/// The main API server struct
pub struct Server {
    config: Config,
    state: AppState,
}

impl Server {
    /// Creates a new API server instance
    ///
    /// # Arguments
    /// * `config` - Node configuration (host, port, story limit)
    /// * `blockchain` - The ledger to serve
    /// * `mempool` - The validation pool gating writes
    /// * `clock` - Time source for new validation requests
    pub fn new(
        config: Config,
        blockchain: Arc<Blockchain>,
        mempool: Arc<Mempool>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = AppState::new(
            blockchain,
            mempool,
            clock,
            config.validation.max_story_len,
        );
        Self { config, state }
    }

    /// Starts the API server and begins listening for incoming requests
    ///
    /// # Returns
    /// `Ok(())` when the server shuts down, or an error if binding fails
    pub async fn start(self) -> anyhow::Result<()> {
        let app = router(self.state);

        let addr = format!("{}:{}", self.config.api.host, self.config.api.port);
        info!("API server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Build the router with all endpoints
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/requestValidation", post(request_validation))
        .route("/message-signature/validate", post(validate_signature))
        .route("/block", post(post_block))
        .route("/block/:height", get(get_block_by_height))
        .route("/stars/hash/:hash", get(get_block_by_hash))
        .route("/stars/address/:address", get(get_blocks_by_address))
        .route("/height", get(get_height))
        .route("/chain/validate", get(validate_chain))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ValidationRequest {
    address: String,
}

#[derive(Debug, Deserialize)]
struct SignatureRequest {
    address: String,
    signature: String,
}

/// Star registration payload: an address and one star, nothing else
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StarRequest {
    address: String,
    star: StarInput,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StarInput {
    ra: String,
    dec: String,
    story: String,
}

#[derive(Debug, Serialize)]
struct HeightResponse {
    height: i64,
}

#[derive(Debug, Serialize)]
struct ChainReport {
    valid: bool,
    errors: Vec<String>,
}

fn bad_payload(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(format!("the payload format is not correct: {}", rejection.body_text()))
}

fn require_address(address: &str) -> Result<(), ApiError> {
    if address.trim().is_empty() {
        return Err(ApiError::BadRequest("a wallet address is required".to_string()));
    }
    Ok(())
}

/// Render a block with its story decoded next to the stored hex
fn with_decoded_story(block: &Block) -> Result<Value, ApiError> {
    let mut value = serde_json::to_value(block)?;
    let decoded = block.story().and_then(|story| hex::decode(story).ok());
    let star = value.pointer_mut("/body/star").and_then(Value::as_object_mut);
    if let (Some(bytes), Some(star)) = (decoded, star) {
        star.insert(
            "storyDecoded".to_string(),
            Value::String(String::from_utf8_lossy(&bytes).into_owned()),
        );
    }
    Ok(value)
}

/// POST /requestValidation
async fn request_validation(
    State(state): State<AppState>,
    payload: Result<Json<ValidationRequest>, JsonRejection>,
) -> Result<Json<PendingRequest>, ApiError> {
    let Json(payload) = payload.map_err(bad_payload)?;
    require_address(&payload.address)?;

    let requested_at = state.clock.now();
    info!("Validation requested by {} at {}", payload.address, requested_at);

    let request = state
        .mempool
        .request_validation(&payload.address, requested_at)
        .await;
    Ok(Json(request))
}

/// POST /message-signature/validate
async fn validate_signature(
    State(state): State<AppState>,
    payload: Result<Json<SignatureRequest>, JsonRejection>,
) -> Result<Json<ConfirmedRequest>, ApiError> {
    let Json(payload) = payload.map_err(bad_payload)?;
    require_address(&payload.address)?;

    let confirmed = state
        .mempool
        .confirm_validation(&payload.address, &payload.signature)
        .await?;
    Ok(Json(confirmed))
}

/// POST /block
///
/// Registers a star for an address holding a confirmed validation request,
/// then consumes that request. The confirmation is claimed before the write,
/// so concurrent posts for one address produce at most one block.
async fn post_block(
    State(state): State<AppState>,
    payload: Result<Json<StarRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = payload.map_err(bad_payload)?;
    require_address(&payload.address)?;

    if payload.star.story.chars().count() > state.max_story_len {
        warn!("Star story from {} is too long", payload.address);
        return Err(ApiError::BadRequest(format!(
            "the length of the star story is greater than {}",
            state.max_story_len
        )));
    }

    let Some(confirmation) = state.mempool.take_confirmation(&payload.address).await else {
        warn!("No confirmed validation request for {}", payload.address);
        return Err(ApiError::BadRequest(
            "the request for the wallet address is not valid, does not exist, or has already been used"
                .to_string(),
        ));
    };

    let body = Body {
        address: payload.address.clone(),
        star: Star {
            ra: payload.star.ra,
            dec: payload.star.dec,
            story: hex::encode(payload.star.story),
        },
    };

    let block = match state.blockchain.append(body).await {
        Ok(block) => block,
        Err(e) => {
            state.mempool.restore_confirmation(confirmation).await;
            return Err(e.into());
        }
    };
    state.mempool.consume(&payload.address).await;

    Ok(Json(with_decoded_story(&block)?))
}

/// GET /block/:height
async fn get_block_by_height(
    State(state): State<AppState>,
    Path(height): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    let block = state.blockchain.get(height).await?;
    Ok(Json(with_decoded_story(&block)?))
}

/// GET /stars/hash/:hash
async fn get_block_by_hash(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let block = state.blockchain.get_by_hash(&hash).await?;
    Ok(Json(with_decoded_story(&block)?))
}

/// GET /stars/address/:address
async fn get_blocks_by_address(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let blocks = state.blockchain.get_all_by_address(&address).await?;
    let rendered = blocks
        .iter()
        .map(with_decoded_story)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(rendered))
}

/// GET /height
async fn get_height(State(state): State<AppState>) -> Result<Json<HeightResponse>, ApiError> {
    let height = state.blockchain.height().await?;
    Ok(Json(HeightResponse { height }))
}

/// GET /chain/validate
async fn validate_chain(State(state): State<AppState>) -> Result<Json<ChainReport>, ApiError> {
    let discrepancies = state.blockchain.validate_chain().await?;
    Ok(Json(ChainReport {
        valid: discrepancies.is_empty(),
        errors: discrepancies.iter().map(ToString::to_string).collect(),
    }))
}
