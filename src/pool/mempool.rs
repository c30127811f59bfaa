//! Mempool Module
//!
//! This module implements the pool of pending validation requests.
//! Each identity holds at most one request. A request lives for a fixed
//! window counted from its creation; re-requesting does not extend it.
//!
//! All state sits behind one async mutex, and every operation first fires
//! any evictions that have come due, so an expired request is never
//! observed even if the background reaper has not run yet.

use super::eviction::EvictionTable;
use crate::{
    ConfirmedRequest, PendingRequest, RequestStatus, ValidationError,
    clock::Clock,
    config::ValidationConfig,
    validation::SignatureVerifier,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Pool state for all identities
#[derive(Default)]
struct PoolState {
    pending: HashMap<String, PendingRequest>,
    confirmed: HashMap<String, ConfirmedRequest>,
    evictions: EvictionTable,
}

impl PoolState {
    /// Drop every trace of `identity`; returns whether anything was removed
    fn clear(&mut self, identity: &str) -> bool {
        let had_pending = self.pending.remove(identity).is_some();
        let had_confirmed = self.confirmed.remove(identity).is_some();
        let had_eviction = self.evictions.cancel(identity);
        had_pending || had_confirmed || had_eviction
    }

    /// Fire evictions due at `now`
    fn sweep(&mut self, now: u64) -> Vec<String> {
        let due = self.evictions.due(now);
        for identity in &due {
            self.clear(identity);
        }
        due
    }
}

/// Pool of pending and confirmed validation requests
pub struct Mempool {
    config: ValidationConfig,
    clock: Arc<dyn Clock>,
    verifier: Arc<dyn SignatureVerifier>,
    state: Mutex<PoolState>,
}

impl Mempool {
    /// Creates an empty mempool
    ///
    /// # Arguments
    /// * `config` - Validation window and protocol tag
    /// * `clock` - Time source for windows and evictions
    /// * `verifier` - Signature verifier for challenge messages
    pub fn new(
        config: ValidationConfig,
        clock: Arc<dyn Clock>,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Self {
        Self {
            config,
            clock,
            verifier,
            state: Mutex::new(PoolState::default()),
        }
    }

    /// Seconds left in a window opened at `created_at`; negative once it has passed
    fn remaining_window(&self, created_at: u64, now: u64) -> i64 {
        self.config.window_seconds as i64 - (now as i64 - created_at as i64)
    }

    /// Open a validation request for `identity`, or return the one already open
    ///
    /// A repeated call returns the existing request with its remaining window
    /// recomputed; `requested_at` is ignored in that case and the eviction
    /// deadline does not move.
    pub async fn request_validation(&self, identity: &str, requested_at: u64) -> PendingRequest {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        self.sweep_locked(&mut state, now);

        if let Some(existing) = state.pending.get_mut(identity) {
            existing.remaining_window = self.remaining_window(existing.created_at, now);
            info!(
                "Validation request already exists for {} ({}s left)",
                identity, existing.remaining_window
            );
            return existing.clone();
        }

        let request = PendingRequest {
            identity: identity.to_string(),
            created_at: requested_at,
            message: format!("{}:{}:{}", identity, requested_at, self.config.protocol_tag),
            remaining_window: self.remaining_window(requested_at, now),
        };

        state.pending.insert(identity.to_string(), request.clone());
        state
            .evictions
            .schedule(identity, requested_at.saturating_add(self.config.window_seconds));
        info!("Validation request created for {}", identity);

        request
    }

    /// Check `signature` against the challenge message of `identity`'s request
    ///
    /// # Returns
    /// * `Ok(ConfirmedRequest)` once the signature verifies (repeatable)
    /// * `Err(ValidationError::NotFound)` if there is no live request
    /// * `Err(ValidationError::InvalidSignature)` if someone else signed
    /// * `Err(ValidationError::Verification)` if the signature or identity is malformed
    pub async fn confirm_validation(
        &self,
        identity: &str,
        signature: &str,
    ) -> Result<ConfirmedRequest, ValidationError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        self.sweep_locked(&mut state, now);

        let pending = state
            .pending
            .get(identity)
            .cloned()
            .ok_or_else(|| ValidationError::NotFound(identity.to_string()))?;

        let verified = self
            .verifier
            .verify(&pending.message, identity, signature)
            .map_err(|e| {
                warn!("Signature for {} could not be checked: {}", identity, e);
                ValidationError::Verification(e.to_string())
            })?;

        if !verified {
            warn!("Invalid signature submitted for {}", identity);
            return Err(ValidationError::InvalidSignature(identity.to_string()));
        }

        let window = self.remaining_window(pending.created_at, now);
        let confirmed = state
            .confirmed
            .entry(identity.to_string())
            .or_insert_with(|| ConfirmedRequest {
                confirmed: true,
                status: RequestStatus {
                    address: identity.to_string(),
                    request_time_stamp: pending.created_at,
                    message: pending.message.clone(),
                    validation_window: window,
                    message_signature: true,
                },
            });
        confirmed.status.validation_window = window;
        info!("Validation request confirmed for {}", identity);

        Ok(confirmed.clone())
    }

    /// Whether `identity` holds a live confirmation
    pub async fn is_confirmed(&self, identity: &str) -> bool {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        self.sweep_locked(&mut state, now);
        state.confirmed.contains_key(identity)
    }

    /// Claim `identity`'s confirmation so no other caller can use it
    ///
    /// The request itself stays pending until `consume`; hand the confirmation
    /// back with `restore_confirmation` if the claimed write did not happen.
    pub async fn take_confirmation(&self, identity: &str) -> Option<ConfirmedRequest> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        self.sweep_locked(&mut state, now);

        let taken = state.confirmed.remove(identity);
        if taken.is_some() {
            debug!("Confirmation claimed for {}", identity);
        }
        taken
    }

    /// Return a confirmation claimed by `take_confirmation`
    ///
    /// Ignored if the request has expired or been consumed in the meantime.
    pub async fn restore_confirmation(&self, confirmation: ConfirmedRequest) {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        self.sweep_locked(&mut state, now);

        let identity = confirmation.status.address.clone();
        if state.pending.contains_key(&identity) {
            info!("Confirmation restored for {}", identity);
            state.confirmed.insert(identity, confirmation);
        } else {
            debug!("Request for {} is gone, dropping claimed confirmation", identity);
        }
    }

    /// Remove every trace of `identity` after its confirmation has been used
    ///
    /// Safe to call for identities that are unknown or already evicted.
    pub async fn consume(&self, identity: &str) {
        let mut state = self.state.lock().await;
        if state.clear(identity) {
            info!("Validation request consumed for {}", identity);
        } else {
            debug!("Nothing to consume for {}", identity);
        }
    }

    /// Fire every eviction that has come due
    ///
    /// # Returns
    /// The identities that were evicted
    pub async fn sweep(&self) -> Vec<String> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        self.sweep_locked(&mut state, now)
    }

    fn sweep_locked(&self, state: &mut PoolState, now: u64) -> Vec<String> {
        let evicted = state.sweep(now);
        for identity in &evicted {
            info!("Validation request expired for {}", identity);
        }
        evicted
    }

    /// Spawn a background task that sweeps the pool every `every`
    ///
    /// Abort the returned handle to stop it.
    pub fn spawn_reaper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let evicted = self.sweep().await;
                if !evicted.is_empty() {
                    debug!("Reaper evicted {} validation requests", evicted.len());
                }
            }
        })
    }

    /// Number of pending requests held, including any not yet swept
    pub async fn len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
