//! Tests for the validation pool
//!
//! Exercises the request/confirm/consume lifecycle and window expiry with a
//! manual clock, so no test waits on wall-clock time except the reaper test.

#[cfg(test)]
mod tests {
    use crate::{
        ValidationError,
        clock::ManualClock,
        config::ValidationConfig,
        pool::Mempool,
        validation::{EthereumVerifier, SignatureVerifier, VerificationError},
    };
    use ethers::signers::{LocalWallet, Signer};
    use std::sync::Arc;
    use std::time::Duration;

    const START: u64 = 1_532_296_090;

    /// Verifier that accepts the literal signature "good"
    struct FixedSignature;

    impl SignatureVerifier for FixedSignature {
        fn verify(
            &self,
            _message: &str,
            _identity: &str,
            signature: &str,
        ) -> Result<bool, VerificationError> {
            match signature {
                "good" => Ok(true),
                "garbage" => Err(VerificationError::MalformedSignature("garbage".to_string())),
                _ => Ok(false),
            }
        }
    }

    /// Helper function to create a pool with a 300s window
    fn new_pool(verifier: Arc<dyn SignatureVerifier>) -> (Arc<Mempool>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(START));
        let pool = Mempool::new(ValidationConfig::default(), clock.clone(), verifier);
        (Arc::new(pool), clock)
    }

    #[tokio::test]
    async fn test_request_builds_challenge_message() {
        let (pool, _) = new_pool(Arc::new(FixedSignature));

        let request = pool.request_validation("A", START).await;

        assert_eq!(request.identity, "A");
        assert_eq!(request.created_at, START);
        assert_eq!(request.message, format!("A:{}:starRegistry", START));
        assert_eq!(request.remaining_window, 300);
        assert_eq!(pool.len().await, 1);
    }

    #[tokio::test]
    async fn test_repeated_request_returns_same_request() {
        let (pool, clock) = new_pool(Arc::new(FixedSignature));

        let first = pool.request_validation("A", START).await;
        clock.advance(1);
        let second = pool.request_validation("A", START + 1).await;

        assert_eq!(second.message, first.message);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.remaining_window < first.remaining_window);
        assert_eq!(second.remaining_window, 299);
        assert_eq!(pool.len().await, 1);
    }

    #[tokio::test]
    async fn test_repeated_request_does_not_extend_window() {
        let (pool, clock) = new_pool(Arc::new(FixedSignature));

        pool.request_validation("A", START).await;
        clock.advance(200);
        pool.request_validation("A", START + 200).await;
        clock.advance(100);

        let err = pool.confirm_validation("A", "good").await.unwrap_err();
        assert_eq!(err, ValidationError::NotFound("A".to_string()));
    }

    #[tokio::test]
    async fn test_confirm_with_valid_signature() {
        let (pool, clock) = new_pool(Arc::new(FixedSignature));
        pool.request_validation("A", START).await;
        clock.advance(10);

        let confirmed = pool.confirm_validation("A", "good").await.unwrap();

        assert!(confirmed.confirmed);
        assert!(confirmed.status.message_signature);
        assert_eq!(confirmed.status.address, "A");
        assert_eq!(confirmed.status.request_time_stamp, START);
        assert_eq!(confirmed.status.validation_window, 290);
        assert!(pool.is_confirmed("A").await);
    }

    #[tokio::test]
    async fn test_reconfirm_is_idempotent() {
        let (pool, clock) = new_pool(Arc::new(FixedSignature));
        pool.request_validation("A", START).await;

        let first = pool.confirm_validation("A", "good").await.unwrap();
        clock.advance(5);
        let second = pool.confirm_validation("A", "good").await.unwrap();

        assert_eq!(second.status.message, first.status.message);
        assert_eq!(second.status.validation_window, first.status.validation_window - 5);
        assert_eq!(pool.len().await, 1);
        assert!(pool.is_confirmed("A").await);
    }

    #[tokio::test]
    async fn test_confirm_without_request_is_not_found() {
        let (pool, _) = new_pool(Arc::new(FixedSignature));
        let err = pool.confirm_validation("nobody", "good").await.unwrap_err();
        assert_eq!(err, ValidationError::NotFound("nobody".to_string()));
    }

    #[tokio::test]
    async fn test_confirm_with_wrong_signature() {
        let (pool, _) = new_pool(Arc::new(FixedSignature));
        pool.request_validation("A", START).await;

        let err = pool.confirm_validation("A", "forged").await.unwrap_err();
        assert_eq!(err, ValidationError::InvalidSignature("A".to_string()));
        assert!(!pool.is_confirmed("A").await);

        // The request is still pending and can be confirmed afterwards
        assert!(pool.confirm_validation("A", "good").await.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_signature_is_verification_error() {
        let (pool, _) = new_pool(Arc::new(FixedSignature));
        pool.request_validation("A", START).await;

        let err = pool.confirm_validation("A", "garbage").await.unwrap_err();
        assert!(matches!(err, ValidationError::Verification(_)));
        assert!(!pool.is_confirmed("A").await);
    }

    #[tokio::test]
    async fn test_consume_makes_confirmation_single_use() {
        let (pool, _) = new_pool(Arc::new(FixedSignature));
        pool.request_validation("A", START).await;
        pool.confirm_validation("A", "good").await.unwrap();

        pool.consume("A").await;

        assert!(!pool.is_confirmed("A").await);
        let err = pool.confirm_validation("A", "good").await.unwrap_err();
        assert_eq!(err, ValidationError::NotFound("A".to_string()));
        assert!(pool.is_empty().await);

        // A fresh request starts a new cycle with a new message
        let again = pool.request_validation("A", START + 7).await;
        assert_eq!(again.message, format!("A:{}:starRegistry", START + 7));
    }

    #[tokio::test]
    async fn test_consume_is_idempotent() {
        let (pool, _) = new_pool(Arc::new(FixedSignature));
        pool.consume("ghost").await;
        pool.request_validation("A", START).await;
        pool.consume("A").await;
        pool.consume("A").await;
        assert!(pool.is_empty().await);
    }

    #[tokio::test]
    async fn test_take_confirmation_is_exclusive() {
        let (pool, _) = new_pool(Arc::new(FixedSignature));
        pool.request_validation("A", START).await;
        pool.confirm_validation("A", "good").await.unwrap();

        let taken = pool.take_confirmation("A").await.unwrap();
        assert_eq!(taken.status.address, "A");
        assert!(pool.take_confirmation("A").await.is_none());
        assert!(!pool.is_confirmed("A").await);

        pool.restore_confirmation(taken).await;
        assert!(pool.is_confirmed("A").await);
        assert!(pool.take_confirmation("A").await.is_some());
    }

    #[tokio::test]
    async fn test_restore_after_expiry_is_dropped() {
        let (pool, clock) = new_pool(Arc::new(FixedSignature));
        pool.request_validation("A", START).await;
        pool.confirm_validation("A", "good").await.unwrap();
        let taken = pool.take_confirmation("A").await.unwrap();

        clock.advance(300);
        pool.restore_confirmation(taken).await;

        assert!(!pool.is_confirmed("A").await);
        assert!(pool.is_empty().await);
    }

    #[tokio::test]
    async fn test_backdated_request_is_evicted_on_next_operation() {
        let (pool, _) = new_pool(Arc::new(FixedSignature));

        let request = pool.request_validation("A", START - 400).await;
        assert_eq!(request.remaining_window, -100);
        assert_eq!(request.message, format!("A:{}:starRegistry", START - 400));
        assert_eq!(pool.len().await, 1);

        let err = pool.confirm_validation("A", "good").await.unwrap_err();
        assert_eq!(err, ValidationError::NotFound("A".to_string()));
        assert!(pool.is_empty().await);
    }

    #[tokio::test]
    async fn test_unconfirmed_request_expires() {
        let (pool, clock) = new_pool(Arc::new(FixedSignature));
        pool.request_validation("A", START).await;

        clock.advance(299);
        let still_open = pool.request_validation("A", START + 299).await;
        assert_eq!(still_open.remaining_window, 1);

        clock.advance(1);
        let err = pool.confirm_validation("A", "good").await.unwrap_err();
        assert_eq!(err, ValidationError::NotFound("A".to_string()));
    }

    #[tokio::test]
    async fn test_confirmation_expires_with_window() {
        let (pool, clock) = new_pool(Arc::new(FixedSignature));
        pool.request_validation("A", START).await;
        pool.confirm_validation("A", "good").await.unwrap();

        clock.advance(300);

        assert!(!pool.is_confirmed("A").await);
        assert!(pool.is_empty().await);
    }

    #[tokio::test]
    async fn test_sweep_reports_evicted_identities() {
        let (pool, clock) = new_pool(Arc::new(FixedSignature));
        pool.request_validation("A", START).await;
        clock.advance(100);
        pool.request_validation("B", START + 100).await;

        clock.advance(200);
        assert_eq!(pool.sweep().await, vec!["A".to_string()]);
        assert_eq!(pool.len().await, 1);

        clock.advance(100);
        assert_eq!(pool.sweep().await, vec!["B".to_string()]);
        assert!(pool.sweep().await.is_empty());
    }

    #[tokio::test]
    async fn test_identities_are_independent() {
        let (pool, _) = new_pool(Arc::new(FixedSignature));
        pool.request_validation("A", START).await;
        pool.request_validation("B", START).await;
        pool.confirm_validation("A", "good").await.unwrap();

        pool.consume("A").await;

        assert!(!pool.is_confirmed("A").await);
        assert!(!pool.is_confirmed("B").await);
        assert!(pool.confirm_validation("B", "good").await.is_ok());
    }

    #[tokio::test]
    async fn test_reaper_evicts_in_background() {
        let (pool, clock) = new_pool(Arc::new(FixedSignature));
        pool.request_validation("A", START).await;

        let reaper = pool.clone().spawn_reaper(Duration::from_millis(10));
        clock.advance(301);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(pool.is_empty().await);
        reaper.abort();
    }

    #[tokio::test]
    async fn test_end_to_end_with_ethereum_signature() {
        let wallet: LocalWallet = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318"
            .parse()
            .unwrap();
        let identity = format!("{:?}", wallet.address());
        let (pool, _) = new_pool(Arc::new(EthereumVerifier));

        let request = pool.request_validation(&identity, START).await;
        let signature = wallet.sign_message(request.message.as_str()).await.unwrap();

        let wrong = wallet.sign_message("not the challenge").await.unwrap();
        let err = pool
            .confirm_validation(&identity, &wrong.to_string())
            .await
            .unwrap_err();
        assert_eq!(err, ValidationError::InvalidSignature(identity.clone()));

        let confirmed = pool
            .confirm_validation(&identity, &signature.to_string())
            .await
            .unwrap();
        assert!(confirmed.confirmed);
        assert!(pool.is_confirmed(&identity).await);
    }
}
