//! Read paths over the cached token that do not need the login flow.

use auth_core::{UserInfoResult, VerificationResult};
use auth_logging::auth_warn;

use crate::secret::{SecretStore, API_KEY_SECRET};
use crate::verify::TokenVerifier;

/// Profile of the logged-in user, or `NoToken` when nobody is logged in.
pub async fn fetch_current_user_info(
    verifier: &dyn TokenVerifier,
    store: &dyn SecretStore,
) -> UserInfoResult {
    match store.get(API_KEY_SECRET) {
        Ok(Some(token)) => verifier.fetch_user_info(&token).await,
        Ok(None) => UserInfoResult::NoToken,
        Err(err) => {
            auth_warn!("Could not read cached token: {}", err);
            UserInfoResult::Error(format!("Failed to read API key: {err}"))
        }
    }
}

/// Re-checks the cached token against the server.
pub async fn verify_cached_token(
    verifier: &dyn TokenVerifier,
    store: &dyn SecretStore,
) -> VerificationResult {
    match store.get(API_KEY_SECRET) {
        Ok(Some(token)) => verifier.verify(&token).await,
        Ok(None) => VerificationResult::NoToken,
        Err(err) => {
            auth_warn!("Could not read cached token: {}", err);
            VerificationResult::Error(format!("Failed to read API key: {err}"))
        }
    }
}
