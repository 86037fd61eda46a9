use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;

use crate::verify::VerifierSettings;

/// Source of RFC3339 timestamps, injectable so tests stay deterministic.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

pub(crate) fn utc_now() -> String {
    Utc::now().to_rfc3339()
}

/// Everything [`crate::AuthSession::from_config`] needs to build the production stack.
#[derive(Clone)]
pub struct AuthConfig {
    pub verifier: VerifierSettings,
    /// Directory holding the cached token file.
    pub secret_dir: PathBuf,
    pub clock: Clock,
}

impl AuthConfig {
    pub fn default_with_secret_dir(secret_dir: PathBuf) -> Self {
        Self {
            verifier: VerifierSettings::default(),
            secret_dir,
            clock: Arc::new(utc_now),
        }
    }
}
