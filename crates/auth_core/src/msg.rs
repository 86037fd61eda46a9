use crate::{AttemptId, VerificationResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Screen mounted; carries the token found in the secret store, if any.
    Resumed { cached_token: Option<String> },
    /// Result of scraping the token settings page, before normalization.
    TokenExtracted(Option<String>),
    /// Verification call for `attempt` completed.
    VerificationFinished {
        attempt: AttemptId,
        result: VerificationResult,
    },
    /// Secret store write for `attempt` completed.
    TokenStored {
        attempt: AttemptId,
        result: Result<(), String>,
    },
    /// Secret store removal for `attempt` completed.
    TokenCleared {
        attempt: AttemptId,
        result: Result<(), String>,
    },
    /// User asked to run the login flow again after an error.
    RetryClicked,
    /// User logged out; the cached token must go.
    LogoutRequested,
    /// Hosting screen is gone.
    TornDown,
}
