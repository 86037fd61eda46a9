//! Auth engine: token scraping, verification, secret storage and the session worker.
mod account;
mod config;
mod persist;
mod scrape;
mod secret;
mod session;
mod verify;

pub use account::{fetch_current_user_info, verify_cached_token};
pub use auth_core::{
    NavAction, NavEvent, NavEventKind, SessionState, UserInfo, UserInfoResult,
    VerificationResult, LOGIN_URL, TOKEN_SETTINGS_URL,
};
pub use config::{AuthConfig, Clock};
pub use scrape::{
    HeuristicTokenScraper, InputRecord, PageSnapshot, TokenScraper, EXTRACTION_SCRIPT,
    MIN_INPUT_TOKEN_LEN,
};
pub use secret::{
    FileSecretStore, InMemorySecretStore, SecretStore, SecretStoreError, API_KEY_SECRET,
    SECRET_FILE_NAME,
};
pub use session::{AuthSession, BrowserCommand};
pub use verify::{
    classify_user_info, classify_verification, ReqwestVerifier, RequestError, TokenVerifier,
    VerifierSettings, API_BASE_URL, API_REVISION, API_REVISION_HEADER, USER_ENDPOINT,
};
