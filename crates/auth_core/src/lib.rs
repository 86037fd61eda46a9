//! Auth core: pure navigation decisions and the login state machine.
mod candidate;
mod effect;
mod msg;
mod nav;
mod outcome;
mod state;
mod update;

pub use candidate::normalize_candidate;
pub use effect::Effect;
pub use msg::Msg;
pub use nav::{
    classify, decide, is_authenticated_page, is_token_settings_page, NavAction, NavEvent,
    NavEventKind, NavigationWatcher, PageKind, LOGIN_URL, SITE_ORIGIN, TOKEN_SETTINGS_PATH,
    TOKEN_SETTINGS_URL,
};
pub use outcome::{UserInfo, UserInfoResult, VerificationResult};
pub use state::{AttemptId, LoginFlow, SessionState};
pub use update::{
    failure_message, update, MSG_INVALID_TOKEN, MSG_RATE_LIMITED, MSG_TOKEN_NOT_FOUND,
};
