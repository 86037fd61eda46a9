use crate::state::Pending;
use crate::{normalize_candidate, Effect, LoginFlow, Msg, SessionState, VerificationResult};

pub const MSG_TOKEN_NOT_FOUND: &str = "API key not found";
pub const MSG_INVALID_TOKEN: &str = "Invalid API key";
pub const MSG_RATE_LIMITED: &str = "Too many requests, try again later";

/// Pure update function: applies a message to the login flow and returns any effects.
pub fn update(mut state: LoginFlow, msg: Msg) -> (LoginFlow, Vec<Effect>) {
    if state.is_torn_down() {
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::Resumed { cached_token } => {
            if state.session() != &SessionState::Loading || state.is_busy() {
                return (state, Vec::new());
            }
            // Only verified tokens are ever stored, so a cached one skips the login.
            match cached_token.as_deref().and_then(normalize_candidate) {
                Some(_) => {
                    state.set_session(SessionState::Success);
                    Vec::new()
                }
                None => vec![Effect::OpenLogin {
                    clear_session: true,
                }],
            }
        }
        Msg::TokenExtracted(raw) => {
            // One verification per attempt: later scrapes are dropped.
            if state.session() != &SessionState::Loading || state.is_busy() {
                return (state, Vec::new());
            }
            match raw.as_deref().and_then(normalize_candidate) {
                Some(token) => {
                    state.set_pending(Some(Pending::Verifying {
                        token: token.clone(),
                    }));
                    vec![Effect::VerifyToken {
                        attempt: state.attempt(),
                        token,
                    }]
                }
                None => {
                    state.set_session(SessionState::Error(MSG_TOKEN_NOT_FOUND.to_string()));
                    Vec::new()
                }
            }
        }
        Msg::VerificationFinished { attempt, result } => {
            if attempt != state.attempt() {
                return (state, Vec::new());
            }
            let Some(Pending::Verifying { token }) = state.pending().cloned() else {
                return (state, Vec::new());
            };
            match result {
                VerificationResult::Valid(_) => {
                    state.set_pending(Some(Pending::Storing));
                    vec![Effect::StoreToken { attempt, token }]
                }
                failure => {
                    state.set_pending(None);
                    state.set_session(SessionState::Error(failure_message(&failure)));
                    Vec::new()
                }
            }
        }
        Msg::TokenStored { attempt, result } => {
            if attempt != state.attempt() || state.pending() != Some(&Pending::Storing) {
                return (state, Vec::new());
            }
            state.set_pending(None);
            match result {
                Ok(()) => state.set_session(SessionState::Success),
                Err(message) => state.set_session(SessionState::Error(format!(
                    "Failed to store API key: {message}"
                ))),
            }
            Vec::new()
        }
        Msg::TokenCleared { attempt, result } => {
            if attempt != state.attempt() || state.pending() != Some(&Pending::Clearing) {
                return (state, Vec::new());
            }
            state.set_pending(None);
            match result {
                Ok(()) => vec![Effect::OpenLogin {
                    clear_session: true,
                }],
                Err(message) => {
                    state.set_session(SessionState::Error(format!(
                        "Failed to clear API key: {message}"
                    )));
                    Vec::new()
                }
            }
        }
        Msg::RetryClicked => {
            if !matches!(state.session(), SessionState::Error(_)) {
                return (state, Vec::new());
            }
            state.begin_attempt();
            vec![Effect::OpenLogin {
                clear_session: true,
            }]
        }
        Msg::LogoutRequested => {
            let mut effects = Vec::new();
            if state.begin_attempt() {
                effects.push(Effect::AbandonVerification);
            }
            // The login page opens only once the token is really gone.
            state.set_pending(Some(Pending::Clearing));
            effects.push(Effect::ClearStoredToken {
                attempt: state.attempt(),
            });
            effects
        }
        Msg::TornDown => {
            state.tear_down();
            Vec::new()
        }
    };

    (state, effects)
}

/// User-facing message for a verification that did not succeed.
pub fn failure_message(result: &VerificationResult) -> String {
    match result {
        VerificationResult::Valid(_) => String::new(),
        VerificationResult::Invalid => MSG_INVALID_TOKEN.to_string(),
        VerificationResult::NoToken => MSG_TOKEN_NOT_FOUND.to_string(),
        VerificationResult::RateLimited => MSG_RATE_LIMITED.to_string(),
        VerificationResult::NetworkError(message) | VerificationResult::Error(message) => {
            format!("Failed to verify API key: {message}")
        }
    }
}
