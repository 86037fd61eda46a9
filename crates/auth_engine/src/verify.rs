use std::time::Duration;

use auth_core::{UserInfo, UserInfoResult, VerificationResult};
use auth_logging::{auth_debug, auth_warn, redact};
use serde_json::Value;
use thiserror::Error;

pub const API_BASE_URL: &str = "https://api.wanikani.com/v2";
pub const USER_ENDPOINT: &str = "/user";
pub const API_REVISION_HEADER: &str = "Wanikani-Revision";
pub const API_REVISION: &str = "20170710";

const HTTP_OK: u16 = 200;
const HTTP_UNAUTHORIZED: u16 = 401;
const HTTP_FORBIDDEN: u16 = 403;
const HTTP_TOO_MANY_REQUESTS: u16 = 429;

#[derive(Debug, Clone)]
pub struct VerifierSettings {
    pub api_base_url: String,
    pub revision: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            api_base_url: API_BASE_URL.to_string(),
            revision: API_REVISION.to_string(),
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
        }
    }
}

#[async_trait::async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> VerificationResult;
    async fn fetch_user_info(&self, token: &str) -> UserInfoResult;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    /// DNS, connect, timeout or reset.
    #[error("Network error: {0}")]
    Transport(String),
    #[error("{0}")]
    Unexpected(String),
}

/// Both calls hit the authenticated "current user" endpoint.
#[derive(Debug, Clone)]
pub struct ReqwestVerifier {
    settings: VerifierSettings,
}

impl ReqwestVerifier {
    pub fn new(settings: VerifierSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, RequestError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .read_timeout(self.settings.read_timeout)
            .build()
            .map_err(|err| RequestError::Unexpected(err.to_string()))
    }

    /// Returns the status code and, for 200 only, the body.
    async fn get_current_user(&self, token: &str) -> Result<(u16, String), RequestError> {
        let client = self.build_client()?;
        let url = format!(
            "{}{}",
            self.settings.api_base_url.trim_end_matches('/'),
            USER_ENDPOINT
        );

        let response = client
            .get(&url)
            .bearer_auth(token)
            .header(API_REVISION_HEADER, &self.settings.revision)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        if status != HTTP_OK {
            return Ok((status, String::new()));
        }
        let body = response.text().await.map_err(map_reqwest_error)?;
        Ok((status, body))
    }
}

#[async_trait::async_trait]
impl TokenVerifier for ReqwestVerifier {
    async fn verify(&self, token: &str) -> VerificationResult {
        if token.trim().is_empty() {
            return VerificationResult::NoToken;
        }
        auth_debug!("Verifying token {}", redact(token));

        let result = match self.get_current_user(token).await {
            Ok((status, body)) => classify_verification(status, &body),
            Err(err @ RequestError::Transport(_)) => {
                VerificationResult::NetworkError(err.to_string())
            }
            Err(err) => VerificationResult::Error(format!("Error verifying API key: {err}")),
        };
        if !matches!(result, VerificationResult::Valid(_)) {
            auth_warn!("Token {} did not verify: {:?}", redact(token), result);
        }
        result
    }

    async fn fetch_user_info(&self, token: &str) -> UserInfoResult {
        if token.trim().is_empty() {
            return UserInfoResult::NoToken;
        }

        match self.get_current_user(token).await {
            Ok((status, body)) => classify_user_info(status, &body),
            Err(err @ RequestError::Transport(_)) => UserInfoResult::Error(err.to_string()),
            Err(err) => UserInfoResult::Error(format!("Error fetching user info: {err}")),
        }
    }
}

/// Maps a "current user" response to a verification outcome.
///
/// A 200 whose body cannot be read still proves the token valid; only the
/// display name is lost.
pub fn classify_verification(status: u16, body: &str) -> VerificationResult {
    match status {
        HTTP_OK => VerificationResult::Valid(parse_username(body).unwrap_or_default()),
        HTTP_UNAUTHORIZED | HTTP_FORBIDDEN => VerificationResult::Invalid,
        HTTP_TOO_MANY_REQUESTS => VerificationResult::RateLimited,
        code => VerificationResult::NetworkError(format!("Unexpected response code: {code}")),
    }
}

pub fn classify_user_info(status: u16, body: &str) -> UserInfoResult {
    match status {
        HTTP_OK => match parse_user_info(body) {
            Some(info) => UserInfoResult::Success(info),
            None => UserInfoResult::Error("Failed to parse user info".to_string()),
        },
        code => UserInfoResult::Error(format!("Unexpected response code: {code}")),
    }
}

fn user_data(body: &str) -> Option<Value> {
    let mut root: Value = serde_json::from_str(body).ok()?;
    let data = root.get_mut("data")?.take();
    data.is_object().then_some(data)
}

fn parse_username(body: &str) -> Option<String> {
    user_data(body)?
        .get("username")?
        .as_str()
        .map(ToOwned::to_owned)
}

/// `username` and `level` are required; the rest fall back to defaults.
fn parse_user_info(body: &str) -> Option<UserInfo> {
    let data = user_data(body)?;
    let username = data.get("username")?.as_str()?.to_string();
    let level = u32::try_from(data.get("level")?.as_u64()?).ok()?;
    let optional_str = |field: &str| {
        data.get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let subscription_active = data
        .get("subscription")
        .and_then(|sub| sub.get("active"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Some(UserInfo {
        username,
        level,
        profile_url: optional_str("profile_url"),
        started_at: optional_str("started_at"),
        subscription_active,
    })
}

fn map_reqwest_error(err: reqwest::Error) -> RequestError {
    if err.is_builder() {
        return RequestError::Unexpected(err.to_string());
    }
    RequestError::Transport(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_parse_failures_still_verify() {
        for body in ["", "not json", "{}", r#"{"data":[]}"#, r#"{"data":{"username":7}}"#] {
            assert_eq!(
                classify_verification(200, body),
                VerificationResult::Valid(String::new()),
                "{body}"
            );
        }
    }

    #[test]
    fn status_codes_are_classified_before_the_body() {
        assert_eq!(classify_verification(401, ""), VerificationResult::Invalid);
        assert_eq!(classify_verification(403, ""), VerificationResult::Invalid);
        assert_eq!(classify_verification(429, ""), VerificationResult::RateLimited);
        assert_eq!(
            classify_verification(302, ""),
            VerificationResult::NetworkError("Unexpected response code: 302".to_string())
        );
        assert_eq!(
            classify_user_info(401, ""),
            UserInfoResult::Error("Unexpected response code: 401".to_string())
        );
    }

    #[test]
    fn level_must_be_a_non_negative_integer() {
        for level in ["-1", "2.5", "\"3\"", "null"] {
            let body = format!(r#"{{"data":{{"username":"alice","level":{level}}}}}"#);
            assert_eq!(
                classify_user_info(200, &body),
                UserInfoResult::Error("Failed to parse user info".to_string()),
                "{level}"
            );
        }
    }

    #[test]
    fn unparseable_optional_fields_default() {
        let body = r#"{"data":{"username":"alice","level":3,"profile_url":42,"subscription":{"active":"yes"}}}"#;
        assert_eq!(
            classify_user_info(200, body),
            UserInfoResult::Success(UserInfo {
                username: "alice".to_string(),
                level: 3,
                profile_url: String::new(),
                started_at: String::new(),
                subscription_active: false,
            })
        );
    }
}
