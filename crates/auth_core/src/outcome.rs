/// Outcome of presenting a token to the "current user" endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// The server accepted the token. The name is empty when the body could not be read.
    Valid(String),
    Invalid,
    NoToken,
    RateLimited,
    NetworkError(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub username: String,
    pub level: u32,
    pub profile_url: String,
    pub started_at: String,
    pub subscription_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInfoResult {
    Success(UserInfo),
    NoToken,
    Error(String),
}
