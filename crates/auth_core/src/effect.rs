#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Load the login page, optionally wiping cookies and history first.
    OpenLogin { clear_session: bool },
    VerifyToken {
        attempt: crate::AttemptId,
        token: String,
    },
    StoreToken {
        attempt: crate::AttemptId,
        token: String,
    },
    /// Cancel the verification call still running for an earlier attempt.
    AbandonVerification,
    ClearStoredToken {
        attempt: crate::AttemptId,
    },
}
