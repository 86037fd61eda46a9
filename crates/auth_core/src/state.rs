pub type AttemptId = u64;

/// Externally observable status of the login flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Loading,
    Success,
    Error(String),
}

/// Work the flow is waiting on for the current attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Pending {
    Verifying { token: String },
    Storing,
    Clearing,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoginFlow {
    session: SessionState,
    attempt: AttemptId,
    pending: Option<Pending>,
    torn_down: bool,
    dirty: bool,
}

impl LoginFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    /// True while a verification, a store write or a logout clear is outstanding.
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Returns whether the session changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn pending(&self) -> Option<&Pending> {
        self.pending.as_ref()
    }

    pub(crate) fn set_pending(&mut self, pending: Option<Pending>) {
        self.pending = pending;
    }

    pub(crate) fn set_session(&mut self, session: SessionState) {
        if self.session != session {
            self.session = session;
            self.dirty = true;
        }
    }

    /// Starts a fresh attempt; anything still in flight for the old one becomes stale.
    /// Returns whether a verification call was outstanding.
    pub(crate) fn begin_attempt(&mut self) -> bool {
        let was_verifying = matches!(self.pending, Some(Pending::Verifying { .. }));
        self.attempt += 1;
        self.pending = None;
        self.set_session(SessionState::Loading);
        was_verifying
    }

    pub(crate) fn tear_down(&mut self) {
        self.torn_down = true;
        self.pending = None;
    }
}
