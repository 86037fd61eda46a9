use std::sync::{mpsc, Arc};
use std::thread;

use auth_core::{
    update, Effect, LoginFlow, Msg, NavAction, NavEvent, NavigationWatcher, SessionState,
    LOGIN_URL,
};
use auth_logging::{auth_debug, auth_error, auth_info, auth_warn, redact};
use tokio::runtime::Runtime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::AuthConfig;
use crate::scrape::{HeuristicTokenScraper, PageSnapshot, TokenScraper};
use crate::secret::{FileSecretStore, SecretStore, API_KEY_SECRET};
use crate::verify::{ReqwestVerifier, TokenVerifier};

/// Instruction for the browser adapter, polled with
/// [`AuthSession::try_recv_browser_command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserCommand {
    /// Load `url`. With `clear_session`, drop cookies, cache and history first.
    OpenLogin { url: String, clear_session: bool },
}

enum Command {
    Start,
    Dispatch(Msg),
    ScrapePage(PageSnapshot),
    ScrapeHtml(String),
}

/// Handle to one login flow.
///
/// Navigation decisions are made on the caller's thread. Scraping, verification
/// and secret store access run on a worker thread that owns the session state
/// and publishes every change to all receivers from [`AuthSession::subscribe`].
pub struct AuthSession {
    cmd_tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<SessionState>,
    browser_rx: mpsc::Receiver<BrowserCommand>,
    watcher: NavigationWatcher,
    cancel: CancellationToken,
}

impl AuthSession {
    pub fn new(verifier: Arc<dyn TokenVerifier>, store: Arc<dyn SecretStore>) -> Self {
        Self::with_scraper(verifier, store, Arc::new(HeuristicTokenScraper))
    }

    pub fn with_scraper(
        verifier: Arc<dyn TokenVerifier>,
        store: Arc<dyn SecretStore>,
        scraper: Arc<dyn TokenScraper>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (browser_tx, browser_rx) = mpsc::channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Loading);
        let cancel = CancellationToken::new();

        let worker = Worker {
            flow: LoginFlow::new(),
            verifier,
            store,
            scraper,
            state_tx,
            browser_tx,
            cmd_tx: cmd_tx.clone(),
            cancel: cancel.clone(),
            verification: None,
        };
        thread::spawn(move || worker.run(cmd_rx));

        Self {
            cmd_tx,
            state_rx,
            browser_rx,
            watcher: NavigationWatcher::new(),
            cancel,
        }
    }

    /// Production stack: HTTP verifier plus the file-backed secret store.
    pub fn from_config(config: AuthConfig) -> Self {
        let verifier = Arc::new(ReqwestVerifier::new(config.verifier));
        let store = Arc::new(FileSecretStore::new(config.secret_dir).with_clock(config.clock));
        Self::new(verifier, store)
    }

    /// Resumes from the cached token, or asks the browser to open the login page.
    pub fn start(&self) {
        self.send(Command::Start);
    }

    /// Classifies a browser navigation event. Cheap; call it on the UI thread.
    pub fn handle_navigation(&mut self, event: &NavEvent) -> NavAction {
        let action = self.watcher.observe(event);
        if action != NavAction::None {
            auth_debug!("{:?} {} -> {:?}", event.kind, event.url, action);
        }
        action
    }

    /// Scrapes a page snapshot on the worker and verifies what it finds.
    pub fn submit_page(&self, snapshot: PageSnapshot) {
        self.send(Command::ScrapePage(snapshot));
    }

    /// Like [`Self::submit_page`], parsing the serialized DOM on the worker.
    pub fn submit_html(&self, html: impl Into<String>) {
        self.send(Command::ScrapeHtml(html.into()));
    }

    /// Hands over the raw return value of the injected extraction script.
    pub fn submit_candidate(&self, raw: Option<String>) {
        self.send(Command::Dispatch(Msg::TokenExtracted(raw)));
    }

    pub fn retry(&self) {
        self.send(Command::Dispatch(Msg::RetryClicked));
    }

    pub fn logout(&self) {
        self.send(Command::Dispatch(Msg::LogoutRequested));
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    pub fn try_recv_browser_command(&mut self) -> Option<BrowserCommand> {
        let command = self.browser_rx.try_recv().ok()?;
        let BrowserCommand::OpenLogin { clear_session, .. } = &command;
        if *clear_session {
            self.watcher.reset();
        }
        Some(command)
    }

    /// Abandons in-flight work. Nothing is written to the secret store afterwards.
    pub fn shutdown(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.send(Command::Dispatch(Msg::TornDown));
    }

    fn send(&self, command: Command) {
        if self.cmd_tx.send(command).is_err() {
            auth_warn!("Auth worker is gone; command dropped");
        }
    }
}

impl Drop for AuthSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    flow: LoginFlow,
    verifier: Arc<dyn TokenVerifier>,
    store: Arc<dyn SecretStore>,
    scraper: Arc<dyn TokenScraper>,
    state_tx: watch::Sender<SessionState>,
    browser_tx: mpsc::Sender<BrowserCommand>,
    cmd_tx: mpsc::Sender<Command>,
    cancel: CancellationToken,
    /// The verification call of the current attempt, if one was started.
    verification: Option<(CancellationToken, JoinHandle<()>)>,
}

impl Worker {
    fn run(mut self, cmd_rx: mpsc::Receiver<Command>) {
        let runtime = match Runtime::new() {
            Ok(runtime) => runtime,
            Err(err) => {
                auth_error!("Could not start auth worker runtime: {}", err);
                self.state_tx
                    .send_replace(SessionState::Error(format!("Failed to start: {err}")));
                return;
            }
        };

        while let Ok(command) = cmd_rx.recv() {
            self.handle(command, &runtime);
            if self.flow.is_torn_down() {
                auth_debug!("Auth session torn down");
                break;
            }
        }
    }

    fn handle(&mut self, command: Command, runtime: &Runtime) {
        match command {
            Command::Start => {
                let cached_token = match self.store.get(API_KEY_SECRET) {
                    Ok(token) => token,
                    Err(err) => {
                        auth_warn!("Could not read cached token, logging in again: {}", err);
                        None
                    }
                };
                self.dispatch(Msg::Resumed { cached_token }, runtime);
            }
            Command::Dispatch(msg) => self.dispatch(msg, runtime),
            Command::ScrapePage(snapshot) => {
                let token = self.scraper.scrape(&snapshot);
                self.dispatch(Msg::TokenExtracted(token), runtime);
            }
            Command::ScrapeHtml(html) => {
                let token = self.scraper.scrape_html(&html);
                self.dispatch(Msg::TokenExtracted(token), runtime);
            }
        }
    }

    fn dispatch(&mut self, msg: Msg, runtime: &Runtime) {
        let flow = std::mem::take(&mut self.flow);
        let (flow, effects) = update(flow, msg);
        self.flow = flow;

        // Effects first: subscribers may rely on the store once they see the new state.
        for effect in effects {
            self.run_effect(effect, runtime);
        }
        if self.flow.consume_dirty() {
            auth_info!("Login state: {:?}", self.flow.session());
            self.state_tx.send_replace(self.flow.session().clone());
        }
    }

    fn run_effect(&mut self, effect: Effect, runtime: &Runtime) {
        match effect {
            Effect::OpenLogin { clear_session } => {
                let _ = self.browser_tx.send(BrowserCommand::OpenLogin {
                    url: LOGIN_URL.to_string(),
                    clear_session,
                });
            }
            Effect::VerifyToken { attempt, token } => {
                auth_debug!("Verifying {} for attempt {}", redact(&token), attempt);
                let verifier = self.verifier.clone();
                let cmd_tx = self.cmd_tx.clone();
                // Child of the session token: teardown cancels it too.
                let cancel = self.cancel.child_token();
                let task = runtime.spawn({
                    let cancel = cancel.clone();
                    async move {
                        tokio::select! {
                            _ = cancel.cancelled() => {
                                auth_debug!("Verification for attempt {} abandoned", attempt);
                            }
                            result = verifier.verify(&token) => {
                                let msg = Msg::VerificationFinished { attempt, result };
                                let _ = cmd_tx.send(Command::Dispatch(msg));
                            }
                        }
                    }
                });
                self.verification = Some((cancel, task));
            }
            Effect::AbandonVerification => {
                if let Some((cancel, task)) = self.verification.take() {
                    cancel.cancel();
                    // Wait for the call to be dropped so the next one never overlaps it.
                    if let Err(err) = runtime.block_on(task) {
                        auth_warn!("Abandoned verification task failed: {}", err);
                    }
                }
            }
            Effect::StoreToken { attempt, token } => {
                // Teardown may already be queued behind us.
                if self.cancel.is_cancelled() {
                    return;
                }
                let result = self
                    .store
                    .put(API_KEY_SECRET, &token)
                    .map_err(|err| err.to_string());
                if let Err(message) = &result {
                    auth_error!("Failed to cache token: {}", message);
                }
                self.dispatch(Msg::TokenStored { attempt, result }, runtime);
            }
            Effect::ClearStoredToken { attempt } => {
                let result = self
                    .store
                    .remove(API_KEY_SECRET)
                    .map_err(|err| err.to_string());
                if let Err(message) = &result {
                    auth_error!("Failed to clear cached token: {}", message);
                }
                self.dispatch(Msg::TokenCleared { attempt, result }, runtime);
            }
        }
    }
}
