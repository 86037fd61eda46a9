use url::Url;

/// Origin of the learning service's web site.
pub const SITE_ORIGIN: &str = "https://www.wanikani.com/";
pub const LOGIN_URL: &str = "https://www.wanikani.com/login";
/// Path segment of the page that shows personal access tokens.
pub const TOKEN_SETTINGS_PATH: &str = "settings/personal_access_tokens";
pub const TOKEN_SETTINGS_URL: &str = "https://www.wanikani.com/settings/personal_access_tokens";

const LOGIN_MARKER: &str = "login";
/// Entries kept by [`NavigationWatcher`]; decisions only look one page back.
const HISTORY_WINDOW: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    LoginPage,
    AuthenticatedPage,
    TokenSettingsPage,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEventKind {
    /// The browser is about to load a URL and lets the host intercept it.
    WillNavigate,
    /// A page finished loading.
    DidFinishNavigating,
    /// A new entry was committed to the back/forward history.
    HistoryUpdated { is_reload: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEvent {
    pub url: String,
    pub kind: NavEventKind,
}

impl NavEvent {
    pub fn new(url: impl Into<String>, kind: NavEventKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavAction {
    None,
    /// Load this URL instead of continuing.
    ForceNavigate(String),
    /// Scrape the current page for a token. When `suppress_navigation` is set the
    /// browser must not proceed with the intercepted load until the scrape ran.
    TriggerScrape { suppress_navigation: bool },
}

pub fn is_token_settings_page(url: &str) -> bool {
    url.contains(TOKEN_SETTINGS_PATH)
}

/// True for pages on the service's own site that are neither the login form
/// nor the token settings page.
pub fn is_authenticated_page(url: &str) -> bool {
    is_site_origin(url) && !url.contains(LOGIN_MARKER) && !is_token_settings_page(url)
}

pub fn classify(url: &str) -> PageKind {
    if is_token_settings_page(url) {
        PageKind::TokenSettingsPage
    } else if is_authenticated_page(url) {
        PageKind::AuthenticatedPage
    } else if url.contains(LOGIN_MARKER) {
        PageKind::LoginPage
    } else {
        PageKind::Other
    }
}

fn is_site_origin(url: &str) -> bool {
    let (Ok(candidate), Ok(site)) = (Url::parse(url), Url::parse(SITE_ORIGIN)) else {
        return false;
    };
    candidate.origin() == site.origin()
}

/// Decides what the browser host should do for one navigation event.
///
/// `previous_url` is the history entry before the page the event refers to.
/// Without it, a login→authenticated transition cannot be confirmed and no
/// redirect happens.
pub fn decide(event: &NavEvent, previous_url: Option<&str>) -> NavAction {
    if let NavEventKind::HistoryUpdated { is_reload: true } = event.kind {
        return NavAction::None;
    }

    match classify(&event.url) {
        PageKind::AuthenticatedPage => {
            let came_from_login = previous_url.is_some_and(|prev| prev.contains(LOGIN_MARKER));
            if came_from_login {
                NavAction::ForceNavigate(TOKEN_SETTINGS_URL.to_string())
            } else {
                NavAction::None
            }
        }
        PageKind::TokenSettingsPage => match event.kind {
            NavEventKind::DidFinishNavigating => NavAction::TriggerScrape {
                suppress_navigation: false,
            },
            NavEventKind::WillNavigate => NavAction::TriggerScrape {
                suppress_navigation: true,
            },
            NavEventKind::HistoryUpdated { .. } => NavAction::None,
        },
        PageKind::LoginPage | PageKind::Other => NavAction::None,
    }
}

/// Tracks committed history so browser adapters only forward raw events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationWatcher {
    history: Vec<String>,
    /// Page that already triggered the redirect to the token settings page.
    redirected_from: Option<String>,
}

impl NavigationWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, event: &NavEvent) -> NavAction {
        let previous = match event.kind {
            // Leaving the current page: it becomes the previous entry.
            NavEventKind::WillNavigate => self.history.last().cloned(),
            NavEventKind::HistoryUpdated { is_reload } => {
                let previous = self.history.last().cloned();
                if !is_reload {
                    self.push(&event.url);
                }
                previous
            }
            NavEventKind::DidFinishNavigating => {
                if self.history.last().map(String::as_str) == Some(event.url.as_str()) {
                    self.history.iter().rev().nth(1).cloned()
                } else {
                    let previous = self.history.last().cloned();
                    self.push(&event.url);
                    previous
                }
            }
        };
        match decide(event, previous.as_deref()) {
            // A page reports both a history update and a finished load; redirect once.
            NavAction::ForceNavigate(_)
                if self.redirected_from.as_deref() == Some(event.url.as_str()) =>
            {
                NavAction::None
            }
            NavAction::ForceNavigate(target) => {
                self.redirected_from = Some(event.url.clone());
                NavAction::ForceNavigate(target)
            }
            action => action,
        }
    }

    fn push(&mut self, url: &str) {
        self.history.push(url.to_string());
        if self.history.len() > HISTORY_WINDOW {
            let excess = self.history.len() - HISTORY_WINDOW;
            self.history.drain(..excess);
        }
    }

    /// Forget all history, e.g. after the browser session was cleared.
    pub fn reset(&mut self) {
        self.history.clear();
        self.redirected_from = None;
    }

    /// The most recent committed entries, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }
}
