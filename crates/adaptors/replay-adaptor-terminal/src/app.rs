//! Search client state
//!
//! [`SearchApp`] owns the query text, the user's [`Settings`], the loading
//! flag and the mounted player. A search is split into [`SearchApp::begin_search`]
//! and [`SearchApp::finish_search`] around the backend call so that every
//! request carries a sequence number; a response for anything but the most
//! recent request is dropped without touching state.

use crate::backend::SearchBackend;
use crate::player::{MediaPlayer, PlayerState, SimulatedElement};
use crate::settings::{CredentialRule, Settings, SettingsStore};
use replay_core::{ReplayError, Result, SearchRequest, SearchResponse};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Video the player mounts
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSource {
    /// Source URL
    pub src: String,
    /// Length in seconds
    pub duration: f64,
}

/// A request ready to be sent
#[derive(Debug, Clone)]
pub struct PendingSearch {
    /// Sequence number issued by [`SearchApp::begin_search`]
    pub seq: u64,
    /// Body for the search endpoint
    pub request: SearchRequest,
}

/// What a submit led to
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Rejected locally; nothing was sent
    Blocked(String),
    /// Player mounted at the top possession
    Loaded(PlayerState),
    /// The search failed; the message is shown to the user
    Failed(String),
    /// A newer request was issued; the response was discarded
    Stale,
}

impl SearchOutcome {
    /// Alert text for blocked and failed searches
    pub fn alert(&self) -> Option<&str> {
        match self {
            SearchOutcome::Blocked(msg) | SearchOutcome::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Client application state
pub struct SearchApp {
    backend: Arc<dyn SearchBackend>,
    store: Arc<dyn SettingsStore>,
    rule: CredentialRule,
    video: VideoSource,
    settings: Settings,
    query: String,
    loading: bool,
    latest_seq: u64,
    player: Option<MediaPlayer<SimulatedElement>>,
}

impl SearchApp {
    /// Create the app with already-loaded settings
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        store: Arc<dyn SettingsStore>,
        settings: Settings,
        video: VideoSource,
    ) -> Self {
        Self {
            backend,
            store,
            rule: CredentialRule::default(),
            video,
            settings,
            query: String::new(),
            loading: false,
            latest_seq: 0,
            player: None,
        }
    }

    /// Replace the credential rule
    pub fn with_credential_rule(mut self, rule: CredentialRule) -> Self {
        self.rule = rule;
        self
    }

    /// Backend searches are sent to
    pub fn backend(&self) -> Arc<dyn SearchBackend> {
        self.backend.clone()
    }

    /// Current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Current query text
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Whether a search is in flight
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Mounted player, hidden while loading
    pub fn player(&self) -> Option<&MediaPlayer<SimulatedElement>> {
        if self.loading {
            None
        } else {
            self.player.as_ref()
        }
    }

    /// Mutable access to the mounted player
    pub fn player_mut(&mut self) -> Option<&mut MediaPlayer<SimulatedElement>> {
        if self.loading {
            None
        } else {
            self.player.as_mut()
        }
    }

    /// Whether the search input is offered at all
    pub fn can_search(&self) -> bool {
        self.rule.is_valid(&self.settings.api_key)
    }

    /// Update the query text
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Update the credential (not persisted until [`SearchApp::save_settings`])
    pub fn set_api_key(&mut self, key: impl Into<String>) {
        self.settings.api_key = key.into();
    }

    /// Update the match count (not persisted until [`SearchApp::save_settings`])
    pub fn set_match_count(&mut self, count: usize) -> Result<()> {
        if count == 0 {
            return Err(ReplayError::validation("Match count must be at least 1."));
        }
        self.settings.match_count = count;
        Ok(())
    }

    /// Persist the current settings
    pub fn save_settings(&self) -> Result<()> {
        self.settings.save(self.store.as_ref(), &self.rule)?;
        info!("Saved settings ({} matches)", self.settings.match_count);
        Ok(())
    }

    /// Forget saved settings and reset to defaults
    pub fn clear_settings(&mut self) -> Result<()> {
        self.settings.clear(self.store.as_ref())?;
        info!("Cleared saved settings");
        Ok(())
    }

    /// Validate local input and issue a sequence number
    ///
    /// On success the app is loading and any previous player is unmounted.
    pub fn begin_search(&mut self) -> Result<PendingSearch> {
        if self.settings.api_key.is_empty() {
            return Err(ReplayError::validation("Please enter an API key."));
        }
        if !self.can_search() {
            return Err(ReplayError::validation("Please enter a valid API key."));
        }
        if self.query.trim().is_empty() {
            return Err(ReplayError::validation("Please enter a query."));
        }

        self.latest_seq += 1;
        self.loading = true;
        self.player = None;

        Ok(PendingSearch {
            seq: self.latest_seq,
            request: SearchRequest {
                query: Some(self.query.clone()),
                api_key: Some(self.settings.api_key.clone()),
                matches: Some(self.settings.match_count),
            },
        })
    }

    /// Apply a backend response for request `seq`
    pub fn finish_search(&mut self, seq: u64, response: Result<SearchResponse>) -> SearchOutcome {
        if seq != self.latest_seq {
            debug!("Discarding response {} (latest is {})", seq, self.latest_seq);
            return SearchOutcome::Stale;
        }
        self.loading = false;

        let outcome = response.and_then(|body| {
            body.possessions
                .into_iter()
                .next()
                .ok_or(ReplayError::NoResults)
        });

        match outcome {
            Ok(top) => {
                let start = top.timestamp_start_of_possession_seconds;
                let player = MediaPlayer::mount(
                    SimulatedElement::new(self.video.duration),
                    self.video.src.clone(),
                    start,
                );
                let state = player.state().clone();
                self.player = Some(player);
                info!("Playing from {}s: {}", start, top.possession_details);
                SearchOutcome::Loaded(state)
            }
            Err(e) => {
                error!("Search failed: {}", e);
                SearchOutcome::Failed(alert_text(&e))
            }
        }
    }

    /// Run a complete search against the backend
    pub async fn submit(&mut self) -> SearchOutcome {
        let pending = match self.begin_search() {
            Ok(p) => p,
            Err(e) => return SearchOutcome::Blocked(alert_text(&e)),
        };
        let response = self.backend.search(&pending.request).await;
        self.finish_search(pending.seq, response)
    }

    /// Handle a key press in the query input; only Enter submits
    pub async fn on_key(&mut self, key: &str) -> Option<SearchOutcome> {
        if key == "Enter" {
            Some(self.submit().await)
        } else {
            None
        }
    }
}

/// Message shown to the user for a client-side error
pub fn alert_text(err: &ReplayError) -> String {
    match err {
        ReplayError::Validation(msg) => msg.clone(),
        ReplayError::Upstream { message, .. } => message.clone(),
        ReplayError::NoResults => err.to_string(),
        ReplayError::Network(e) => match e.status() {
            Some(status) => format!(
                "Error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )
            .trim_end()
            .to_string(),
            None => format!("Error: {}", e),
        },
        other => other.to_string(),
    }
}
