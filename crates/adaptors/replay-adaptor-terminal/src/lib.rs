//! Terminal search client for Replay
//!
//! Sends queries to the search endpoint, mounts a player at the top
//! possession and persists the user's API key and match count through a
//! [`SettingsStore`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod app;
pub mod backend;
pub mod player;
pub mod settings;
pub mod terminal;

pub use app::{alert_text, PendingSearch, SearchApp, SearchOutcome, VideoSource};
pub use backend::{HttpSearchBackend, SearchBackend};
pub use player::{
    format_time, MediaElement, MediaEvent, MediaPlayer, PlayerState, SimulatedElement,
    SKIP_SECONDS,
};
pub use settings::{
    CredentialRule, FileStore, MemoryStore, Settings, SettingsStore, DEFAULT_CREDENTIAL_LENGTH,
    KEY_API_KEY, KEY_MATCH_COUNT,
};
pub use terminal::{Command, TerminalClient};
