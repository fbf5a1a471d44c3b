//! Line-oriented terminal front end
//!
//! Plain text is a query and Enter submits it. Lines starting with `:` are
//! commands for settings and the player.

use crate::app::{alert_text, SearchApp, SearchOutcome};
use crate::player::{format_time, SKIP_SECONDS};
use replay_core::Result;
use std::io::Write;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

const HELP: &str = "\
Type a query and press Enter to search.
  :key <key>       set the API key
  :matches <n>     set the number of matches
  :save            save key and match count
  :clear           forget saved settings
  :play / :pause   control playback
  :fwd / :back     skip 15 seconds
  :seek <secs>     jump to a position
  :status          show player state
  :quit            exit";

/// A parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Run a search
    Search(String),
    /// Set the credential
    SetKey(String),
    /// Set the match count
    SetMatches(usize),
    /// Persist settings
    Save,
    /// Forget settings
    Clear,
    /// Start playback
    Play,
    /// Pause playback
    Pause,
    /// Skip forward
    Forward,
    /// Skip backward
    Back,
    /// Seek to an absolute position
    Seek(f64),
    /// Print player state
    Status,
    /// Print usage
    Help,
    /// Exit the loop
    Quit,
    /// Blank line; submits an empty query once search is enabled
    Empty,
    /// Anything unrecognised, with a message
    Invalid(String),
}

impl Command {
    /// Parse one input line
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        let Some(rest) = line.strip_prefix(':') else {
            return Command::Search(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        match name {
            "key" => Command::SetKey(arg.to_string()),
            "matches" => match arg.parse::<usize>() {
                Ok(n) => Command::SetMatches(n),
                Err(_) => Command::Invalid(format!("Not a match count: {:?}", arg)),
            },
            "save" => Command::Save,
            "clear" => Command::Clear,
            "play" => Command::Play,
            "pause" => Command::Pause,
            "fwd" => Command::Forward,
            "back" => Command::Back,
            "seek" => match arg.parse::<f64>() {
                Ok(secs) if secs.is_finite() => Command::Seek(secs),
                _ => Command::Invalid(format!("Not a position: {:?}", arg)),
            },
            "status" => Command::Status,
            "help" => Command::Help,
            "quit" | "q" => Command::Quit,
            other => Command::Invalid(format!("Unknown command :{}", other)),
        }
    }
}

/// Terminal client driving a [`SearchApp`]
pub struct TerminalClient<W: Write> {
    app: SearchApp,
    out: W,
}

impl<W: Write> TerminalClient<W> {
    /// Create a client writing to `out`
    pub fn new(app: SearchApp, out: W) -> Self {
        Self { app, out }
    }

    /// Application state
    pub fn app(&self) -> &SearchApp {
        &self.app
    }

    /// Output sink
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Let wall-clock playback time pass
    pub fn elapse(&mut self, seconds: f64) {
        if let Some(player) = self.app.player_mut() {
            player.advance(seconds);
        }
    }

    /// Apply one command; returns false when the loop should stop
    pub async fn handle(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Empty if self.app.can_search() => self.search(String::new()).await?,
            Command::Empty => {}
            Command::Quit => return Ok(false),
            Command::Help => writeln!(self.out, "{}", HELP)?,
            Command::Invalid(msg) => writeln!(self.out, "{}", msg)?,
            Command::Search(text) => self.search(text).await?,
            Command::SetKey(key) => {
                self.app.set_api_key(key);
                if self.app.can_search() {
                    writeln!(self.out, "API key set.")?;
                } else {
                    writeln!(self.out, "API key set; search stays disabled until it is valid.")?;
                }
            }
            Command::SetMatches(n) => match self.app.set_match_count(n) {
                Ok(()) => writeln!(self.out, "Matches: {}", n)?,
                Err(e) => writeln!(self.out, "! {}", alert_text(&e))?,
            },
            Command::Save => match self.app.save_settings() {
                Ok(()) => writeln!(self.out, "Settings saved.")?,
                Err(e) => writeln!(self.out, "! {}", alert_text(&e))?,
            },
            Command::Clear => match self.app.clear_settings() {
                Ok(()) => writeln!(self.out, "Settings cleared.")?,
                Err(e) => writeln!(self.out, "! {}", alert_text(&e))?,
            },
            Command::Play => self.with_player(|p| p.play())?,
            Command::Pause => self.with_player(|p| p.pause())?,
            Command::Forward => self.with_player(|p| p.skip_forward())?,
            Command::Back => self.with_player(|p| p.skip_backward())?,
            Command::Seek(secs) => self.with_player(|p| p.scrub(secs))?,
            Command::Status => self.with_player(|_| {})?,
        }
        self.out.flush()?;
        Ok(true)
    }

    async fn search(&mut self, text: String) -> Result<()> {
        self.app.set_query(text);
        let pending = match self.app.begin_search() {
            Ok(p) => p,
            Err(e) => {
                writeln!(self.out, "! {}", alert_text(&e))?;
                return Ok(());
            }
        };

        writeln!(self.out, "Searching...")?;
        self.out.flush()?;

        let response = self.app.backend().search(&pending.request).await;
        match self.app.finish_search(pending.seq, response) {
            SearchOutcome::Loaded(state) => {
                writeln!(self.out, "Player: {}", state.src)?;
                writeln!(self.out, "{}", state)?;
            }
            SearchOutcome::Blocked(msg) | SearchOutcome::Failed(msg) => {
                writeln!(self.out, "! {}", msg)?
            }
            SearchOutcome::Stale => debug!("Dropped stale search response"),
        }
        Ok(())
    }

    fn with_player<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut crate::player::MediaPlayer<crate::player::SimulatedElement>),
    {
        match self.app.player_mut() {
            Some(player) => {
                f(player);
                let state = player.state().clone();
                writeln!(self.out, "{}", state)?;
            }
            None => writeln!(self.out, "No possession loaded. Search first.")?,
        }
        Ok(())
    }

    /// Read lines from `input` until EOF or `:quit`
    pub async fn run<R>(mut self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        writeln!(
            self.out,
            "Replay: search the final and jump to the moment. :help for commands, skips are {}s.",
            SKIP_SECONDS
        )?;
        if !self.app.can_search() {
            writeln!(self.out, "Set a valid API key with :key to enable search.")?;
        }
        self.out.flush()?;

        let mut lines = input.lines();
        let mut last = Instant::now();
        while let Some(line) = lines.next_line().await? {
            let now = Instant::now();
            self.elapse(now.duration_since(last).as_secs_f64());
            last = now;

            if !self.handle(Command::parse(&line)).await? {
                break;
            }
            last = Instant::now();
        }

        if let Some(player) = self.app.player() {
            debug!(
                "Exiting at {}",
                format_time(player.state().current_time)
            );
        }
        Ok(())
    }
}
