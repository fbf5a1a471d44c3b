//! Possession player
//!
//! [`MediaPlayer`] issues commands straight to a [`MediaElement`] and keeps a
//! [`PlayerState`] that mirrors the element's play, pause and time-update
//! events. It has no buffering or state machine of its own. Clamping seeks to
//! `[0, duration]` is the element's job.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds moved by the skip controls
pub const SKIP_SECONDS: f64 = 15.0;

/// Event emitted by a media element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    /// Playback started
    Play,
    /// Playback paused or reached the end
    Pause,
    /// Current time changed
    TimeUpdate,
}

/// A playable media element
pub trait MediaElement: Send {
    /// Start playback
    fn play(&mut self);

    /// Pause playback
    fn pause(&mut self);

    /// Current playback position in seconds
    fn current_time(&self) -> f64;

    /// Seek; the element clamps to `[0, duration]`
    fn set_current_time(&mut self, seconds: f64);

    /// Total length in seconds
    fn duration(&self) -> f64;

    /// Events raised since the last call
    fn drain_events(&mut self) -> Vec<MediaEvent>;
}

/// In-process element with a manual clock
#[derive(Debug, Clone)]
pub struct SimulatedElement {
    duration: f64,
    current_time: f64,
    paused: bool,
    events: Vec<MediaEvent>,
}

impl SimulatedElement {
    /// Paused element positioned at zero
    pub fn new(duration: f64) -> Self {
        Self {
            duration: duration.max(0.0),
            current_time: 0.0,
            paused: true,
            events: Vec::new(),
        }
    }

    /// Whether playback is paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Advance the clock by `dt` seconds while playing
    ///
    /// Reaching the end pauses the element.
    pub fn tick(&mut self, dt: f64) {
        if self.paused || dt <= 0.0 {
            return;
        }
        self.current_time = (self.current_time + dt).min(self.duration);
        self.events.push(MediaEvent::TimeUpdate);
        if self.current_time >= self.duration {
            self.paused = true;
            self.events.push(MediaEvent::Pause);
        }
    }
}

impl MediaElement for SimulatedElement {
    fn play(&mut self) {
        if self.paused {
            self.paused = false;
            self.events.push(MediaEvent::Play);
        }
    }

    fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            self.events.push(MediaEvent::Pause);
        }
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn set_current_time(&mut self, seconds: f64) {
        let clamped = if seconds.is_nan() {
            0.0
        } else {
            seconds.clamp(0.0, self.duration)
        };
        self.current_time = clamped;
        self.events.push(MediaEvent::TimeUpdate);
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn drain_events(&mut self) -> Vec<MediaEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Observable playback state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Video source URL
    pub src: String,
    /// Playback position in seconds
    pub current_time: f64,
    /// Total length in seconds
    pub duration: f64,
    /// Whether the element is playing
    pub is_playing: bool,
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} / {}",
            if self.is_playing { "▶" } else { "⏸" },
            format_time(self.current_time),
            format_time(self.duration)
        )
    }
}

/// Player bound to one element and one start time
pub struct MediaPlayer<E: MediaElement> {
    element: E,
    state: PlayerState,
}

impl<E: MediaElement> MediaPlayer<E> {
    /// Mount the player and seek to `start_time`
    pub fn mount(mut element: E, src: impl Into<String>, start_time: f64) -> Self {
        element.set_current_time(start_time);
        let mut player = Self {
            state: PlayerState {
                src: src.into(),
                current_time: start_time,
                duration: element.duration(),
                is_playing: false,
            },
            element,
        };
        player.sync();
        player
    }

    /// Current state
    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    /// Underlying element
    pub fn element(&self) -> &E {
        &self.element
    }

    /// Start playback
    pub fn play(&mut self) {
        self.state.is_playing = true;
        self.element.play();
        self.sync();
    }

    /// Pause playback
    pub fn pause(&mut self) {
        self.state.is_playing = false;
        self.element.pause();
        self.sync();
    }

    /// Play if paused, pause if playing
    pub fn toggle(&mut self) {
        if self.state.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Jump forward by [`SKIP_SECONDS`]
    pub fn skip_forward(&mut self) {
        let target = self.element.current_time() + SKIP_SECONDS;
        self.element.set_current_time(target);
        self.sync();
    }

    /// Jump back by [`SKIP_SECONDS`]
    pub fn skip_backward(&mut self) {
        let target = self.element.current_time() - SKIP_SECONDS;
        self.element.set_current_time(target);
        self.sync();
    }

    /// Seek to an absolute position
    pub fn scrub(&mut self, seconds: f64) {
        self.element.set_current_time(seconds);
        self.sync();
    }

    /// Mirror pending element events into the state
    pub fn sync(&mut self) {
        for event in self.element.drain_events() {
            match event {
                MediaEvent::Play => self.state.is_playing = true,
                MediaEvent::Pause => self.state.is_playing = false,
                MediaEvent::TimeUpdate => {
                    self.state.current_time = self.element.current_time();
                    self.state.duration = self.element.duration();
                }
            }
        }
    }
}

impl MediaPlayer<SimulatedElement> {
    /// Let `dt` seconds of playback elapse
    pub fn advance(&mut self, dt: f64) {
        self.element.tick(dt);
        self.sync();
    }
}

/// Render seconds as `m:ss`
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}
