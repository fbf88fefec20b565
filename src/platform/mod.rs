//! Platform layer
//!
//! The host (a browser page, or the native runner) owns the clock, input
//! capture, drawing, audio and the real transport. It drives a [`Session`]
//! one frame at a time and reads back snapshots and events.

#[cfg(target_arch = "wasm32")]
pub mod web;

use crate::error::Result;
use crate::highscores::HighScores;
use crate::net::Multiplayer;
use crate::palette::Palette;
use crate::settings::Settings;
use crate::sim::{GameEvent, GameMode, GameState, HudSnapshot, RenderSnapshot, TickInput, tick};
use crate::tuning::Tuning;

/// One run plus the host-facing bookkeeping around it
pub struct Session {
    state: GameState,
    settings: Settings,
    palette: Palette,
    net: Option<Multiplayer>,
    high_scores: HighScores,
    /// Events produced since the host last asked
    pending: Vec<GameEvent>,
    /// Leaderboard rank earned by this run, once it has ended
    rank: Option<usize>,
    recorded: bool,
}

impl Session {
    /// Wave survival against the AI
    pub fn solo(seed: u64, tuning: Tuning, settings: Settings) -> Result<Self> {
        Self::build(seed, tuning, settings, None)
    }

    /// Shared arena; `net` is already connected to its room
    pub fn online(seed: u64, tuning: Tuning, settings: Settings, net: Multiplayer) -> Result<Self> {
        Self::build(seed, tuning, settings, Some(net))
    }

    fn build(
        seed: u64,
        tuning: Tuning,
        settings: Settings,
        net: Option<Multiplayer>,
    ) -> Result<Self> {
        tuning.validate()?;
        let palette = settings.palette()?;
        let mode = if net.is_some() {
            GameMode::Online
        } else {
            GameMode::Solo
        };
        let mut state = GameState::new(seed, tuning, mode, settings.map);
        let pending = state.drain_events();
        Ok(Self {
            state,
            settings,
            palette,
            net,
            high_scores: HighScores::load(),
            pending,
            rank: None,
            recorded: false,
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Direct access for hosts that script scenarios (tests, soak runs)
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn net(&self) -> Option<&Multiplayer> {
        self.net.as_ref()
    }

    pub fn high_scores(&self) -> &HighScores {
        &self.high_scores
    }

    /// Leaderboard rank of the finished run, if it placed
    pub fn rank(&self) -> Option<usize> {
        self.rank
    }

    /// Advance one frame
    pub fn step(&mut self, input: &TickInput) {
        tick(&mut self.state, input, self.net.as_mut());
        let events = self.state.drain_events();
        for event in &events {
            if let GameEvent::GameOver { score, wave } = *event {
                self.record_score(score, wave, input.now_ms);
            }
        }
        self.pending.extend(events);
    }

    /// Solo runs go on the local leaderboard once
    fn record_score(&mut self, score: u64, wave: u32, now_ms: f64) {
        if self.recorded || self.state.mode != GameMode::Solo {
            return;
        }
        self.recorded = true;
        let name = self.settings.display_name();
        self.rank = self.high_scores.add_score(&name, score, wave, now_ms);
        if self.rank.is_some() {
            self.high_scores.save();
        }
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn render_snapshot(&self) -> RenderSnapshot {
        let mut snapshot = RenderSnapshot::capture(&self.state, self.net.as_ref(), &self.palette);
        if !self.settings.particles {
            snapshot.particles.clear();
        }
        snapshot
    }

    pub fn hud(&self) -> HudSnapshot {
        HudSnapshot::capture(&self.state, self.net.as_ref())
    }

    /// Leave the room, if any (menu, page unload)
    pub fn end_session(&mut self) {
        if let Some(net) = self.net.as_mut() {
            net.end_session();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.end_session();
    }
}
