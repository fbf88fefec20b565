//! Browser bridge
//!
//! JS owns the page: menus, input capture, the canvas, audio and the realtime
//! database. Each animation frame it calls [`WebGame::tick`] with the frame's
//! input, then reads snapshots back as JSON. In online play it forwards room
//! callbacks through `push_inbound` and carries out whatever `take_outbound`
//! returns.

use wasm_bindgen::prelude::*;

use super::Session;
use crate::highscores::HighScores;
use crate::net::{InboundEvent, InboxSender, Multiplayer, QueuedChannel, inbox, new_participant_id};
use crate::settings::Settings;
use crate::sim::TickInput;
use crate::tuning::Tuning;

fn js_err(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(js_err)
}

fn tuning_from(json: Option<String>) -> Result<Tuning, JsValue> {
    match json {
        Some(json) => Tuning::from_json(&json).map_err(js_err),
        None => Ok(Tuning::default()),
    }
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"Logger already initialised".into());
    }
    log::info!("Steel Dash core loaded");
}

/// A running game as seen from JS
#[wasm_bindgen]
pub struct WebGame {
    session: Session,
    outbox: Option<QueuedChannel>,
    inbound: Option<InboxSender>,
}

#[wasm_bindgen]
impl WebGame {
    /// Solo wave survival with the stored settings
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64, tuning_json: Option<String>) -> Result<WebGame, JsValue> {
        let tuning = tuning_from(tuning_json)?;
        let session = Session::solo(seed, tuning, Settings::load()).map_err(js_err)?;
        Ok(Self {
            session,
            outbox: None,
            inbound: None,
        })
    }

    /// Join the shared arena; a fresh participant id is minted when none is given
    pub fn online(
        seed: u64,
        tuning_json: Option<String>,
        local_id: Option<String>,
    ) -> Result<WebGame, JsValue> {
        let tuning = tuning_from(tuning_json)?;
        let settings = Settings::load();
        let outbox = QueuedChannel::new();
        let (tx, rx) = inbox();
        let net = Multiplayer::connect(
            local_id.unwrap_or_else(new_participant_id),
            settings.display_name(),
            Box::new(outbox.clone()),
            rx,
            tuning.net.clone(),
        );
        let session = Session::online(seed, tuning, settings, net).map_err(js_err)?;
        Ok(Self {
            session,
            outbox: Some(outbox),
            inbound: Some(tx),
        })
    }

    #[wasm_bindgen(getter)]
    pub fn local_id(&self) -> Option<String> {
        self.session.net().map(|n| n.local_id().to_string())
    }

    /// Advance one frame; `input_json` is a serialised `TickInput`. A missing
    /// `now_ms` is filled from the browser clock.
    pub fn tick(&mut self, input_json: &str) -> Result<(), JsValue> {
        let mut input: TickInput = serde_json::from_str(input_json).map_err(js_err)?;
        if input.now_ms <= 0.0 {
            input.now_ms = js_sys::Date::now();
        }
        self.session.step(&input);
        Ok(())
    }

    pub fn render_snapshot(&self) -> Result<String, JsValue> {
        to_json(&self.session.render_snapshot())
    }

    pub fn hud(&self) -> Result<String, JsValue> {
        to_json(&self.session.hud())
    }

    /// Events since the last call, for audio and HUD flashes
    pub fn take_events(&mut self) -> Result<String, JsValue> {
        to_json(&self.session.take_events())
    }

    /// Room writes queued since the last call
    pub fn take_outbound(&self) -> Result<String, JsValue> {
        let ops = self.outbox.as_ref().map(|o| o.take()).unwrap_or_default();
        to_json(&ops)
    }

    /// Forward a room callback (presence value, shot child added/removed)
    pub fn push_inbound(&self, event_json: &str) -> Result<(), JsValue> {
        let Some(tx) = self.inbound.as_ref() else {
            return Err(js_err("not in an online game"));
        };
        let event = InboundEvent::from_json(event_json).map_err(js_err)?;
        tx.send(event).map_err(js_err)
    }

    /// Leaderboard rank of the finished run, if it placed
    pub fn rank(&self) -> Option<u32> {
        self.session.rank().map(|r| r as u32)
    }

    pub fn end_session(&mut self) {
        self.session.end_session();
    }
}

#[wasm_bindgen]
pub fn high_scores() -> Result<String, JsValue> {
    to_json(&HighScores::load())
}

#[wasm_bindgen]
pub fn settings() -> Result<String, JsValue> {
    to_json(&Settings::load())
}

/// Validate and persist settings from the customise panel
#[wasm_bindgen]
pub fn save_settings(json: &str) -> Result<(), JsValue> {
    let settings: Settings = serde_json::from_str(json).map_err(js_err)?;
    settings.palette().map_err(js_err)?;
    settings.save();
    Ok(())
}
