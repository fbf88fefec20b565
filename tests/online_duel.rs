//! Two games sharing one in-process room

use glam::Vec2;
use steel_dash::net::{MemoryRoom, Multiplayer};
use steel_dash::consts::BULLET_LIFE_TICKS;
use steel_dash::platform::Session;
use steel_dash::sim::{Aim, GameEvent, GamePhase, TickInput};
use steel_dash::tuning::NetTuning;
use steel_dash::{Settings, Tuning};

const FRAME_MS: f64 = 1000.0 / 60.0;

/// Open arena: no obstacles, no early pickups
fn arena() -> Tuning {
    let mut tuning = Tuning::default();
    tuning.maps.city.count = 0;
    tuning.pickups.first_spawn_ticks = 100_000;
    tuning
}

fn seat(room: &MemoryRoom, id: &str, net: NetTuning, pos: Vec2) -> Session {
    let (channel, inbox) = room.join(id).unwrap();
    let multiplayer = Multiplayer::connect(id, id.to_uppercase(), Box::new(channel), inbox, net);
    let settings = Settings {
        name: id.to_uppercase(),
        ..Settings::default()
    };
    let mut session = Session::online(9, arena(), settings, multiplayer).unwrap();
    let state = session.state_mut();
    state.player.tank.pos = pos;
    state.player.timers.invulnerable = 0;
    session
}

struct Duel {
    room: MemoryRoom,
    a: Session,
    b: Session,
    frame: u64,
    a_events: Vec<GameEvent>,
    b_events: Vec<GameEvent>,
}

impl Duel {
    fn new(b_net: NetTuning) -> Self {
        let room = MemoryRoom::new();
        let a = seat(&room, "a", NetTuning::default(), Vec2::new(100.0, 300.0));
        let b = seat(&room, "b", b_net, Vec2::new(400.0, 300.0));
        Self {
            room,
            a,
            b,
            frame: 0,
            a_events: Vec::new(),
            b_events: Vec::new(),
        }
    }

    fn now(&self) -> f64 {
        self.frame as f64 * FRAME_MS
    }

    /// One frame for each side, A first
    fn round(&mut self, a_input: TickInput) {
        let now = self.now();
        self.a.step(&TickInput { now_ms: now, ..a_input });
        self.b.step(&TickInput {
            now_ms: now,
            ..Default::default()
        });
        self.a_events.extend(self.a.take_events());
        self.b_events.extend(self.b.take_events());
        self.frame += 1;
    }

    fn idle(&mut self, rounds: usize) {
        for _ in 0..rounds {
            self.round(TickInput::default());
        }
    }

    /// A shoots straight along +x
    fn a_fires(&mut self) {
        let from = self.a.state().player.tank.center();
        self.round(TickInput {
            aim: Aim::Pointer {
                x: from.x + 100.0,
                y: from.y,
            },
            fire: true,
            ..Default::default()
        });
    }
}

#[test]
fn presence_is_exchanged() {
    let mut duel = Duel::new(NetTuning::default());
    duel.idle(3);

    assert_eq!(duel.a.net().unwrap().remote_count(), 1);
    assert_eq!(duel.b.net().unwrap().remote_count(), 1);
    assert_eq!(duel.room.presence().unwrap().len(), 2);

    let seen_by_a = duel.a.net().unwrap().remote("b").unwrap();
    assert_eq!(seen_by_a.name, "B");
    assert_eq!(seen_by_a.target, Vec2::new(400.0, 300.0));
    assert_eq!(duel.a.render_snapshot().remotes.len(), 1);
    assert_eq!(duel.a.hud().opponents, 1);
    assert!(duel
        .a_events
        .contains(&GameEvent::RemoteJoined {
            id: "b".into(),
            name: "B".into()
        }));
}

#[test]
fn shot_damages_standing_victim() {
    let mut duel = Duel::new(NetTuning::default());
    duel.idle(3);

    duel.a_fires();
    assert_eq!(duel.room.shot_count().unwrap(), 1);
    let copies: Vec<_> = duel
        .b
        .state()
        .bullets
        .iter()
        .filter(|b| b.net_id.is_some())
        .collect();
    assert_eq!(copies.len(), 1);
    assert!((copies[0].vel.x - 5.0).abs() < 1e-4);

    for _ in 0..120 {
        if duel.b.state().player.tank.health < 100.0 {
            break;
        }
        duel.idle(1);
    }
    assert_eq!(duel.room.hits().unwrap(), vec![("b".to_string(), 20.0)]);
    assert_eq!(duel.b.state().player.tank.health, 80.0);
    assert!(duel.b.state().bullets.is_empty());
    assert!(duel.a.state().bullets.is_empty());
    assert!(duel
        .b_events
        .contains(&GameEvent::PlayerHit { amount: 20.0 }));

    // The record outlives A's bullet, then is withdrawn once its life is up
    assert_eq!(duel.room.shot_count().unwrap(), 1);
    duel.idle(BULLET_LIFE_TICKS as usize);
    assert_eq!(duel.room.shot_count().unwrap(), 0);
}

#[test]
fn repeated_hits_spend_victim_lives() {
    let mut duel = Duel::new(NetTuning::default());
    duel.idle(3);

    for _ in 0..5 {
        duel.a_fires();
        duel.idle(40);
    }
    duel.idle(60);
    assert_eq!(duel.room.hits().unwrap().len(), 5);
    let victim = &duel.b.state().player;
    assert_eq!(victim.lives, duel.b.state().tuning.player.starting_lives - 1);
    assert!(duel
        .b_events
        .iter()
        .any(|e| matches!(e, GameEvent::LifeLost { .. })));
}

#[test]
fn victim_is_eliminated_and_killer_credited() {
    // B only ever publishes its first position
    let frozen = NetTuning {
        publish_interval_ms: 1.0e12,
        ..NetTuning::default()
    };
    let mut duel = Duel::new(frozen);
    duel.idle(3);

    {
        let state = duel.b.state_mut();
        state.player.tank.pos = Vec2::new(250.0, 300.0);
        state.player.tank.health = 20.0;
        state.player.lives = 0;
    }
    duel.a_fires();

    for _ in 0..60 {
        if duel.b.state().phase == GamePhase::GameOver {
            break;
        }
        duel.idle(1);
    }
    assert_eq!(duel.b.state().phase, GamePhase::GameOver);
    assert!(duel
        .b_events
        .contains(&GameEvent::Eliminated { by: Some("a".into()) }));

    let presence = duel.room.presence().unwrap();
    assert!(!presence.contains_key("b"));
    assert_eq!(presence["a"].kills, Some(1));

    duel.idle(2);
    assert_eq!(duel.a.net().unwrap().remote_count(), 0);
    assert_eq!(duel.a.net().unwrap().kills(), 1);
    assert!(duel.a_events.contains(&GameEvent::RemoteLeft { id: "b".into() }));
    assert!(duel.a_events.contains(&GameEvent::RoomCleared));
    assert!(duel.room.hits().unwrap().is_empty());
}

#[test]
fn disconnect_cleans_up_presence() {
    let mut duel = Duel::new(NetTuning::default());
    duel.idle(3);

    duel.room.disconnect("b").unwrap();
    assert!(!duel.room.presence().unwrap().contains_key("b"));

    duel.idle(2);
    assert_eq!(duel.a.net().unwrap().remote_count(), 0);
    assert!(duel.a_events.contains(&GameEvent::RoomCleared));
    // B lost its feed but keeps simulating
    assert_eq!(duel.b.state().phase, GamePhase::Playing);
}
