//! Multiplayer reconciliation
//!
//! Each client simulates its own tank authoritatively and sees everyone else
//! through presence records. Per remote id the lifecycle is
//! unseen → tracked → evicted (stale or gone from the set). Writes are
//! best-effort: a failed send is logged and forgotten, and the local game
//! carries on as if alone.

use std::collections::{BTreeMap, HashMap, HashSet};

use glam::Vec2;

use super::channel::{ChannelOp, Inbox, InboundEvent, RoomChannel};
use super::presence::{PresenceRecord, RemotePlayer, ShotRecord};
use crate::error::Result;
use crate::sim::rect::Rect;
use crate::sim::state::{Bullet, BulletOwner, GameEvent, GamePhase, GameState};
use crate::tuning::NetTuning;

/// The local participant's view of a shared room
pub struct Multiplayer {
    local_id: String,
    name: String,
    channel: Box<dyn RoomChannel>,
    inbox: Inbox,
    tuning: NetTuning,
    /// Sorted so iteration (drawing, hit tests) is stable
    remotes: BTreeMap<String, RemotePlayer>,
    seen_shots: HashSet<String>,
    /// Our shots that hit a remote locally, with ticks left before withdrawal
    landed_shots: Vec<(String, u32)>,
    battle_started: bool,
    room_cleared: bool,
    last_publish_ms: Option<f64>,
    kills: u32,
    active: bool,
}

impl std::fmt::Debug for Multiplayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multiplayer")
            .field("local_id", &self.local_id)
            .field("remotes", &self.remotes.len())
            .field("battle_started", &self.battle_started)
            .field("active", &self.active)
            .finish()
    }
}

/// Fresh participant id
pub fn new_participant_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl Multiplayer {
    /// Join a room and register disconnect cleanup for our presence entry
    pub fn connect(
        local_id: impl Into<String>,
        name: impl Into<String>,
        channel: Box<dyn RoomChannel>,
        inbox: Inbox,
        tuning: NetTuning,
    ) -> Self {
        let mut net = Self {
            local_id: local_id.into(),
            name: name.into(),
            channel,
            inbox,
            tuning,
            remotes: BTreeMap::new(),
            seen_shots: HashSet::new(),
            landed_shots: Vec::new(),
            battle_started: false,
            room_cleared: false,
            last_publish_ms: None,
            kills: 0,
            active: true,
        };
        let id = net.local_id.clone();
        net.send(ChannelOp::RegisterDisconnectCleanup { id });
        log::info!("Joined room as {} ({})", net.name, net.local_id);
        net
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn remotes(&self) -> impl Iterator<Item = &RemotePlayer> {
        self.remotes.values()
    }

    pub fn remote(&self, id: &str) -> Option<&RemotePlayer> {
        self.remotes.get(id)
    }

    pub fn remote_count(&self) -> usize {
        self.remotes.len()
    }

    /// Our kill count as last reported by the room
    pub fn kills(&self) -> u32 {
        self.kills
    }

    pub fn battle_started(&self) -> bool {
        self.battle_started
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Best-effort write; failures are logged and dropped
    fn send(&mut self, op: ChannelOp) {
        let name = op.name();
        if let Err(err) = self.channel.send(op) {
            log::warn!("Room write '{}' failed: {}", name, err);
        }
    }

    /// Network step of the tick: ingest, evict, smooth, publish
    pub fn sync(&mut self, state: &mut GameState, now_ms: f64) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        let drained = self.inbox.drain();
        let events = match drained {
            Ok(events) => events,
            Err(err) => {
                self.finish_sync(state, now_ms);
                return Err(err);
            }
        };

        for event in events {
            match event {
                InboundEvent::PresenceSnapshot { records } => {
                    self.apply_snapshot(&records, now_ms, &mut state.events)
                }
                InboundEvent::ShotAdded { id, record } => self.ingest_shot(state, id, &record),
                InboundEvent::ShotRemoved { id } => self.remove_shot(state, &id),
            }
        }
        self.finish_sync(state, now_ms);
        Ok(())
    }

    fn finish_sync(&mut self, state: &mut GameState, now_ms: f64) {
        self.expire_landed_shots();
        self.evict_stale(now_ms, &mut state.events);
        for remote in self.remotes.values_mut() {
            remote.smooth(self.tuning.smoothing);
        }
        self.publish_presence(state, now_ms);
        self.check_room_cleared(state);
    }

    /// Merge a full presence set into the tracked remotes
    ///
    /// Records without a name, coordinates or timestamp are skipped (a tracked entry
    /// keeps its previous state). Stale records are evicted. Tracked ids
    /// missing from the set have left.
    pub fn apply_snapshot(
        &mut self,
        records: &HashMap<String, PresenceRecord>,
        now_ms: f64,
        events: &mut Vec<GameEvent>,
    ) {
        if let Some(own) = records.get(&self.local_id) {
            self.kills = own.kills.unwrap_or(self.kills);
        }

        let departed: Vec<String> = self
            .remotes
            .keys()
            .filter(|id| !records.contains_key(*id))
            .cloned()
            .collect();
        for id in departed {
            self.remotes.remove(&id);
            log::info!("{} left the room", id);
            events.push(GameEvent::RemoteLeft { id });
        }

        let mut ids: Vec<&String> = records.keys().filter(|id| **id != self.local_id).collect();
        ids.sort();
        for id in ids {
            let record = &records[id];
            let Some((name, pos)) = record.position() else {
                log::debug!("Ignoring incomplete presence record for {}", id);
                continue;
            };
            let Some(ts) = record.ts else {
                log::debug!("Ignoring undated presence record for {}", id);
                continue;
            };
            if now_ms - ts > self.tuning.stale_after_ms {
                self.evict(id, events);
                continue;
            }

            match self.remotes.get_mut(id) {
                Some(remote) => {
                    remote.name = name.to_string();
                    remote.target = pos;
                    remote.angle = record.angle.unwrap_or(remote.angle);
                    remote.health = record.hp.unwrap_or(remote.health);
                    remote.alive = record.alive.unwrap_or(remote.alive);
                    remote.kills = record.kills.unwrap_or(remote.kills);
                    remote.last_update = ts;
                }
                None => {
                    log::info!("{} ({}) joined the room", name, id);
                    events.push(GameEvent::RemoteJoined {
                        id: id.clone(),
                        name: name.to_string(),
                    });
                    self.remotes.insert(
                        id.clone(),
                        RemotePlayer {
                            id: id.clone(),
                            name: name.to_string(),
                            target: pos,
                            render: pos,
                            angle: record.angle.unwrap_or(0.0),
                            health: record.hp.unwrap_or(0.0),
                            alive: record.alive.unwrap_or(true),
                            kills: record.kills.unwrap_or(0),
                            last_update: ts,
                        },
                    );
                }
            }
        }

        if !self.remotes.is_empty() {
            self.battle_started = true;
        }
    }

    /// Drop a remote and ask the room to forget it
    fn evict(&mut self, id: &str, events: &mut Vec<GameEvent>) {
        let was_tracked = self.remotes.remove(id).is_some();
        log::info!("Evicting stale participant {}", id);
        self.send(ChannelOp::RemovePresence { id: id.to_string() });
        if was_tracked {
            events.push(GameEvent::RemoteLeft { id: id.to_string() });
        }
    }

    fn evict_stale(&mut self, now_ms: f64, events: &mut Vec<GameEvent>) {
        let stale: Vec<String> = self
            .remotes
            .values()
            .filter(|r| r.is_stale(now_ms, self.tuning.stale_after_ms))
            .map(|r| r.id.clone())
            .collect();
        for id in stale {
            self.evict(&id, events);
        }
    }

    /// Write our presence if the publish interval has elapsed
    pub fn publish_presence(&mut self, state: &GameState, now_ms: f64) -> bool {
        let due = self
            .last_publish_ms
            .is_none_or(|last| now_ms - last >= self.tuning.publish_interval_ms);
        if !due {
            return false;
        }
        self.last_publish_ms = Some(now_ms);

        let tank = &state.player.tank;
        let record = PresenceRecord {
            name: Some(self.name.clone()),
            x: Some(tank.pos.x),
            y: Some(tank.pos.y),
            angle: Some(tank.angle),
            hp: Some(tank.health),
            alive: Some(state.phase != GamePhase::GameOver && tank.health > 0.0),
            kills: None,
            ts: Some(now_ms),
        };
        let id = self.local_id.clone();
        self.send(ChannelOp::SetPresence { id, record });
        true
    }

    /// Publish a freshly fired local bullet; returns its shot id
    pub fn publish_shot(&mut self, bullet: &Bullet, damage: f32, now_ms: f64) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.seen_shots.insert(id.clone());
        let record = ShotRecord {
            owner_id: self.local_id.clone(),
            x: bullet.pos.x,
            y: bullet.pos.y,
            vx: bullet.vel.x,
            vy: bullet.vel.y,
            damage,
            ts: now_ms,
        };
        self.send(ChannelOp::PublishShot {
            id: id.clone(),
            record,
        });
        id
    }

    /// Ask the room to delete one of our shots
    pub fn retract_shot(&mut self, id: &str) {
        self.send(ChannelOp::RemoveShot { id: id.to_string() });
    }

    /// Our bullet struck a remote on our screen. The victim's copy is still in
    /// flight and resolves the hit on their side, so the record stays up for
    /// the bullet's remaining life.
    pub fn shot_landed(&mut self, id: String, ticks_left: u32) {
        self.landed_shots.push((id, ticks_left));
    }

    fn expire_landed_shots(&mut self) {
        let mut expired = Vec::new();
        self.landed_shots.retain_mut(|(id, ticks)| {
            *ticks = ticks.saturating_sub(1);
            if *ticks == 0 {
                expired.push(std::mem::take(id));
            }
            *ticks > 0
        });
        for id in expired {
            self.retract_shot(&id);
        }
    }

    fn retract_landed_shots(&mut self) {
        for (id, _) in std::mem::take(&mut self.landed_shots) {
            self.retract_shot(&id);
        }
    }

    /// Materialise a remote shot as a local bullet, once per id
    pub fn ingest_shot(&mut self, state: &mut GameState, id: String, record: &ShotRecord) {
        if !self.seen_shots.insert(id.clone()) {
            return;
        }
        if record.owner_id == self.local_id {
            return;
        }
        let pos = Vec2::new(record.x, record.y);
        let vel = Vec2::new(record.vx, record.vy);
        if !pos.is_finite() || !vel.is_finite() {
            log::debug!("Dropping shot {} with non-finite motion", id);
            return;
        }
        let bullet_id = state.next_entity_id();
        let mut bullet = Bullet::with_velocity(
            bullet_id,
            pos,
            vel,
            BulletOwner::Remote(record.owner_id.clone()),
            record.damage,
        );
        bullet.net_id = Some(id);
        state.bullets.push(bullet);
    }

    /// A shot record was deleted: drop the bullet and forget the id
    pub fn remove_shot(&mut self, state: &mut GameState, id: &str) {
        state.bullets.retain(|b| b.net_id.as_deref() != Some(id));
        self.seen_shots.remove(id);
    }

    /// Hitboxes of live remotes at their last known positions
    pub fn remote_hitboxes(&self, size: f32) -> Vec<(String, Rect)> {
        self.remotes
            .values()
            .filter(|r| r.alive)
            .map(|r| (r.id.clone(), r.rect(size)))
            .collect()
    }

    /// Centres of live remotes, for spawn keep-away checks
    pub fn remote_centres(&self, size: f32) -> Vec<Vec2> {
        self.remotes
            .values()
            .filter(|r| r.alive)
            .map(|r| r.rect(size).center())
            .collect()
    }

    /// Optimistic hit on a remote; no acknowledgement expected
    pub fn damage_remote(&mut self, id: &str, amount: f32) {
        if let Some(remote) = self.remotes.get_mut(id) {
            remote.health = (remote.health - amount).max(0.0);
        }
        self.send(ChannelOp::DamageRemote {
            id: id.to_string(),
            amount,
        });
    }

    /// We are out: credit the shooter, leave the presence set, and take our
    /// bullets out of play
    pub fn eliminate(&mut self, state: &mut GameState, by: Option<String>) {
        if let Some(killer) = by {
            log::info!("Eliminated by {}", killer);
            self.send(ChannelOp::CreditKill { id: killer });
        }
        let id = self.local_id.clone();
        self.send(ChannelOp::RemovePresence { id });

        let (own, rest): (Vec<Bullet>, Vec<Bullet>) = std::mem::take(&mut state.bullets)
            .into_iter()
            .partition(|b| b.owner == BulletOwner::Player);
        state.bullets = rest;
        for shot in own.into_iter().filter_map(|b| b.net_id) {
            self.retract_shot(&shot);
        }
        self.retract_landed_shots();
        self.active = false;
    }

    /// Announce an empty room once per emptying, while we still stand
    fn check_room_cleared(&mut self, state: &mut GameState) {
        if !self.remotes.is_empty() {
            self.room_cleared = false;
            return;
        }
        let alive = state.phase != GamePhase::GameOver && !state.player.tank.is_destroyed();
        if self.battle_started && alive && !self.room_cleared {
            self.room_cleared = true;
            log::info!("Every rival has left the room");
            state.push_event(GameEvent::RoomCleared);
        }
    }

    /// Leave the room (menu, page unload)
    pub fn end_session(&mut self) {
        if !self.active {
            return;
        }
        let id = self.local_id.clone();
        self.send(ChannelOp::RemovePresence { id });
        self.retract_landed_shots();
        self.remotes.clear();
        self.seen_shots.clear();
        self.active = false;
        log::info!("Left room");
    }
}
