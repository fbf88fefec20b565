//! In-process room
//!
//! Behaves like the hosted realtime database the web build talks to:
//! presence is broadcast as a full set on every change, shots arrive as
//! child-added / child-removed events, kill credit is a read-modify-write, and
//! registered participants are cleaned up when they disconnect. Used by the
//! headless duel and by tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use super::channel::{ChannelOp, Inbox, InboundEvent, InboxSender, RoomChannel, inbox};
use super::presence::{PresenceRecord, ShotRecord};
use crate::error::{GameError, Result};

#[derive(Debug, Default)]
struct RoomData {
    presence: BTreeMap<String, PresenceRecord>,
    shots: BTreeMap<String, ShotRecord>,
    subscribers: Vec<(String, InboxSender)>,
    cleanup: HashSet<String>,
    /// Participants whose connection dropped; their writes are refused
    offline: HashSet<String>,
    hits: Vec<(String, f32)>,
}

impl RoomData {
    fn snapshot(&self) -> InboundEvent {
        InboundEvent::PresenceSnapshot {
            records: self
                .presence
                .iter()
                .map(|(id, r)| (id.clone(), r.clone()))
                .collect(),
        }
    }

    /// Deliver to every subscriber, dropping the ones that have gone away
    fn broadcast(&mut self, event: InboundEvent) {
        self.subscribers
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    fn broadcast_presence(&mut self) {
        let snapshot = self.snapshot();
        self.broadcast(snapshot);
    }
}

/// Shared room handle; clones refer to the same room
#[derive(Debug, Clone, Default)]
pub struct MemoryRoom {
    data: Arc<Mutex<RoomData>>,
}

impl MemoryRoom {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, RoomData>> {
        self.data.lock().map_err(|e| GameError::Channel {
            op: "lock",
            message: e.to_string(),
        })
    }

    /// Subscribe a participant; the inbox starts with the current presence set
    /// and every live shot
    pub fn join(&self, participant: &str) -> Result<(MemoryChannel, Inbox)> {
        let (tx, rx) = inbox();
        let mut data = self.lock()?;
        tx.send(data.snapshot())?;
        for (id, record) in &data.shots {
            tx.send(InboundEvent::ShotAdded {
                id: id.clone(),
                record: record.clone(),
            })?;
        }
        data.offline.remove(participant);
        data.subscribers.push((participant.to_string(), tx));
        log::debug!("{} joined the room", participant);

        let channel = MemoryChannel {
            room: self.clone(),
            participant: participant.to_string(),
        };
        Ok((channel, rx))
    }

    /// Connection lost: stop delivering, run any registered cleanup
    pub fn disconnect(&self, participant: &str) -> Result<()> {
        let mut data = self.lock()?;
        data.subscribers.retain(|(id, _)| id != participant);
        data.offline.insert(participant.to_string());
        if data.cleanup.remove(participant) && data.presence.remove(participant).is_some() {
            data.broadcast_presence();
        }
        Ok(())
    }

    pub fn presence(&self) -> Result<BTreeMap<String, PresenceRecord>> {
        Ok(self.lock()?.presence.clone())
    }

    pub fn shot_count(&self) -> Result<usize> {
        Ok(self.lock()?.shots.len())
    }

    /// Hit reports received so far (victim id, damage)
    pub fn hits(&self) -> Result<Vec<(String, f32)>> {
        Ok(self.lock()?.hits.clone())
    }

    fn apply(&self, from: &str, op: ChannelOp) -> Result<()> {
        let mut data = self.lock()?;
        if data.offline.contains(from) {
            return Err(GameError::Disconnected);
        }
        match op {
            ChannelOp::SetPresence { id, record } => {
                data.presence.entry(id).or_default().merge(&record);
                data.broadcast_presence();
            }
            ChannelOp::RemovePresence { id } => {
                if data.presence.remove(&id).is_some() {
                    data.broadcast_presence();
                }
            }
            ChannelOp::PublishShot { id, record } => {
                data.shots.insert(id.clone(), record.clone());
                data.broadcast(InboundEvent::ShotAdded { id, record });
            }
            ChannelOp::RemoveShot { id } => {
                if data.shots.remove(&id).is_some() {
                    data.broadcast(InboundEvent::ShotRemoved { id });
                }
            }
            ChannelOp::CreditKill { id } => {
                if let Some(record) = data.presence.get_mut(&id) {
                    record.kills = Some(record.kills.unwrap_or(0) + 1);
                    data.broadcast_presence();
                }
            }
            ChannelOp::DamageRemote { id, amount } => data.hits.push((id, amount)),
            ChannelOp::RegisterDisconnectCleanup { id } => {
                data.cleanup.insert(id);
            }
        }
        Ok(())
    }
}

/// One participant's write handle into a [`MemoryRoom`]
#[derive(Debug, Clone)]
pub struct MemoryChannel {
    room: MemoryRoom,
    participant: String,
}

impl MemoryChannel {
    pub fn participant(&self) -> &str {
        &self.participant
    }
}

impl RoomChannel for MemoryChannel {
    fn send(&mut self, op: ChannelOp) -> Result<()> {
        self.room.apply(&self.participant, op)
    }
}
