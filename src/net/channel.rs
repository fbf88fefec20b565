//! The boundary between the simulation and the room transport
//!
//! Outbound: the reconciliation layer hands [`ChannelOp`]s to a
//! [`RoomChannel`] and never waits on the result.
//!
//! Inbound: transport callbacks fire outside the tick. Each one becomes a
//! complete [`InboundEvent`] pushed through an [`InboxSender`]; the tick
//! drains the matching [`Inbox`] once, at its network step.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::presence::{PresenceRecord, ShotRecord};
use crate::error::{GameError, Result};

/// Outbound write vocabulary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ChannelOp {
    /// Merge `record` into the participant's presence entry
    SetPresence { id: String, record: PresenceRecord },
    RemovePresence { id: String },
    PublishShot { id: String, record: ShotRecord },
    RemoveShot { id: String },
    /// Read-modify-write increment of the participant's kill count
    CreditKill { id: String },
    /// Optimistic hit report against another participant
    DamageRemote { id: String, amount: f32 },
    /// Have the transport drop this presence entry if we vanish
    RegisterDisconnectCleanup { id: String },
}

impl ChannelOp {
    pub fn name(&self) -> &'static str {
        match self {
            ChannelOp::SetPresence { .. } => "set_presence",
            ChannelOp::RemovePresence { .. } => "remove_presence",
            ChannelOp::PublishShot { .. } => "publish_shot",
            ChannelOp::RemoveShot { .. } => "remove_shot",
            ChannelOp::CreditKill { .. } => "credit_kill",
            ChannelOp::DamageRemote { .. } => "damage_remote",
            ChannelOp::RegisterDisconnectCleanup { .. } => "register_disconnect_cleanup",
        }
    }
}

/// A shared room the local participant writes to
pub trait RoomChannel {
    /// Fire-and-forget write
    fn send(&mut self, op: ChannelOp) -> Result<()>;
}

/// Changes delivered by the room's subscriptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Full presence set (every participant, including us)
    PresenceSnapshot {
        #[serde(default)]
        records: HashMap<String, PresenceRecord>,
    },
    ShotAdded { id: String, record: ShotRecord },
    ShotRemoved { id: String },
}

impl InboundEvent {
    /// Decode one event from the host's JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| GameError::MalformedPayload(e.to_string()))
    }
}

/// Create a connected inbox pair
pub fn inbox() -> (InboxSender, Inbox) {
    let (tx, rx) = mpsc::channel();
    (InboxSender { tx }, Inbox { rx, closed: false })
}

/// Producer half, handed to transport callbacks
#[derive(Debug, Clone)]
pub struct InboxSender {
    tx: Sender<InboundEvent>,
}

impl InboxSender {
    pub fn send(&self, event: InboundEvent) -> Result<()> {
        self.tx.send(event).map_err(|_| GameError::Disconnected)
    }
}

/// Consumer half, drained by the tick
#[derive(Debug)]
pub struct Inbox {
    rx: Receiver<InboundEvent>,
    closed: bool,
}

impl Inbox {
    /// Take everything queued so far
    ///
    /// Reports [`GameError::Disconnected`] once, the first time the queue is
    /// found empty with every sender gone.
    pub fn drain(&mut self) -> Result<Vec<InboundEvent>> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => return Ok(events),
                Err(TryRecvError::Disconnected) => {
                    if self.closed || !events.is_empty() {
                        return Ok(events);
                    }
                    self.closed = true;
                    return Err(GameError::Disconnected);
                }
            }
        }
    }
}

/// Channel that only queues ops for the host to carry out
///
/// Used on the web, where JS owns the actual database connection.
#[derive(Debug, Clone, Default)]
pub struct QueuedChannel {
    outbox: Arc<Mutex<Vec<ChannelOp>>>,
}

impl QueuedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent since the last call
    pub fn take(&self) -> Vec<ChannelOp> {
        match self.outbox.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl RoomChannel for QueuedChannel {
    fn send(&mut self, op: ChannelOp) -> Result<()> {
        let name = op.name();
        let mut queue = self.outbox.lock().map_err(|e| GameError::Channel {
            op: name,
            message: e.to_string(),
        })?;
        queue.push(op);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbox_drains_in_order() {
        let (tx, mut rx) = inbox();
        tx.send(InboundEvent::ShotRemoved { id: "a".into() }).unwrap();
        tx.send(InboundEvent::ShotRemoved { id: "b".into() }).unwrap();
        let events = rx.drain().unwrap();
        assert_eq!(
            events,
            vec![
                InboundEvent::ShotRemoved { id: "a".into() },
                InboundEvent::ShotRemoved { id: "b".into() },
            ]
        );
        assert!(rx.drain().unwrap().is_empty());
    }

    #[test]
    fn test_inbox_reports_disconnect_once() {
        let (tx, mut rx) = inbox();
        drop(tx);
        assert!(matches!(rx.drain(), Err(GameError::Disconnected)));
        assert!(rx.drain().unwrap().is_empty());
    }

    #[test]
    fn test_inbound_json() {
        let event = InboundEvent::from_json(
            r#"{"type":"presence_snapshot","records":{"p2":{"name":"bo","x":10,"y":20,"ts":5}}}"#,
        )
        .unwrap();
        match event {
            InboundEvent::PresenceSnapshot { records } => {
                assert_eq!(records["p2"].name.as_deref(), Some("bo"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            InboundEvent::from_json(r#"{"type":"nope"}"#),
            Err(GameError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_queued_channel() {
        let mut channel = QueuedChannel::new();
        let handle = channel.clone();
        channel
            .send(ChannelOp::RemoveShot { id: "s1".into() })
            .unwrap();
        let ops = handle.take();
        assert_eq!(ops, vec![ChannelOp::RemoveShot { id: "s1".into() }]);
        assert!(handle.take().is_empty());

        let json = serde_json::to_string(&ops[0]).unwrap();
        assert_eq!(json, r#"{"op":"remove_shot","id":"s1"}"#);
    }
}
