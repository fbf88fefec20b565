//! Online play
//!
//! Peers share a room holding one presence record per participant and a
//! stream of shot records. There is no authority: each client owns its tank
//! and reconciles everyone else from what the room delivers.

pub mod channel;
pub mod memory;
pub mod presence;
pub mod reconcile;

pub use channel::{ChannelOp, InboundEvent, Inbox, InboxSender, QueuedChannel, RoomChannel, inbox};
pub use memory::{MemoryChannel, MemoryRoom};
pub use presence::{PresenceRecord, RemotePlayer, ShotRecord};
pub use reconcile::{Multiplayer, new_participant_id};
