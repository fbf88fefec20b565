//! Wire records shared through the room, and the reconciled view of a rival

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::lerp;
use crate::sim::rect::Rect;

/// A participant's published state
///
/// Every field is optional on the wire: writers send partial updates that are
/// merged into the stored record, and readers must cope with half-written
/// records from clients that have only just joined.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresenceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kills: Option<u32>,
    /// Last write, ms since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<f64>,
}

impl PresenceRecord {
    /// Overwrite the fields `update` carries, keep the rest
    pub fn merge(&mut self, update: &PresenceRecord) {
        if update.name.is_some() {
            self.name.clone_from(&update.name);
        }
        self.x = update.x.or(self.x);
        self.y = update.y.or(self.y);
        self.angle = update.angle.or(self.angle);
        self.hp = update.hp.or(self.hp);
        self.alive = update.alive.or(self.alive);
        self.kills = update.kills.or(self.kills);
        self.ts = update.ts.or(self.ts);
    }

    /// Name and coordinates, or `None` if the record is not usable yet
    pub fn position(&self) -> Option<(&str, Vec2)> {
        let name = self.name.as_deref()?;
        Some((name, Vec2::new(self.x?, self.y?)))
    }
}

/// A shot published by its owner
///
/// Carries velocity components rather than angle and speed so every client
/// reconstructs the same vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotRecord {
    pub owner_id: String,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub damage: f32,
    pub ts: f64,
}

/// A tracked rival
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePlayer {
    pub id: String,
    pub name: String,
    /// Last authoritative top-left position
    pub target: Vec2,
    /// Smoothed position used for drawing
    pub render: Vec2,
    pub angle: f32,
    pub health: f32,
    pub alive: bool,
    pub kills: u32,
    /// `ts` of the last applied record
    pub last_update: f64,
}

impl RemotePlayer {
    /// Move the drawn position a fraction of the way to the target
    pub fn smooth(&mut self, alpha: f32) {
        self.render = Vec2::new(
            lerp(self.render.x, self.target.x, alpha),
            lerp(self.render.y, self.target.y, alpha),
        );
    }

    /// Hitbox at the last known position
    pub fn rect(&self, size: f32) -> Rect {
        Rect::square(self.target, size)
    }

    pub fn is_stale(&self, now_ms: f64, stale_after_ms: f64) -> bool {
        now_ms - self.last_update > stale_after_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_unsent_fields() {
        let mut stored = PresenceRecord {
            name: Some("ava".into()),
            x: Some(10.0),
            y: Some(20.0),
            kills: Some(3),
            ..Default::default()
        };
        stored.merge(&PresenceRecord {
            x: Some(15.0),
            ts: Some(1000.0),
            ..Default::default()
        });
        assert_eq!(stored.name.as_deref(), Some("ava"));
        assert_eq!(stored.x, Some(15.0));
        assert_eq!(stored.y, Some(20.0));
        assert_eq!(stored.kills, Some(3));
        assert_eq!(stored.ts, Some(1000.0));
    }

    #[test]
    fn test_position_requires_name_and_coordinates() {
        let mut record = PresenceRecord {
            x: Some(1.0),
            y: Some(2.0),
            ..Default::default()
        };
        assert!(record.position().is_none());
        record.name = Some("kai".into());
        assert_eq!(record.position(), Some(("kai", Vec2::new(1.0, 2.0))));
        record.y = None;
        assert!(record.position().is_none());
    }

    #[test]
    fn test_wire_format() {
        let shot: ShotRecord = serde_json::from_str(
            r#"{"ownerId":"p1","x":1,"y":2,"vx":5,"vy":0,"damage":20,"ts":17}"#,
        )
        .unwrap();
        assert_eq!(shot.owner_id, "p1");
        assert_eq!(shot.vx, 5.0);

        let partial: PresenceRecord = serde_json::from_str(r#"{"name":"zed","ts":5}"#).unwrap();
        assert_eq!(partial.x, None);
        let json = serde_json::to_string(&partial).unwrap();
        assert!(!json.contains("\"x\""));
    }

    #[test]
    fn test_smoothing_converges() {
        let mut remote = RemotePlayer {
            id: "r".into(),
            name: "r".into(),
            target: Vec2::new(100.0, 0.0),
            render: Vec2::ZERO,
            angle: 0.0,
            health: 100.0,
            alive: true,
            kills: 0,
            last_update: 0.0,
        };
        remote.smooth(0.18);
        assert!((remote.render.x - 18.0).abs() < 1e-4);
        for _ in 0..200 {
            remote.smooth(0.18);
        }
        assert!((remote.render.x - 100.0).abs() < 1e-2);
    }
}
