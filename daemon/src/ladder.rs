/// Typed records for the event files produced by the ranking tracker.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::watchlist::normalize;

/// Kind of an event file, inferred from its name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    LpLoss,
    /// `overtake_*`; the payload's `eventType` still picks the template.
    Overtake,
    /// `undertake_*`; parsed like `Overtake`.
    Undertake,
    WeeklySummary,
    Unknown,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::LpLoss => "lp_loss",
            EventKind::Overtake => "overtake",
            EventKind::Undertake => "undertake",
            EventKind::WeeklySummary => "weekly_summary",
            EventKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A player's name as it appears in an `lp_loss_<name>.txt` filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerName {
    /// Original casing, underscores intact.
    pub raw: String,
    /// Underscores replaced with spaces, lowercased. Used for watchlist lookups.
    pub normalized: String,
}

impl PlayerName {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = normalize(&raw);
        Self { raw, normalized }
    }

    /// Name shown to the model and in fallbacks: underscores become spaces,
    /// casing is kept.
    pub fn display(&self) -> String {
        self.raw.replace('_', " ")
    }
}

/// A watchlisted player lost LP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LpLossEvent {
    pub player: PlayerName,
    /// Amount as written by the producer, displayed as-is.
    pub lp_lost: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankChangeType {
    /// The winner actively climbed past the loser.
    Overtake,
    /// The loser fell below the winner.
    Undertake,
    /// Any other `eventType`; no message is sent for it.
    #[serde(other)]
    Unknown,
}

/// One side of a rank change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRank {
    pub tag: String,
    pub tier: String,
    pub rank: String,
}

/// Payload of `overtake_*.json` / `undertake_*.json`.
///
/// Winner and loser are assigned by the producer; nothing here re-derives
/// the ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankChangeEvent {
    pub event_type: RankChangeType,
    pub winner: PlayerRank,
    pub loser: PlayerRank,
}

/// Payload of `weekly_summary*.json`. Opaque; forwarded verbatim into the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklySummaryEvent {
    pub data: serde_json::Value,
}

/// A fully parsed event ready for narration.
#[derive(Debug, Clone, PartialEq)]
pub enum LadderEvent {
    LpLoss(LpLossEvent),
    RankChange(RankChangeEvent),
    WeeklySummary(WeeklySummaryEvent),
}
