/// Filename-based classification and payload parsing.
///
/// Classification is an ordered table of [`Rule`]s: the first rule whose
/// predicate accepts the file name wins. Prefixes are case-sensitive. A name
/// matching no rule is [`EventKind::Unknown`] and is never parsed.
///
/// Nothing in this module touches the filesystem; callers read the file and
/// hand the contents in.
use thiserror::Error;
use tracing::warn;

use crate::ladder::{
    EventKind, LadderEvent, LpLossEvent, PlayerName, RankChangeEvent, WeeklySummaryEvent,
};

pub const LP_LOSS_PREFIX: &str = "lp_loss_";
pub const OVERTAKE_PREFIX: &str = "overtake_";
pub const UNDERTAKE_PREFIX: &str = "undertake_";
pub const WEEKLY_SUMMARY_PREFIX: &str = "weekly_summary";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid {kind} payload: {source}")]
    InvalidJson {
        kind: EventKind,
        #[source]
        source: serde_json::Error,
    },
}

/// A `(predicate, parser)` pair.
pub struct Rule {
    pub kind: EventKind,
    pub matches: fn(&str) -> bool,
    /// Receives the file's base name and its full contents.
    pub parse: fn(&str, &str) -> Result<LadderEvent, ParseError>,
}

/// Evaluated top to bottom.
pub const RULES: &[Rule] = &[
    Rule {
        kind: EventKind::LpLoss,
        matches: |name| name.starts_with(LP_LOSS_PREFIX),
        parse: parse_lp_loss,
    },
    Rule {
        kind: EventKind::Overtake,
        matches: |name| name.starts_with(OVERTAKE_PREFIX),
        parse: parse_rank_change,
    },
    Rule {
        kind: EventKind::Undertake,
        matches: |name| name.starts_with(UNDERTAKE_PREFIX),
        parse: parse_rank_change,
    },
    Rule {
        kind: EventKind::WeeklySummary,
        matches: |name| name.starts_with(WEEKLY_SUMMARY_PREFIX),
        parse: parse_weekly_summary,
    },
];

/// Returns the first rule accepting `file_name`, or `None` for unknown files.
pub fn rule_for(file_name: &str) -> Option<&'static Rule> {
    RULES.iter().find(|rule| (rule.matches)(file_name))
}

pub fn classify(file_name: &str) -> EventKind {
    rule_for(file_name).map_or(EventKind::Unknown, |rule| rule.kind)
}

/// Extracts the player from an `lp_loss_<name>[.txt]` file name.
///
/// Only the filename is needed, so the watchlist can be checked before the
/// file is read.
pub fn lp_loss_player(file_name: &str) -> PlayerName {
    let rest = file_name.strip_prefix(LP_LOSS_PREFIX).unwrap_or(file_name);
    let raw = rest.strip_suffix(".txt").unwrap_or(rest);
    PlayerName::new(raw)
}

fn parse_lp_loss(file_name: &str, content: &str) -> Result<LadderEvent, ParseError> {
    let lp_lost = content.trim().to_string();
    if lp_lost.parse::<f64>().is_err() {
        warn!(file = %file_name, value = %lp_lost, "LP amount is not numeric; displaying as-is");
    }
    Ok(LadderEvent::LpLoss(LpLossEvent {
        player: lp_loss_player(file_name),
        lp_lost,
    }))
}

/// Shared by both rank change prefixes; the error names the prefix it came from.
fn parse_rank_change(file_name: &str, content: &str) -> Result<LadderEvent, ParseError> {
    let kind = if file_name.starts_with(UNDERTAKE_PREFIX) {
        EventKind::Undertake
    } else {
        EventKind::Overtake
    };
    serde_json::from_str::<RankChangeEvent>(content)
        .map(LadderEvent::RankChange)
        .map_err(|source| ParseError::InvalidJson { kind, source })
}

fn parse_weekly_summary(_file_name: &str, content: &str) -> Result<LadderEvent, ParseError> {
    serde_json::from_str::<serde_json::Value>(content)
        .map(|data| LadderEvent::WeeklySummary(WeeklySummaryEvent { data }))
        .map_err(|source| ParseError::InvalidJson {
            kind: EventKind::WeeklySummary,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::RankChangeType;

    const OVERTAKE_JSON: &str = concat!(
        r#"{"eventType":"overtake","winner":{"tag":"A","tier":"GOLD","rank":"II"},"#,
        r#""loser":{"tag":"B","tier":"GOLD","rank":"III"}}"#
    );

    // ── classify ──────────────────────────────────────────────────────────────

    #[test]
    fn classify_by_prefix() {
        assert_eq!(classify("lp_loss_player1.txt"), EventKind::LpLoss);
        assert_eq!(classify("overtake_1.json"), EventKind::Overtake);
        assert_eq!(classify("undertake_17.json"), EventKind::Undertake);
        assert_eq!(classify("weekly_summary_2024-05-12.json"), EventKind::WeeklySummary);
        assert_eq!(classify("weekly_summary.json"), EventKind::WeeklySummary);
    }

    #[test]
    fn classify_unknown_names() {
        assert_eq!(classify("readme.txt"), EventKind::Unknown);
        assert_eq!(classify("lp_loss"), EventKind::Unknown);
        assert_eq!(classify("my_overtake_1.json"), EventKind::Unknown);
    }

    #[test]
    fn classify_is_case_sensitive() {
        assert_eq!(classify("LP_LOSS_player1.txt"), EventKind::Unknown);
        assert_eq!(classify("Overtake_1.json"), EventKind::Unknown);
    }

    #[test]
    fn lp_loss_prefix_wins_over_later_rules() {
        // A name that also contains a later prefix is still an LP loss.
        assert_eq!(classify("lp_loss_weekly_summary.txt"), EventKind::LpLoss);
    }

    #[test]
    fn rules_are_ordered_by_priority() {
        let kinds: Vec<_> = RULES.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::LpLoss,
                EventKind::Overtake,
                EventKind::Undertake,
                EventKind::WeeklySummary,
            ]
        );
    }

    // ── lp_loss ───────────────────────────────────────────────────────────────

    #[test]
    fn lp_loss_player_strips_prefix_and_suffix() {
        let player = lp_loss_player("lp_loss_Player_One.txt");
        assert_eq!(player.raw, "Player_One");
        assert_eq!(player.normalized, "player one");
    }

    #[test]
    fn lp_loss_player_without_txt_suffix() {
        let player = lp_loss_player("lp_loss_player1");
        assert_eq!(player.raw, "player1");
    }

    #[test]
    fn parse_lp_loss_trims_value() {
        let rule = rule_for("lp_loss_player1.txt").unwrap();
        let event = (rule.parse)("lp_loss_player1.txt", "23\n").unwrap();
        match event {
            LadderEvent::LpLoss(e) => {
                assert_eq!(e.lp_lost, "23");
                assert_eq!(e.player.normalized, "player1");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn parse_lp_loss_keeps_non_numeric_text() {
        let rule = rule_for("lp_loss_player1.txt").unwrap();
        match (rule.parse)("lp_loss_player1.txt", "lots").unwrap() {
            LadderEvent::LpLoss(e) => assert_eq!(e.lp_lost, "lots"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    // ── rank change ───────────────────────────────────────────────────────────

    #[test]
    fn parse_rank_change_valid() {
        let rule = rule_for("overtake_1.json").unwrap();
        match (rule.parse)("overtake_1.json", OVERTAKE_JSON).unwrap() {
            LadderEvent::RankChange(e) => {
                assert_eq!(e.event_type, RankChangeType::Overtake);
                assert_eq!(e.winner.tag, "A");
                assert_eq!(e.loser.rank, "III");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn parse_rank_change_malformed_json() {
        let rule = rule_for("overtake_1.json").unwrap();
        let err = (rule.parse)("overtake_1.json", "{not json").unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidJson { kind: EventKind::Overtake, .. }
        ));
    }

    #[test]
    fn undertake_parse_error_names_undertake() {
        let rule = rule_for("undertake_3.json").unwrap();
        let err = (rule.parse)("undertake_3.json", "[]").unwrap_err();
        assert!(err.to_string().starts_with("invalid undertake payload"));
    }

    #[test]
    fn parse_rank_change_missing_field() {
        let rule = rule_for("undertake_1.json").unwrap();
        let json = r#"{"eventType":"undertake","winner":{"tag":"A","tier":"GOLD","rank":"II"}}"#;
        assert!((rule.parse)("undertake_1.json", json).is_err());
    }

    // ── weekly summary ────────────────────────────────────────────────────────

    #[test]
    fn parse_weekly_summary_accepts_any_shape() {
        let rule = rule_for("weekly_summary.json").unwrap();
        let json = r#"{"climbers":[{"tag":"A","delta":120}],"note":"quiet week"}"#;
        match (rule.parse)("weekly_summary.json", json).unwrap() {
            LadderEvent::WeeklySummary(e) => assert_eq!(e.data["note"], "quiet week"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn parse_weekly_summary_rejects_invalid_json() {
        let rule = rule_for("weekly_summary.json").unwrap();
        assert!((rule.parse)("weekly_summary.json", "week: good").is_err());
    }
}
