use super::match_state::{MatchError, MatchState};
use crate::model::card::{Card, ParseCardError};
use crate::model::deck::Deck;
use crate::model::grid::Placement;
use core::fmt;
use core::time::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayRecord {
    pub card: String,
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchSnapshot {
    pub seed: u64,
    pub deck: Vec<String>,
    pub plays: Vec<PlayRecord>,
    pub millis_remaining: u64,
    #[serde(default)]
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    Card(ParseCardError),
    Replay(MatchError),
    Mismatch { recorded: String, dealt: Card },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Card(err) => write!(f, "invalid card in snapshot: {err}"),
            SnapshotError::Replay(err) => write!(f, "snapshot does not replay: {err}"),
            SnapshotError::Mismatch { recorded, dealt } => {
                write!(f, "recorded play of {recorded} but the deal produced {dealt}")
            }
        }
    }
}

impl std::error::Error for SnapshotError {}

impl MatchSnapshot {
    pub fn capture(state: &MatchState) -> Self {
        MatchSnapshot {
            seed: state.seed(),
            deck: state.deck().cards().iter().map(Card::to_string).collect(),
            plays: state
                .history()
                .iter()
                .map(|(card, placement)| PlayRecord {
                    card: card.to_string(),
                    row: placement.row,
                    col: placement.col,
                })
                .collect(),
            millis_remaining: state.millis_remaining(),
            timed_out: state.timed_out(),
        }
    }

    /// Rebuild the game by replaying every recorded placement against the
    /// recorded deal.
    pub fn restore(&self) -> Result<MatchState, SnapshotError> {
        let cards = self
            .deck
            .iter()
            .map(|code| code.parse::<Card>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(SnapshotError::Card)?;
        let budget = if self.timed_out { 0 } else { self.millis_remaining };
        let mut state = MatchState::from_deck(self.seed, Deck::with_prefix(&cards), budget);
        for play in &self.plays {
            let expected: Card = play.card.parse().map_err(SnapshotError::Card)?;
            let dealt = state.next_card().map_err(SnapshotError::Replay)?;
            if dealt != expected {
                return Err(SnapshotError::Mismatch {
                    recorded: play.card.clone(),
                    dealt,
                });
            }
            state
                .apply_play(Placement::new(play.row, play.col), Duration::ZERO)
                .map_err(SnapshotError::Replay)?;
        }
        Ok(state)
    }

    pub fn to_json(state: &MatchState) -> serde_json::Result<String> {
        let snapshot = Self::capture(state);
        serde_json::to_string_pretty(&snapshot)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::{MatchSnapshot, SnapshotError};
    use crate::game::match_state::MatchState;
    use crate::model::grid::Placement;
    use core::time::Duration;

    fn played_state(seed: u64, plays: usize) -> MatchState {
        let mut state = MatchState::with_seed_and_budget(seed, 5_000);
        for index in 0..plays {
            state.next_card().unwrap();
            state
                .apply_play(Placement::from_index(24 - index), Duration::from_millis(3))
                .unwrap();
        }
        state
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let state = played_state(99, 2);
        let json = MatchSnapshot::to_json(&state).unwrap();
        assert!(json.contains("\"seed\": 99"));
        assert!(json.contains("\"millis_remaining\": 4994"));
        assert!(json.contains("\"row\": 4"));
    }

    #[test]
    fn snapshot_roundtrip_restores_grid_and_clock() {
        let state = played_state(123, 7);
        let snapshot = MatchSnapshot::capture(&state);
        let restored = snapshot.restore().unwrap();
        assert_eq!(restored.grid(), state.grid());
        assert_eq!(restored.millis_remaining(), state.millis_remaining());
        assert_eq!(restored.history(), state.history());
        assert_eq!(restored.deck(), state.deck());
    }

    #[test]
    fn snapshot_from_json_defaults_missing_timeout_flag() {
        let state = played_state(7, 0);
        let mut value: serde_json::Value =
            serde_json::from_str(&MatchSnapshot::to_json(&state).unwrap()).unwrap();
        value.as_object_mut().unwrap().remove("timed_out");
        let snapshot = MatchSnapshot::from_json(&value.to_string()).unwrap();
        assert!(!snapshot.timed_out);
        assert!(snapshot.plays.is_empty());
    }

    #[test]
    fn corrupted_card_code_is_reported() {
        let mut snapshot = MatchSnapshot::capture(&played_state(1, 1));
        snapshot.deck[0] = "ZZ".to_string();
        assert!(matches!(snapshot.restore(), Err(SnapshotError::Card(_))));
    }

    #[test]
    fn play_that_disagrees_with_deal_is_reported() {
        let mut snapshot = MatchSnapshot::capture(&played_state(1, 1));
        snapshot.deck.swap(0, 1);
        assert!(matches!(
            snapshot.restore(),
            Err(SnapshotError::Mismatch { .. })
        ));
    }
}
