use serde::{Deserialize, Serialize};
use std::fmt;

/// Information given by a clue.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Clue {
    /// Suit index
    Color(usize),
    Rank(u8),
}

impl fmt::Display for Clue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Color(suit) => write!(f, "color {suit}"),
            Self::Rank(rank) => write!(f, "rank {rank}"),
        }
    }
}

/// Every action a game can record.
///
/// Internally tagged so that the variant survives serialization into a game
/// record.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GameAction {
    Play { player: usize, order: usize },
    Discard { player: usize, order: usize },
    Clue { player: usize, target: usize, clue: Clue },
    Pause { player: usize },
    Unpause { player: usize },
    Terminate { player: usize },
    Timeout { player: usize },
    /// Nobody acted for too long
    Idle,
}

impl GameAction {
    /// The seat that performed the action, if any.
    pub fn player(&self) -> Option<usize> {
        match self {
            Self::Play { player, .. }
            | Self::Discard { player, .. }
            | Self::Clue { player, .. }
            | Self::Pause { player }
            | Self::Unpause { player }
            | Self::Terminate { player }
            | Self::Timeout { player } => Some(*player),
            Self::Idle => None,
        }
    }

    /// Play, discard and clue resolve a turn; everything else does not.
    pub fn is_turn_action(&self) -> bool {
        matches!(
            self,
            Self::Play { .. } | Self::Discard { .. } | Self::Clue { .. }
        )
    }
}

impl fmt::Display for GameAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Play { player, order } => write!(f, "seat {player} plays card {order}"),
            Self::Discard { player, order } => write!(f, "seat {player} discards card {order}"),
            Self::Clue {
                player,
                target,
                clue,
            } => write!(f, "seat {player} clues seat {target} {clue}"),
            Self::Pause { player } => write!(f, "seat {player} pauses"),
            Self::Unpause { player } => write!(f, "seat {player} unpauses"),
            Self::Terminate { player } => write!(f, "seat {player} terminates"),
            Self::Timeout { player } => write!(f, "seat {player} ran out of time"),
            Self::Idle => write!(f, "idle timeout"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_tag_survives_json() {
        let action = GameAction::Clue {
            player: 0,
            target: 1,
            clue: Clue::Rank(1),
        };
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains(r#""type":"clue""#));
        assert_eq!(serde_json::from_str::<GameAction>(&json).unwrap(), action);

        let idle: GameAction = serde_json::from_str(r#"{"type":"idle"}"#).unwrap();
        assert_eq!(idle, GameAction::Idle);
    }

    #[test]
    fn test_action_classification() {
        assert!(GameAction::Play { player: 0, order: 3 }.is_turn_action());
        assert!(!GameAction::Pause { player: 0 }.is_turn_action());
        assert_eq!(GameAction::Idle.player(), None);
        assert_eq!(GameAction::Timeout { player: 2 }.player(), Some(2));
    }
}
