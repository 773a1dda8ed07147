//! Variant definitions and the read-only registry handed to each domain.

use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use thiserror::Error;

use super::{
    constants::{MAX_CLUE_NUM, POINTS_PER_SUIT},
    stacks::StackDirection,
};

#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum VariantError {
    #[error("variant \"{0}\" does not exist")]
    UnknownName(String),
    #[error("variant {0} does not exist")]
    UnknownId(u32),
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Suit {
    pub name: String,
    /// Played from 5 down to 1
    pub reversed: bool,
    /// Only one copy of every rank
    pub one_of_each: bool,
}

impl Suit {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reversed: false,
            one_of_each: false,
        }
    }

    #[must_use]
    pub fn reversed(mut self) -> Self {
        self.reversed = true;
        self
    }

    #[must_use]
    pub fn one_of_each(mut self) -> Self {
        self.one_of_each = true;
        self
    }
}

/// A named ruleset.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Variant {
    pub id: u32,
    pub name: String,
    pub suits: Vec<Suit>,
    /// Every stack may be built from either end; the first play decides
    pub up_or_down: bool,
    /// Clue tokens are worth half, so every token amount is doubled
    pub clue_starved: bool,
}

impl Variant {
    pub fn max_score(&self) -> u32 {
        self.suits.len() as u32 * POINTS_PER_SUIT
    }

    pub fn has_reversed_suits(&self) -> bool {
        self.up_or_down || self.suits.iter().any(|suit| suit.reversed)
    }

    /// Convert a number of clues into token units for this variant.
    pub fn adjusted_clue_tokens(&self, clues: u32) -> u32 {
        if self.clue_starved { clues * 2 } else { clues }
    }

    pub fn max_clue_tokens(&self) -> u32 {
        self.adjusted_clue_tokens(MAX_CLUE_NUM)
    }

    /// Stack directions at the start of a game
    pub fn initial_directions(&self) -> Vec<StackDirection> {
        self.suits
            .iter()
            .map(|suit| {
                if self.up_or_down {
                    StackDirection::Undecided
                } else if suit.reversed {
                    StackDirection::Down
                } else {
                    StackDirection::Up
                }
            })
            .collect()
    }
}

/// Read-only lookup of every known variant.
#[derive(Clone, Debug, Default)]
pub struct VariantRegistry {
    by_name: HashMap<String, Arc<Variant>>,
    by_id: BTreeMap<u32, Arc<Variant>>,
}

impl VariantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The variants compiled into the server.
    pub fn builtin() -> Self {
        let five = || {
            vec![
                Suit::new("Red"),
                Suit::new("Yellow"),
                Suit::new("Green"),
                Suit::new("Blue"),
                Suit::new("Purple"),
            ]
        };
        let six = || {
            let mut suits = five();
            suits.push(Suit::new("Teal"));
            suits
        };

        let mut registry = Self::new();
        registry.register(Variant {
            id: 0,
            name: "No Variant".to_string(),
            suits: five(),
            up_or_down: false,
            clue_starved: false,
        });
        registry.register(Variant {
            id: 1,
            name: "6 Suits".to_string(),
            suits: six(),
            up_or_down: false,
            clue_starved: false,
        });
        registry.register(Variant {
            id: 2,
            name: "Black (6 Suits)".to_string(),
            suits: {
                let mut suits = five();
                suits.push(Suit::new("Black").one_of_each());
                suits
            },
            up_or_down: false,
            clue_starved: false,
        });
        registry.register(Variant {
            id: 3,
            name: "Reversed (5 Suits)".to_string(),
            suits: {
                let mut suits = five();
                suits[4] = Suit::new("Purple").reversed();
                suits
            },
            up_or_down: false,
            clue_starved: false,
        });
        registry.register(Variant {
            id: 4,
            name: "Up or Down (5 Suits)".to_string(),
            suits: five(),
            up_or_down: true,
            clue_starved: false,
        });
        registry.register(Variant {
            id: 5,
            name: "Clue Starved (6 Suits)".to_string(),
            suits: six(),
            up_or_down: false,
            clue_starved: true,
        });
        registry
    }

    pub fn register(&mut self, variant: Variant) {
        let variant = Arc::new(variant);
        self.by_name.insert(variant.name.clone(), variant.clone());
        self.by_id.insert(variant.id, variant);
    }

    pub fn get(&self, name: &str) -> Result<Arc<Variant>, VariantError> {
        self.by_name
            .get(name)
            .cloned()
            .ok_or_else(|| VariantError::UnknownName(name.to_string()))
    }

    pub fn get_by_id(&self, id: u32) -> Result<Arc<Variant>, VariantError> {
        self.by_id
            .get(&id)
            .cloned()
            .ok_or(VariantError::UnknownId(id))
    }

    /// Variants ordered by ID.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Variant>> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
