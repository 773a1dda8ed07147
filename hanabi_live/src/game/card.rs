use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{constants::MAX_RANK, variant::Variant};

/// Suit and rank of a card, without any per-game flags.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct CardIdentity {
    pub suit_index: usize,
    pub rank: u8,
}

impl CardIdentity {
    pub fn new(suit_index: usize, rank: u8) -> Self {
        Self { suit_index, rank }
    }
}

impl fmt::Display for CardIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}r{}", self.suit_index, self.rank)
    }
}

/// A card in play. Never removed from the deck, only flagged.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Card {
    /// Position in the deck; doubles as the card's unique ID
    pub order: usize,
    pub suit_index: usize,
    pub rank: u8,
    pub played: bool,
    pub discarded: bool,
    /// Provably dead: no sequence of future plays can use it
    pub cannot_be_played: bool,
}

impl Card {
    pub fn new(order: usize, identity: CardIdentity) -> Self {
        Self {
            order,
            suit_index: identity.suit_index,
            rank: identity.rank,
            played: false,
            discarded: false,
            cannot_be_played: false,
        }
    }

    pub fn identity(&self) -> CardIdentity {
        CardIdentity::new(self.suit_index, self.rank)
    }

    /// Played or discarded
    pub fn is_gone(&self) -> bool {
        self.played || self.discarded
    }
}

/// Copies of `rank` in a normal suit.
fn copies(rank: u8) -> usize {
    match rank {
        1 => 3,
        5 => 1,
        _ => 2,
    }
}

/// Every card of a variant in suit-major, rank-ascending order.
pub fn build_identities(variant: &Variant) -> Vec<CardIdentity> {
    let mut identities = Vec::new();
    for (suit_index, suit) in variant.suits.iter().enumerate() {
        for rank in 1..=MAX_RANK {
            let n = if suit.one_of_each { 1 } else { copies(rank) };
            identities.extend(std::iter::repeat_n(CardIdentity::new(suit_index, rank), n));
        }
    }
    identities
}

/// FNV-1a of the seed string, so that equal seeds deal equal decks on every
/// platform.
pub fn seed_hash(seed: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    seed.bytes()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME))
}

/// The deck dealt by `seed`.
pub fn shuffled_identities(variant: &Variant, seed: &str) -> Vec<CardIdentity> {
    let mut identities = build_identities(variant);
    let mut rng = StdRng::seed_from_u64(seed_hash(seed));
    identities.shuffle(&mut rng);
    identities
}

/// A fresh seed for a table that did not choose one.
pub fn random_seed(num_players: usize, variant: &Variant) -> String {
    format!("p{num_players}v{}s{}", variant.id, rand::random::<u32>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::variant::VariantRegistry;

    #[test]
    fn test_deck_composition() {
        let registry = VariantRegistry::builtin();
        let deck = build_identities(&registry.get("No Variant").unwrap());
        assert_eq!(deck.len(), 50);
        assert_eq!(deck.iter().filter(|c| c.rank == 1).count(), 15);
        assert_eq!(deck.iter().filter(|c| c.rank == 5).count(), 5);

        let black = build_identities(&registry.get("Black (6 Suits)").unwrap());
        assert_eq!(black.len(), 55);
        assert_eq!(black.iter().filter(|c| c.suit_index == 5).count(), 5);
    }

    #[test]
    fn test_equal_seeds_deal_equal_decks() {
        let variant = VariantRegistry::builtin().get("No Variant").unwrap();
        let a = shuffled_identities(&variant, "p2v0s1");
        let b = shuffled_identities(&variant, "p2v0s1");
        let c = shuffled_identities(&variant, "p2v0s2");
        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut sorted = a.clone();
        sorted.sort();
        let mut expected = build_identities(&variant);
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn test_random_seed_format() {
        let variant = VariantRegistry::builtin().get("No Variant").unwrap();
        assert!(random_seed(3, &variant).starts_with("p3v0s"));
    }
}
