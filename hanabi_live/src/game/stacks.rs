//! Play stack directions and the direction-aware reachability rules used for
//! the achievable max score, dead-card marking and the end-of-game scan.

use serde::{Deserialize, Serialize};

use super::{
    card::Card,
    constants::{MAX_RANK, POINTS_PER_SUIT},
};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StackDirection {
    /// Nothing played yet in an "Up or Down" suit; a 1 or a 5 may start it
    Undecided,
    #[default]
    Up,
    Down,
    Finished,
}

/// Ranks that may be played next on a stack whose top card is `top`
/// (0 when empty).
pub fn next_ranks(direction: StackDirection, top: u8) -> Vec<u8> {
    match direction {
        StackDirection::Undecided => vec![1, MAX_RANK],
        StackDirection::Up => vec![top + 1],
        StackDirection::Down if top == 0 => vec![MAX_RANK],
        StackDirection::Down => vec![top - 1],
        StackDirection::Finished => Vec::new(),
    }
}

pub fn is_playable(direction: StackDirection, top: u8, rank: u8) -> bool {
    next_ranks(direction, top).contains(&rank)
}

/// Direction after `rank` lands on a stack.
pub fn direction_after_play(direction: StackDirection, rank: u8) -> StackDirection {
    let direction = match direction {
        StackDirection::Undecided if rank == 1 => StackDirection::Up,
        StackDirection::Undecided => StackDirection::Down,
        other => other,
    };

    match direction {
        StackDirection::Up if rank == MAX_RANK => StackDirection::Finished,
        StackDirection::Down if rank == 1 => StackDirection::Finished,
        other => other,
    }
}

/// `alive[rank]` is true when at least one copy of `rank` in `suit` has not
/// been discarded. Index 0 is unused.
fn alive_ranks(deck: &[Card], suit: usize) -> [bool; MAX_RANK as usize + 1] {
    let mut alive = [false; MAX_RANK as usize + 1];
    for card in deck.iter().filter(|c| c.suit_index == suit && !c.discarded) {
        alive[usize::from(card.rank)] = true;
    }
    alive
}

/// Length of the unbroken chains from 1 upwards and from 5 downwards.
fn chains(deck: &[Card], suit: usize) -> (u8, u8) {
    let alive = alive_ranks(deck, suit);
    let up = (1..=MAX_RANK)
        .take_while(|rank| alive[usize::from(*rank)])
        .count() as u8;
    let down = (1..=MAX_RANK)
        .rev()
        .take_while(|rank| alive[usize::from(*rank)])
        .count() as u8;
    (up, down)
}

/// Points this suit can still reach.
pub fn suit_max_score(deck: &[Card], suit: usize, direction: StackDirection) -> u32 {
    let (up, down) = chains(deck, suit);
    match direction {
        StackDirection::Up => u32::from(up),
        StackDirection::Down => u32::from(down),
        StackDirection::Undecided => u32::from(up.max(down)),
        StackDirection::Finished => POINTS_PER_SUIT,
    }
}

/// Whether an unplayed card of `rank` can never land on its stack.
pub fn is_dead(deck: &[Card], suit: usize, direction: StackDirection, top: u8, rank: u8) -> bool {
    let (up, down) = chains(deck, suit);
    let reachable_up = rank <= up;
    let reachable_down = rank > MAX_RANK - down;

    match direction {
        StackDirection::Finished => true,
        StackDirection::Up => rank <= top || !reachable_up,
        StackDirection::Down => (top != 0 && rank >= top) || !reachable_down,
        StackDirection::Undecided => !reachable_up && !reachable_down,
    }
}
