/// Clue tokens at the start of a game, before variant adjustment.
pub const MAX_CLUE_NUM: u32 = 8;

/// Strikes that end the game.
pub const MAX_STRIKE_NUM: u32 = 3;

pub const POINTS_PER_SUIT: u32 = 5;

/// Highest rank in a suit.
pub const MAX_RANK: u8 = 5;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 6;
