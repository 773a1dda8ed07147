//! Turn timers.
//!
//! A timed table keeps one time bank per seat. When a turn begins a delayed
//! task is spawned for the active seat's remaining time; it is never
//! cancelled. On wake-up it submits the [`TimerToken`] captured at arming
//! time back into the Tables queue, where the token is revalidated against
//! the live game before anything happens.

use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use super::{
    manager::TablesManager,
    messages::TablesRequest,
    models::TableId,
};
use crate::game::Game;

/// The game state a timer was armed against.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TimerToken {
    pub table_id: TableId,
    pub turn: u32,
    pub pause_count: u32,
    pub generation: u64,
}

impl TimerToken {
    pub fn capture(table_id: TableId, game: &Game) -> Self {
        Self {
            table_id,
            turn: game.turn(),
            pause_count: game.pause_count(),
            generation: game.generation(),
        }
    }

    /// Whether a timeout may still be applied: same turn, not paused, no
    /// pause in between, no other mutation, not ended.
    pub fn is_current(&self, game: &Game) -> bool {
        self.turn == game.turn()
            && !game.is_paused()
            && self.pause_count == game.pause_count()
            && self.generation == game.generation()
            && !game.is_ended()
    }
}

/// Per-seat time banks measured on tokio's clock.
#[derive(Clone, Debug)]
pub struct TurnClock {
    banks: Vec<Duration>,
    time_per_turn: Duration,
    /// When the active seat's clock started running; `None` while paused
    running_since: Option<Instant>,
}

impl TurnClock {
    pub fn new(seats: usize, time_base: Duration, time_per_turn: Duration, now: Instant) -> Self {
        Self {
            banks: vec![time_base; seats],
            time_per_turn,
            running_since: Some(now),
        }
    }

    fn charge(&mut self, seat: usize, now: Instant) {
        if let (Some(since), Some(bank)) = (self.running_since, self.banks.get_mut(seat)) {
            *bank = bank.saturating_sub(now.saturating_duration_since(since));
        }
    }

    /// `seat` finished its turn; the next seat's clock starts.
    pub fn end_turn(&mut self, seat: usize, now: Instant) {
        self.charge(seat, now);
        if let Some(bank) = self.banks.get_mut(seat) {
            *bank = bank.saturating_add(self.time_per_turn);
        }
        self.running_since = Some(now);
    }

    pub fn pause(&mut self, seat: usize, now: Instant) {
        self.charge(seat, now);
        self.running_since = None;
    }

    pub fn resume(&mut self, now: Instant) {
        self.running_since = Some(now);
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    /// Time `seat` has left if it is the one on the clock.
    pub fn remaining(&self, seat: usize, now: Instant) -> Duration {
        let bank = self.banks.get(seat).copied().unwrap_or_default();
        match self.running_since {
            Some(since) => bank.saturating_sub(now.saturating_duration_since(since)),
            None => bank,
        }
    }

    pub fn bank(&self, seat: usize) -> Duration {
        self.banks.get(seat).copied().unwrap_or_default()
    }
}

/// Spawn the delayed check for `token`.
pub fn schedule(tables: TablesManager, token: TimerToken, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if tables.submit(TablesRequest::CheckTimer(token)).is_err() {
            debug!("Turn timer for table {} fired after shutdown", token.table_id);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{GameAction, GameOptions, VariantRegistry};

    fn timed_game() -> Game {
        let variant = VariantRegistry::builtin().get("No Variant").unwrap();
        let options = GameOptions {
            timed: true,
            ..Default::default()
        };
        let names = vec!["a".to_string(), "b".to_string()];
        let mut game = Game::new(variant, options, names, "timer").unwrap();
        game.start().unwrap();
        game
    }

    #[test]
    fn test_token_goes_stale_on_turn_and_pause() {
        let mut game = timed_game();
        let token = TimerToken::capture(1, &game);
        assert!(token.is_current(&game));

        let order = game.hand(0)[0];
        game.apply(GameAction::Discard { player: 0, order }).unwrap_err();
        assert!(token.is_current(&game));

        game.apply(GameAction::Pause { player: 1 }).unwrap();
        assert!(!token.is_current(&game));
        game.apply(GameAction::Unpause { player: 1 }).unwrap();
        assert!(!token.is_current(&game));

        let token = TimerToken::capture(1, &game);
        game.apply(GameAction::Play { player: 0, order }).unwrap();
        assert!(!token.is_current(&game));
    }

    #[test]
    fn test_clock_banks() {
        let start = Instant::now();
        let mut clock = TurnClock::new(2, Duration::from_secs(60), Duration::from_secs(10), start);

        let later = start + Duration::from_secs(15);
        assert_eq!(clock.remaining(0, later), Duration::from_secs(45));
        clock.end_turn(0, later);
        assert_eq!(clock.bank(0), Duration::from_secs(55));

        let paused_at = later + Duration::from_secs(20);
        clock.pause(1, paused_at);
        assert!(!clock.is_running());
        assert_eq!(clock.remaining(1, paused_at + Duration::from_secs(100)), Duration::from_secs(40));

        let resumed = paused_at + Duration::from_secs(100);
        clock.resume(resumed);
        assert_eq!(clock.remaining(1, resumed + Duration::from_secs(50)), Duration::ZERO);
    }

    #[test]
    fn test_bank_saturates_instead_of_overflowing() {
        let start = Instant::now();
        let mut clock = TurnClock::new(2, Duration::MAX, Duration::MAX, start);

        clock.end_turn(0, start);
        assert_eq!(clock.bank(0), Duration::MAX);
        clock.end_turn(1, start + Duration::from_secs(1));
        assert_eq!(clock.bank(1), Duration::MAX);
        assert!(clock.is_running());
    }
}
