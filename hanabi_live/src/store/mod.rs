//! Persistence collaborator.
//!
//! The core only talks to storage through [`GameStore`], and only at
//! lifecycle points: a game ending, a replay being created, a stats query,
//! shutdown and the restart after it. None of these calls run inside a domain worker's hot path.

use async_trait::async_trait;
use std::collections::HashMap;

pub mod errors;
pub mod memory;
pub mod models;

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use models::{ArchivedTable, GameRecord, GlobalStats, VariantStatsRow};

#[async_trait]
pub trait GameStore: Send + Sync {
    async fn get_global_stats(&self) -> StoreResult<GlobalStats>;

    /// Aggregates keyed by variant ID. Variants with no games are absent.
    async fn get_all_variant_stats(&self) -> StoreResult<HashMap<u32, VariantStatsRow>>;

    /// Persist a finished game and return its new ID.
    async fn write_game(&self, record: GameRecord) -> StoreResult<u64>;

    async fn load_game(&self, id: u64) -> StoreResult<GameRecord>;

    /// Keep tables whose game was still running when the server went down.
    async fn archive_unfinished(&self, tables: Vec<ArchivedTable>) -> StoreResult<()>;

    /// Hand back every archived table once, emptying the archive.
    async fn take_unfinished(&self) -> StoreResult<Vec<ArchivedTable>>;
}
