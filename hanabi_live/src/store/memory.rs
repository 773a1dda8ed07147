//! In-process store, used by the server until a database is plugged in and
//! by the tests.

use async_trait::async_trait;
use log::info;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{
    GameStore,
    errors::{StoreError, StoreResult},
    models::{ArchivedTable, GameRecord, GlobalStats, VariantStatsRow},
};
use crate::game::{EndCondition, VariantRegistry};

#[derive(Debug, Default)]
struct Inner {
    games: Vec<GameRecord>,
    unfinished: Vec<ArchivedTable>,
}

#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    /// Needed to know each variant's perfect score
    variants: VariantRegistry,
}

impl MemoryStore {
    pub fn new(variants: VariantRegistry) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            variants,
        }
    }

    /// Tables archived by [`GameStore::archive_unfinished`] and not yet
    /// taken back.
    pub async fn unfinished(&self) -> Vec<ArchivedTable> {
        self.inner.read().await.unfinished.clone()
    }

    pub async fn num_games(&self) -> usize {
        self.inner.read().await.games.len()
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn get_global_stats(&self) -> StoreResult<GlobalStats> {
        let inner = self.inner.read().await;
        Ok(GlobalStats {
            num_games: inner.games.len() as u64,
            time_played_secs: inner.games.iter().map(GameRecord::duration_secs).sum(),
        })
    }

    async fn get_all_variant_stats(&self) -> StoreResult<HashMap<u32, VariantStatsRow>> {
        let inner = self.inner.read().await;
        let mut rows: HashMap<u32, VariantStatsRow> = HashMap::new();
        for record in &inner.games {
            let perfect = self
                .variants
                .get_by_id(record.variant_id)
                .map(|v| v.max_score())
                .ok();
            let row = rows.entry(record.variant_id).or_default();
            row.num_games += 1;
            row.total_score += u64::from(record.score);
            if perfect == Some(record.score) {
                row.num_max_scores += 1;
            }
            if record.end_condition == EndCondition::Strikeout {
                row.num_strikeouts += 1;
            }
        }
        Ok(rows)
    }

    async fn write_game(&self, mut record: GameRecord) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        let id = inner.games.len() as u64 + 1;
        record.id = id;
        inner.games.push(record);
        Ok(id)
    }

    async fn load_game(&self, id: u64) -> StoreResult<GameRecord> {
        let inner = self.inner.read().await;
        inner
            .games
            .iter()
            .find(|record| record.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn archive_unfinished(&self, tables: Vec<ArchivedTable>) -> StoreResult<()> {
        info!("Archiving {} unfinished game(s)", tables.len());
        self.inner.write().await.unfinished.extend(tables);
        Ok(())
    }

    async fn take_unfinished(&self) -> StoreResult<Vec<ArchivedTable>> {
        Ok(std::mem::take(&mut self.inner.write().await.unfinished))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Game, GameAction, GameOptions};

    fn terminated_record() -> GameRecord {
        let variants = VariantRegistry::builtin();
        let variant = variants.get("No Variant").unwrap();
        let names = vec!["a".to_string(), "b".to_string()];
        let mut game = Game::new(variant, GameOptions::default(), names, "store").unwrap();
        game.start().unwrap();
        game.apply(GameAction::Terminate { player: 0 }).unwrap();
        game.record("store table")
    }

    #[tokio::test]
    async fn test_write_and_load() {
        let store = MemoryStore::new(VariantRegistry::builtin());
        let id = store.write_game(terminated_record()).await.unwrap();
        assert_eq!(id, 1);

        let record = store.load_game(id).await.unwrap();
        assert_eq!(record.id, 1);
        assert_eq!(record.table_name, "store table");
        assert_eq!(store.load_game(9).await.unwrap_err(), StoreError::NotFound(9));
    }

    #[tokio::test]
    async fn test_variant_rows() {
        let store = MemoryStore::new(VariantRegistry::builtin());
        store.write_game(terminated_record()).await.unwrap();
        store.write_game(terminated_record()).await.unwrap();

        let rows = store.get_all_variant_stats().await.unwrap();
        let row = &rows[&0];
        assert_eq!(row.num_games, 2);
        assert_eq!(row.total_score, 0);
        assert_eq!(row.num_max_scores, 0);
        assert_eq!(store.get_global_stats().await.unwrap().num_games, 2);
    }
}
