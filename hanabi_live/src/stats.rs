//! Statistics for the stats query, aggregated from the store's raw rows.

use serde::{Deserialize, Serialize};

use crate::{
    game::VariantRegistry,
    store::{GameStore, StoreResult, VariantStatsRow},
};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantStats {
    pub id: u32,
    pub name: String,
    pub num_games: u64,
    pub num_max_scores: u64,
    /// Percent of games with a perfect score
    pub max_score_rate: f64,
    pub average_score: f64,
    pub num_strikeouts: u64,
    /// Percent of games lost to strikes
    pub strikeout_rate: f64,
}

impl VariantStats {
    fn from_row(id: u32, name: &str, row: &VariantStatsRow) -> Self {
        let percent = |n: u64| {
            if row.num_games == 0 {
                0.0
            } else {
                n as f64 / row.num_games as f64 * 100.0
            }
        };
        let average_score = if row.num_games == 0 {
            0.0
        } else {
            row.total_score as f64 / row.num_games as f64
        };

        Self {
            id,
            name: name.to_string(),
            num_games: row.num_games,
            num_max_scores: row.num_max_scores,
            max_score_rate: percent(row.num_max_scores),
            average_score,
            num_strikeouts: row.num_strikeouts,
            strikeout_rate: percent(row.num_strikeouts),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub num_games: u64,
    /// e.g. "3 hours, 2 minutes"
    pub time_played: String,
    pub variants: Vec<VariantStats>,
}

/// Gather the statistics for every registered variant. Variants nobody has
/// played yet are reported with zeroes.
pub async fn collect(store: &dyn GameStore, variants: &VariantRegistry) -> StoreResult<StatsReport> {
    let global = store.get_global_stats().await?;
    let rows = store.get_all_variant_stats().await?;

    let empty = VariantStatsRow::default();
    let variants = variants
        .iter()
        .map(|variant| {
            let row = rows.get(&variant.id).unwrap_or(&empty);
            VariantStats::from_row(variant.id, &variant.name, row)
        })
        .collect();

    Ok(StatsReport {
        num_games: global.num_games,
        time_played: format_duration(global.time_played_secs),
        variants,
    })
}

/// Human-readable duration, largest units first.
pub fn format_duration(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = secs % 86_400 / 3_600;
    let minutes = secs % 3_600 / 60;
    let seconds = secs % 60;

    let parts: Vec<String> = [
        (days, "day"),
        (hours, "hour"),
        (minutes, "minute"),
        (seconds, "second"),
    ]
    .into_iter()
    .filter(|(n, _)| *n > 0)
    .map(|(n, unit)| format!("{n} {unit}{}", if n == 1 { "" } else { "s" }))
    .collect();

    if parts.is_empty() {
        "0 seconds".to_string()
    } else {
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        game::{Game, GameAction, GameOptions},
        store::MemoryStore,
    };

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0 seconds");
        assert_eq!(format_duration(61), "1 minute, 1 second");
        assert_eq!(format_duration(90_061), "1 day, 1 hour, 1 minute, 1 second");
        assert_eq!(format_duration(7_200), "2 hours");
    }

    #[tokio::test]
    async fn test_unplayed_variants_are_zero_filled() {
        let variants = VariantRegistry::builtin();
        let store = MemoryStore::new(variants.clone());

        let variant = variants.get("No Variant").unwrap();
        let names = vec!["a".to_string(), "b".to_string()];
        let mut game = Game::new(variant, GameOptions::default(), names, "stats").unwrap();
        game.start().unwrap();
        game.apply(GameAction::Terminate { player: 1 }).unwrap();
        store.write_game(game.record("t")).await.unwrap();

        let report = collect(&store, &variants).await.unwrap();
        assert_eq!(report.num_games, 1);
        assert_eq!(report.variants.len(), variants.len());

        let played = report.variants.iter().find(|v| v.id == 0).unwrap();
        assert_eq!(played.num_games, 1);
        assert_eq!(played.average_score, 0.0);

        let unplayed = report.variants.iter().find(|v| v.id == 1).unwrap();
        assert_eq!(unplayed.num_games, 0);
        assert_eq!(unplayed.max_score_rate, 0.0);
    }
}
