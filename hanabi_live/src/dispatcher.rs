//! Process-level wiring of the three domains.

use log::{info, warn};
use std::sync::Arc;

use crate::{
    chat::{Chat, ChatManager},
    commands::CommandDispatcher,
    config::CoreConfig,
    sessions::{Sessions, SessionsManager},
    stats::{self, StatsReport},
    store::{GameStore, StoreResult},
    table::{Tables, TablesManager},
};

/// Handles to every running domain worker.
#[derive(Clone)]
pub struct Dispatcher {
    pub sessions: SessionsManager,
    pub tables: TablesManager,
    pub chat: ChatManager,
    pub store: Arc<dyn GameStore>,
    pub config: Arc<CoreConfig>,
}

impl Dispatcher {
    /// Spawn the Sessions, Chat and Tables workers on the current runtime.
    pub fn start(config: CoreConfig, store: Arc<dyn GameStore>) -> Self {
        let config = Arc::new(config);
        let sessions = Sessions::spawn(config.clone());
        let chat = Chat::spawn(sessions.clone(), config.clone());
        let tables = Tables::spawn(
            sessions.clone(),
            chat.clone(),
            store.clone(),
            config.clone(),
        );
        info!(
            "Started the domain workers with {} variant(s)",
            config.variants.len()
        );

        Self {
            sessions,
            tables,
            chat,
            store,
            config,
        }
    }

    pub fn commands(&self) -> CommandDispatcher {
        CommandDispatcher::new(
            self.sessions.clone(),
            self.tables.clone(),
            self.chat.clone(),
            self.store.clone(),
        )
    }

    /// Reopen the tables whose game was still running at the last shutdown.
    /// Returns how many were restored.
    pub async fn restore_unfinished(&self) -> StoreResult<usize> {
        let archived = self.store.take_unfinished().await?;
        let total = archived.len();

        let mut restored = 0;
        for table in archived {
            let name = table.name.clone();
            match self.tables.restore(table).await {
                Ok(Ok(_)) => restored += 1,
                Ok(Err(e)) => warn!("Could not restore table \"{name}\": {e}"),
                Err(e) => {
                    warn!("Could not restore table \"{name}\": {e}");
                    break;
                }
            }
        }

        if total > 0 {
            info!("Restored {restored} of {total} unfinished game(s)");
        }
        Ok(restored)
    }

    pub async fn stats(&self) -> StoreResult<StatsReport> {
        stats::collect(self.store.as_ref(), &self.config.variants).await
    }

    /// Drain and stop every worker. Tables go first since they still push
    /// notifications to Sessions while draining.
    pub async fn shutdown(&self) {
        self.tables.shutdown().await;
        self.chat.shutdown().await;
        self.sessions.shutdown().await;
        info!("All domain workers have stopped");
    }
}
