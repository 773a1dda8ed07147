//! Read-only configuration shared by every domain worker.

use std::time::Duration;

use crate::game::VariantRegistry;

pub const DEFAULT_CHAT_HISTORY_LENGTH: usize = 100;
pub const DEFAULT_MAX_CHAT_LENGTH: usize = 300;
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Built once by the process bootstrap and handed to each domain at
/// construction.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    pub variants: VariantRegistry,
    /// Messages kept per chat room
    pub chat_history_length: usize,
    pub max_chat_length: usize,
    /// Running games with no activity for this long are ended
    pub idle_timeout: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            variants: VariantRegistry::builtin(),
            chat_history_length: DEFAULT_CHAT_HISTORY_LENGTH,
            max_chat_length: DEFAULT_MAX_CHAT_LENGTH,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}
