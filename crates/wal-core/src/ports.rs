use async_trait::async_trait;

use crate::{
    domain::{Extraction, HistoryEntry},
    Result,
};

/// Pulls a phone number out of arbitrary text (email signatures, chat pastes).
///
/// Implementations swallow their own failures: missing credentials, no match
/// and transport errors all come back as `None`. They should log the reason.
#[async_trait]
pub trait ExtractionGateway: Send + Sync {
    async fn extract(&self, text: &str) -> Option<Extraction>;
}

/// Hands a chat URL to the platform. Fire-and-forget.
pub trait ChatOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// Load/store pair for the persisted history blob.
///
/// Errors are reported to the store, which logs them and falls back to an
/// empty history (load) or keeps running in memory (save).
pub trait HistoryStorage: Send + Sync {
    fn load(&self) -> Result<Vec<HistoryEntry>>;
    fn save(&self, entries: &[HistoryEntry]) -> Result<()>;
}
