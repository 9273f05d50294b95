//! Fire-and-forget submission of finished match results.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(rename = "winnerName")]
    pub winner_name: String,
    #[serde(rename = "loserName")]
    pub loser_name: String,
    #[serde(rename = "scoreLeft")]
    pub score_left: u32,
    #[serde(rename = "scoreRight")]
    pub score_right: u32,
}

/// Destination for match results. `submit` must not block, and a failure
/// to persist is only logged: the game is already over either way.
pub trait RecordSink: Send {
    fn submit(&self, result: MatchResult);
}

/// Records results to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl RecordSink for LogSink {
    fn submit(&self, result: MatchResult) {
        info!(
            "Match recorded: {} beat {} ({}-{})",
            result.winner_name, result.loser_name, result.score_left, result.score_right
        );
    }
}

/// Hands results to another task over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<MatchResult>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<MatchResult>) -> Self {
        Self { tx }
    }
}

impl RecordSink for ChannelSink {
    fn submit(&self, result: MatchResult) {
        if let Err(e) = self.tx.send(result) {
            warn!("Failed to record match result: {}", e);
        }
    }
}
