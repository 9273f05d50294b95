use shared::GameConfig;

/// Everything a participant needs before it joins.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Identifier sent with `join`; unique within the relay's waiting pool.
    pub player_id: String,
    /// Human-readable name used for score display and results.
    pub display_name: String,
    pub game: GameConfig,
    /// Seeds the host simulation for reproducible runs.
    pub seed: Option<u64>,
}

impl PeerConfig {
    pub fn new(
        player_id: impl Into<String>,
        display_name: impl Into<String>,
        game: GameConfig,
    ) -> Self {
        Self {
            player_id: player_id.into(),
            display_name: display_name.into(),
            game,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
