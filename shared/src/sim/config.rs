use crate::{FIELD_HEIGHT, FIELD_WIDTH, REFERENCE_FRAME_SECS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const PONG_WIN_SCORE: u32 = 3;
pub const SPACE_WIN_SCORE: u32 = 10;

/// Largest frame factor a single step may apply.
pub const DEFAULT_MAX_FRAME_FACTOR: f32 = 3.0;

/// The game variants sharing the replication pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    Pong,
    Space,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown variant '{0}', expected 'pong' or 'space'")]
pub struct UnknownVariant(pub String);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidGameConfig {
    #[error("speed multiplier must be a finite number above zero, got {0}")]
    SpeedMultiplier(f32),
    #[error("win score must be at least 1")]
    WinScore,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Pong => f.write_str("pong"),
            Variant::Space => f.write_str("space"),
        }
    }
}

impl FromStr for Variant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pong" => Ok(Variant::Pong),
            "space" => Ok(Variant::Space),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// Parameters of one game, identical on both participants.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub variant: Variant,
    /// Score at which the game ends.
    pub win_score: u32,
    /// Scales ball, projectile and target speeds.
    pub speed_multiplier: f32,
    pub field_width: f32,
    pub field_height: f32,
    pub max_frame_factor: f32,
}

impl GameConfig {
    pub fn for_variant(variant: Variant) -> Self {
        let win_score = match variant {
            Variant::Pong => PONG_WIN_SCORE,
            Variant::Space => SPACE_WIN_SCORE,
        };

        Self {
            variant,
            win_score,
            speed_multiplier: 1.0,
            field_width: FIELD_WIDTH,
            field_height: FIELD_HEIGHT,
            max_frame_factor: DEFAULT_MAX_FRAME_FACTOR,
        }
    }

    pub fn with_speed_multiplier(
        mut self,
        speed_multiplier: f32,
    ) -> Result<Self, InvalidGameConfig> {
        if !speed_multiplier.is_finite() || speed_multiplier <= 0.0 {
            return Err(InvalidGameConfig::SpeedMultiplier(speed_multiplier));
        }
        self.speed_multiplier = speed_multiplier;
        Ok(self)
    }

    pub fn with_win_score(mut self, win_score: u32) -> Result<Self, InvalidGameConfig> {
        if win_score < 1 {
            return Err(InvalidGameConfig::WinScore);
        }
        self.win_score = win_score;
        Ok(self)
    }

    /// Converts wall-clock time since the previous step into reference
    /// frames (`elapsed / (1/60 s)`), capped at `max_frame_factor`.
    pub fn frame_factor(&self, elapsed: Duration) -> f32 {
        (elapsed.as_secs_f32() / REFERENCE_FRAME_SECS).min(self.max_frame_factor)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::for_variant(Variant::Pong)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_variant_defaults() {
        assert_eq!(GameConfig::for_variant(Variant::Pong).win_score, 3);
        assert_eq!(GameConfig::for_variant(Variant::Space).win_score, 10);
        assert_eq!(GameConfig::default().variant, Variant::Pong);
    }

    #[test]
    fn test_builder_overrides() {
        let config = GameConfig::for_variant(Variant::Space)
            .with_speed_multiplier(1.5)
            .and_then(|config| config.with_win_score(4))
            .unwrap();
        assert_eq!(config.win_score, 4);
        assert_approx_eq!(config.speed_multiplier, 1.5);
    }

    #[test]
    fn test_speed_multiplier_must_be_positive_and_finite() {
        for speed in [-1.0, 0.0, f32::NAN, f32::INFINITY] {
            let err = GameConfig::for_variant(Variant::Space)
                .with_speed_multiplier(speed)
                .unwrap_err();
            assert!(matches!(err, InvalidGameConfig::SpeedMultiplier(_)));
        }
        assert!(GameConfig::default().with_speed_multiplier(0.25).is_ok());
    }

    #[test]
    fn test_win_score_must_be_at_least_one() {
        assert_eq!(
            GameConfig::default().with_win_score(0),
            Err(InvalidGameConfig::WinScore)
        );
        assert_eq!(GameConfig::default().with_win_score(1).unwrap().win_score, 1);
    }

    #[test]
    fn test_frame_factor_normalizes_to_sixty_hz() {
        let config = GameConfig::default();
        assert_approx_eq!(config.frame_factor(Duration::from_secs_f64(1.0 / 60.0)), 1.0, 1e-4);
        assert_approx_eq!(config.frame_factor(Duration::from_secs_f64(1.0 / 120.0)), 0.5, 1e-4);
        assert_approx_eq!(config.frame_factor(Duration::from_millis(0)), 0.0);
    }

    #[test]
    fn test_frame_factor_is_capped() {
        let config = GameConfig::default();
        assert_approx_eq!(config.frame_factor(Duration::from_secs(2)), DEFAULT_MAX_FRAME_FACTOR);
    }

    #[test]
    fn test_variant_parse() {
        assert_eq!("Pong".parse::<Variant>(), Ok(Variant::Pong));
        assert_eq!("space".parse::<Variant>(), Ok(Variant::Space));
        assert!("chess".parse::<Variant>().is_err());
        assert_eq!(Variant::Space.to_string(), "space");
    }
}
