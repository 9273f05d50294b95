//! Backend-agnostic drawing: a state becomes a list of draw commands that
//! any front end (canvas, terminal, test) can replay.

use crate::input::Side;
use crate::sim::{GameConfig, SimState};

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear {
        width: f32,
        height: f32,
    },
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    },
    Circle {
        x: f32,
        y: f32,
        radius: f32,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
    Text {
        x: f32,
        y: f32,
        text: String,
    },
}

/// Display names of the two sides, left first.
#[derive(Debug, Clone, Copy)]
pub struct Names<'a> {
    pub left: &'a str,
    pub right: &'a str,
}

impl<'a> Names<'a> {
    pub fn of(&self, side: Side) -> &'a str {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

pub fn render(state: &SimState, config: &GameConfig, names: Names<'_>) -> Vec<DrawCommand> {
    let mut out = vec![DrawCommand::Clear {
        width: config.field_width,
        height: config.field_height,
    }];

    state.world.behavior().render(config, &mut out);

    let center = config.field_width / 2.0;
    out.push(DrawCommand::Text {
        x: center / 2.0,
        y: 30.0,
        text: format!("{} {}", names.left, state.score_left),
    });
    out.push(DrawCommand::Text {
        x: center + center / 2.0,
        y: 30.0,
        text: format!("{} {}", names.right, state.score_right),
    });

    let banner = if state.game_over {
        state
            .winner
            .map(|side| format!("{} wins!", names.of(side)))
    } else if state.is_paused {
        Some("Paused".to_string())
    } else if !state.game_started {
        Some("Waiting for both players".to_string())
    } else {
        None
    };

    if let Some(text) = banner {
        out.push(DrawCommand::Text {
            x: center,
            y: config.field_height / 2.0,
            text,
        });
    }

    out
}

/// Joins the text of every text command, for logging a frame.
pub fn describe(commands: &[DrawCommand]) -> String {
    commands
        .iter()
        .filter_map(|command| match command {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Variant;

    const NAMES: Names<'static> = Names {
        left: "Alice",
        right: "Bob",
    };

    #[test]
    fn test_waiting_banner_before_start() {
        let config = GameConfig::default();
        let frame = render(&SimState::initial(&config), &config, NAMES);

        assert!(matches!(frame[0], DrawCommand::Clear { .. }));
        assert_eq!(describe(&frame), "Alice 0 | Bob 0 | Waiting for both players");
    }

    #[test]
    fn test_running_frame_has_scores_only() {
        let config = GameConfig::for_variant(Variant::Space);
        let mut state = SimState::initial(&config);
        state.game_started = true;
        state.score_right = 4;

        assert_eq!(describe(&render(&state, &config, NAMES)), "Alice 0 | Bob 4");
    }

    #[test]
    fn test_paused_and_winner_banners() {
        let config = GameConfig::default();
        let mut state = SimState::initial(&config);
        state.game_started = true;
        state.is_paused = true;
        assert!(describe(&render(&state, &config, NAMES)).ends_with("Paused"));

        state.game_over = true;
        state.winner = Some(Side::Right);
        assert!(describe(&render(&state, &config, NAMES)).ends_with("Bob wins!"));
    }
}
