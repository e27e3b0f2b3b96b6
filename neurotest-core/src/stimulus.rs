use serde::{Deserialize, Serialize};

use crate::TestVariant;

/// Number of symbols in a flanker row; the target sits in the middle.
pub const FLANKER_WIDTH: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StimulusType {
    /// Two digits side by side, each with its own font size.
    DigitPair {
        num1: u8,
        num2: u8,
        size1: f32,
        size2: f32,
    },
    Arrow {
        direction: ArrowDirection,
    },
    /// Colored square shown on one side of the screen.
    ColorPatch {
        color: StimulusColor,
        side: ScreenSide,
    },
    /// Row of arrows; only the central one is the target.
    FlankerRow {
        target: ArrowDirection,
        flanker: ArrowDirection,
    },
    /// Dual task: a number to remember (or none) and where the red flash appears.
    NumberFlash {
        number: Option<u8>,
        flash_side: ScreenSide,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrowDirection {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StimulusColor {
    Red,
    Blue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenSide {
    Left,
    Right,
}

impl ArrowDirection {
    pub fn name(self) -> &'static str {
        match self {
            ArrowDirection::Up => "up",
            ArrowDirection::Down => "down",
            ArrowDirection::Left => "left",
            ArrowDirection::Right => "right",
        }
    }

    pub fn symbol(self) -> char {
        match self {
            ArrowDirection::Up => '^',
            ArrowDirection::Down => 'v',
            ArrowDirection::Left => '<',
            ArrowDirection::Right => '>',
        }
    }
}

impl StimulusColor {
    pub fn name(self) -> &'static str {
        match self {
            StimulusColor::Red => "red",
            StimulusColor::Blue => "blue",
        }
    }

    pub fn rgba(self) -> [u8; 4] {
        match self {
            StimulusColor::Red => [220, 30, 30, 255],
            StimulusColor::Blue => [30, 60, 220, 255],
        }
    }
}

impl ScreenSide {
    pub fn name(self) -> &'static str {
        match self {
            ScreenSide::Left => "left",
            ScreenSide::Right => "right",
        }
    }
}

impl StimulusType {
    pub fn variant(&self) -> TestVariant {
        match self {
            StimulusType::DigitPair { .. } => TestVariant::DigitStroop,
            StimulusType::Arrow { .. } => TestVariant::GoNoGo,
            StimulusType::ColorPatch { .. } => TestVariant::SimonEffect,
            StimulusType::FlankerRow { .. } => TestVariant::FlankerTask,
            StimulusType::NumberFlash { .. } => TestVariant::DualTask,
        }
    }

    /// Text drawn for text-like stimuli.
    pub fn label(&self) -> Option<String> {
        match self {
            StimulusType::DigitPair { num1, num2, .. } => Some(format!("{num1}  {num2}")),
            StimulusType::FlankerRow { target, flanker } => {
                let mid = FLANKER_WIDTH / 2;
                Some(
                    (0..FLANKER_WIDTH)
                        .map(|i| {
                            if i == mid {
                                target.symbol()
                            } else {
                                flanker.symbol()
                            }
                        })
                        .collect(),
                )
            }
            StimulusType::NumberFlash {
                number: Some(n), ..
            } => Some(n.to_string()),
            _ => None,
        }
    }
}
