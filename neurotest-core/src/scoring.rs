//! Per-variant correctness rules.

use std::cmp::Ordering;

use crate::{ArrowDirection, ResponseButton, StimulusColor, StimulusType};

/// The single correct answer for `stimulus`, or `None` when withholding a
/// response is the correct behaviour (a No-Go trial).
pub fn expected_response(stimulus: &StimulusType) -> Option<ResponseButton> {
    match stimulus {
        StimulusType::DigitPair { num1, num2, .. } => Some(match num1.cmp(num2) {
            Ordering::Less => ResponseButton::Less,
            Ordering::Equal => ResponseButton::Equal,
            Ordering::Greater => ResponseButton::Greater,
        }),
        StimulusType::Arrow { direction } => {
            (*direction == ArrowDirection::Up).then_some(ResponseButton::Press)
        }
        StimulusType::ColorPatch { color, .. } => Some(match color {
            StimulusColor::Red => ResponseButton::Red,
            StimulusColor::Blue => ResponseButton::Blue,
        }),
        StimulusType::FlankerRow { target, .. } => match target {
            ArrowDirection::Left => Some(ResponseButton::Left),
            ArrowDirection::Right => Some(ResponseButton::Right),
            ArrowDirection::Up | ArrowDirection::Down => None,
        },
        StimulusType::NumberFlash { number, .. } => ResponseButton::recall_for(*number),
    }
}

/// Scores a captured response (or its absence) against `stimulus`.
pub fn is_correct(stimulus: &StimulusType, response: Option<ResponseButton>) -> bool {
    match stimulus {
        StimulusType::Arrow { direction } => {
            (*direction == ArrowDirection::Up) == (response == Some(ResponseButton::Press))
        }
        _ => match (expected_response(stimulus), response) {
            (Some(expected), Some(given)) => expected == given,
            _ => false,
        },
    }
}
