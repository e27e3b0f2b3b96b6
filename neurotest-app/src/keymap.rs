use neurotest_core::{ResponseButton, SessionPhase, TestVariant};
use winit::keyboard::KeyCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Begin,
    Respond(ResponseButton),
    Quit,
}

pub fn map_key(phase: SessionPhase, variant: TestVariant, key: KeyCode) -> Option<KeyAction> {
    if key == KeyCode::Escape {
        return Some(KeyAction::Quit);
    }
    match phase {
        SessionPhase::Welcome => (key == KeyCode::Space).then_some(KeyAction::Begin),
        SessionPhase::Running => response_for(variant, key).map(KeyAction::Respond),
        SessionPhase::Debrief => None,
    }
}

/// Keyboard binding of each test's response buttons.
pub fn response_for(variant: TestVariant, key: KeyCode) -> Option<ResponseButton> {
    use ResponseButton::*;
    let button = match (variant, key) {
        (TestVariant::DigitStroop, KeyCode::ArrowLeft) => Less,
        (TestVariant::DigitStroop, KeyCode::ArrowDown) => Equal,
        (TestVariant::DigitStroop, KeyCode::ArrowRight) => Greater,

        (TestVariant::GoNoGo, KeyCode::Space) => Press,

        (TestVariant::SimonEffect, KeyCode::KeyF) => Red,
        (TestVariant::SimonEffect, KeyCode::KeyJ) => Blue,

        (TestVariant::FlankerTask, KeyCode::ArrowLeft) => Left,
        (TestVariant::FlankerTask, KeyCode::ArrowRight) => Right,

        (TestVariant::DualTask, KeyCode::Space) => Press,
        (TestVariant::DualTask, KeyCode::Digit1 | KeyCode::Numpad1) => One,
        (TestVariant::DualTask, KeyCode::Digit2 | KeyCode::Numpad2) => Two,
        (TestVariant::DualTask, KeyCode::Digit3 | KeyCode::Numpad3) => Three,
        (TestVariant::DualTask, KeyCode::KeyX) => NoNumber,

        _ => return None,
    };
    Some(button)
}
