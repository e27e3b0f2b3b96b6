use crate::{ScreenSide, StimulusType};

/// What should be on screen right now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scene<'a> {
    Blank,
    Fixation,
    Stimulus(&'a StimulusType),
    /// Dual task memory item; `None` shows an empty slot.
    DualNumber(Option<u8>),
    /// Dual task reflex phase; the red flash is only drawn while `flash_visible`.
    ReflexCue {
        side: ScreenSide,
        flash_visible: bool,
    },
    RecallPrompt,
    Done,
}
