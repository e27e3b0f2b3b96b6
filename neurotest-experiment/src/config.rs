use neurotest_core::TestVariant;

/// Timing contract of one test variant. All values are milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantTimings {
    /// Blank wait between run start and the first fixation.
    pub lead_in_ms: u64,
    pub fixation_ms: u64,
    /// How long the stimulus stays on screen; `None` keeps it until the trial ends.
    pub exposure_ms: Option<u64>,
    /// Response budget counted from stimulus onset; `None` waits for input.
    pub response_window_ms: Option<u64>,
    /// When false the trial always runs until the window closes, even after a response.
    pub ends_on_response: bool,
    pub dual: Option<DualTimings>,
}

/// Extra phases of the compound dual task.
#[derive(Debug, Clone, PartialEq)]
pub struct DualTimings {
    pub number_ms: u64,
    /// Inclusive range for the randomized delay before the red flash.
    pub secondary_delay_ms: (u64, u64),
    pub flash_ms: u64,
    /// Bound on the reflex wait; `None` waits for the key press.
    pub reflex_window_ms: Option<u64>,
}

impl Default for DualTimings {
    fn default() -> Self {
        Self {
            number_ms: 1000,
            secondary_delay_ms: (350, 500),
            flash_ms: 150,
            reflex_window_ms: None,
        }
    }
}

impl VariantTimings {
    pub fn for_variant(variant: TestVariant) -> Self {
        let until_response = Self {
            lead_in_ms: 2000,
            fixation_ms: 1000,
            exposure_ms: None,
            response_window_ms: None,
            ends_on_response: true,
            dual: None,
        };

        match variant {
            TestVariant::DigitStroop => Self {
                lead_in_ms: 0,
                ..until_response
            },
            TestVariant::GoNoGo => Self {
                exposure_ms: Some(200),
                response_window_ms: Some(1000),
                ends_on_response: false,
                ..until_response
            },
            TestVariant::SimonEffect | TestVariant::FlankerTask => until_response,
            TestVariant::DualTask => Self {
                lead_in_ms: 0,
                dual: Some(DualTimings::default()),
                ..until_response
            },
        }
    }

    pub fn with_lead_in(mut self, ms: u64) -> Self {
        self.lead_in_ms = ms;
        self
    }
}
