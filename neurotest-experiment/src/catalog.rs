use neurotest_core::{
    ArrowDirection, ScreenSide, StimulusColor, StimulusType, TestVariant, TrialDefinition,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

/// (num1, num2, size1, size2)
const DIGIT_STROOP: [(u8, u8, f32, f32); 4] = [
    (1, 2, 48.0, 24.0),
    (3, 3, 36.0, 36.0),
    (4, 1, 24.0, 48.0),
    (2, 2, 48.0, 48.0),
];

const GO_TRIALS: usize = 8;
const NO_GO_TRIALS: usize = 2;

const SIMON: [(ScreenSide, StimulusColor); 4] = [
    (ScreenSide::Left, StimulusColor::Blue),
    (ScreenSide::Right, StimulusColor::Red),
    (ScreenSide::Left, StimulusColor::Red),
    (ScreenSide::Right, StimulusColor::Blue),
];

/// (target, flanker)
const FLANKER: [(ArrowDirection, ArrowDirection); 4] = [
    (ArrowDirection::Right, ArrowDirection::Right),
    (ArrowDirection::Left, ArrowDirection::Left),
    (ArrowDirection::Left, ArrowDirection::Right),
    (ArrowDirection::Right, ArrowDirection::Left),
];

const DUAL: [(Option<u8>, ScreenSide); 5] = [
    (Some(1), ScreenSide::Left),
    (Some(2), ScreenSide::Right),
    (Some(3), ScreenSide::Left),
    (None, ScreenSide::Right),
    (Some(2), ScreenSide::Left),
];

/// Compiled-in trial list of `variant`, in definition order.
pub fn catalog(variant: TestVariant) -> Vec<TrialDefinition> {
    let stimuli: Vec<StimulusType> = match variant {
        TestVariant::DigitStroop => DIGIT_STROOP
            .iter()
            .map(|&(num1, num2, size1, size2)| StimulusType::DigitPair {
                num1,
                num2,
                size1,
                size2,
            })
            .collect(),
        TestVariant::GoNoGo => std::iter::repeat_n(ArrowDirection::Up, GO_TRIALS)
            .chain(std::iter::repeat_n(ArrowDirection::Down, NO_GO_TRIALS))
            .map(|direction| StimulusType::Arrow { direction })
            .collect(),
        TestVariant::SimonEffect => SIMON
            .iter()
            .map(|&(side, color)| StimulusType::ColorPatch { color, side })
            .collect(),
        TestVariant::FlankerTask => FLANKER
            .iter()
            .map(|&(target, flanker)| StimulusType::FlankerRow { target, flanker })
            .collect(),
        TestVariant::DualTask => DUAL
            .iter()
            .map(|&(number, flash_side)| StimulusType::NumberFlash { number, flash_side })
            .collect(),
    };

    stimuli
        .into_iter()
        .enumerate()
        .map(|(id, stimulus)| TrialDefinition::new(id, stimulus))
        .collect()
}

/// Hands out the trial sequence for a run, optionally shuffled.
#[derive(Debug, Clone)]
pub struct TrialSetProvider {
    shuffle: bool,
    seed: Option<u64>,
}

impl Default for TrialSetProvider {
    fn default() -> Self {
        Self {
            shuffle: true,
            seed: None,
        }
    }
}

impl TrialSetProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the shuffle reproducible.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn get_trials(&self, variant: TestVariant) -> Vec<TrialDefinition> {
        let mut trials = catalog(variant);
        if self.shuffle {
            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            trials.shuffle(&mut rng);
        }
        debug!(
            test = variant.test_name(),
            count = trials.len(),
            shuffled = self.shuffle,
            seed = ?self.seed,
            "trial set prepared"
        );
        trials
    }
}
