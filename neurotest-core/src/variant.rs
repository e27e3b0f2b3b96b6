use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ResponseButton;

/// The five reaction-time tests in the battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestVariant {
    DigitStroop,
    GoNoGo,
    SimonEffect,
    FlankerTask,
    DualTask,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "unknown test `{0}` (expected one of: digit-stroop, go-no-go, simon-effect, flanker-task, dual-task)"
)]
pub struct ParseVariantError(pub String);

impl TestVariant {
    pub const ALL: [TestVariant; 5] = [
        TestVariant::DigitStroop,
        TestVariant::GoNoGo,
        TestVariant::SimonEffect,
        TestVariant::FlankerTask,
        TestVariant::DualTask,
    ];

    /// Name stored in the `test` field of a results document.
    pub fn test_name(self) -> &'static str {
        match self {
            TestVariant::DigitStroop => "Digit Stroop",
            TestVariant::GoNoGo => "GoNoGo",
            TestVariant::SimonEffect => "SimonEffect",
            TestVariant::FlankerTask => "Flanker Task",
            TestVariant::DualTask => "DualTask",
        }
    }

    /// Command-line and file-name friendly identifier.
    pub fn slug(self) -> &'static str {
        match self {
            TestVariant::DigitStroop => "digit-stroop",
            TestVariant::GoNoGo => "go-no-go",
            TestVariant::SimonEffect => "simon-effect",
            TestVariant::FlankerTask => "flanker-task",
            TestVariant::DualTask => "dual-task",
        }
    }

    pub fn from_test_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.test_name() == name)
    }

    /// Whether `button` belongs to this variant's response space.
    pub fn accepts(self, button: ResponseButton) -> bool {
        use ResponseButton::*;
        match self {
            TestVariant::DigitStroop => matches!(button, Less | Equal | Greater),
            TestVariant::GoNoGo => matches!(button, Press),
            TestVariant::SimonEffect => matches!(button, Red | Blue),
            TestVariant::FlankerTask => matches!(button, Left | Right),
            TestVariant::DualTask => matches!(button, Press | One | Two | Three | NoNumber),
        }
    }

    pub fn is_compound(self) -> bool {
        matches!(self, TestVariant::DualTask)
    }
}

impl fmt::Display for TestVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.test_name())
    }
}

impl FromStr for TestVariant {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|v| {
                v.slug().eq_ignore_ascii_case(wanted) || v.test_name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| ParseVariantError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slugs_and_test_names() {
        assert_eq!("go-no-go".parse::<TestVariant>(), Ok(TestVariant::GoNoGo));
        assert_eq!(
            "Flanker Task".parse::<TestVariant>(),
            Ok(TestVariant::FlankerTask)
        );
        assert_eq!(
            "DIGIT-STROOP".parse::<TestVariant>(),
            Ok(TestVariant::DigitStroop)
        );
        assert!("stroop".parse::<TestVariant>().is_err());
    }

    #[test]
    fn test_names_round_trip() {
        for v in TestVariant::ALL {
            assert_eq!(TestVariant::from_test_name(v.test_name()), Some(v));
        }
    }

    #[test]
    fn response_spaces_are_disjoint_per_variant() {
        assert!(TestVariant::GoNoGo.accepts(ResponseButton::Press));
        assert!(!TestVariant::GoNoGo.accepts(ResponseButton::Left));
        assert!(TestVariant::SimonEffect.accepts(ResponseButton::Blue));
        assert!(!TestVariant::SimonEffect.accepts(ResponseButton::Press));
        assert!(TestVariant::DualTask.accepts(ResponseButton::NoNumber));
        assert!(!TestVariant::DigitStroop.accepts(ResponseButton::One));
    }
}
