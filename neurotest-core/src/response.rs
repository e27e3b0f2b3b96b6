use serde::{Deserialize, Serialize};

/// Logical button activated by the subject. Where the event came from
/// (keyboard, pointer, touch) is not represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseButton {
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "pressed")]
    Press,
    #[serde(rename = "red")]
    Red,
    #[serde(rename = "blue")]
    Blue,
    #[serde(rename = "left")]
    Left,
    #[serde(rename = "right")]
    Right,
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "no-number")]
    NoNumber,
}

impl ResponseButton {
    pub const ALL: [ResponseButton; 12] = [
        ResponseButton::Less,
        ResponseButton::Equal,
        ResponseButton::Greater,
        ResponseButton::Press,
        ResponseButton::Red,
        ResponseButton::Blue,
        ResponseButton::Left,
        ResponseButton::Right,
        ResponseButton::One,
        ResponseButton::Two,
        ResponseButton::Three,
        ResponseButton::NoNumber,
    ];

    /// Recall answer that names `number`; `None` maps to [`ResponseButton::NoNumber`].
    pub fn recall_for(number: Option<u8>) -> Option<Self> {
        match number {
            None => Some(ResponseButton::NoNumber),
            Some(1) => Some(ResponseButton::One),
            Some(2) => Some(ResponseButton::Two),
            Some(3) => Some(ResponseButton::Three),
            Some(_) => None,
        }
    }

    pub fn is_recall(self) -> bool {
        matches!(
            self,
            ResponseButton::One
                | ResponseButton::Two
                | ResponseButton::Three
                | ResponseButton::NoNumber
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            ResponseButton::Less => "<",
            ResponseButton::Equal => "=",
            ResponseButton::Greater => ">",
            ResponseButton::Press => "pressed",
            ResponseButton::Red => "red",
            ResponseButton::Blue => "blue",
            ResponseButton::Left => "left",
            ResponseButton::Right => "right",
            ResponseButton::One => "1",
            ResponseButton::Two => "2",
            ResponseButton::Three => "3",
            ResponseButton::NoNumber => "no-number",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recall_mapping() {
        assert_eq!(ResponseButton::recall_for(None), Some(ResponseButton::NoNumber));
        assert_eq!(ResponseButton::recall_for(Some(2)), Some(ResponseButton::Two));
        assert_eq!(ResponseButton::recall_for(Some(7)), None);
        assert!(ResponseButton::Three.is_recall());
        assert!(!ResponseButton::Press.is_recall());
    }

    #[test]
    fn serializes_as_label() {
        for b in ResponseButton::ALL {
            let json = serde_json::to_string(&b).unwrap();
            assert_eq!(json, format!("\"{}\"", b.label()));
        }
    }
}
