use serde::{Deserialize, Serialize};

/// Dataset stroke label: unknown, 0 (no stroke) or 1 (stroke).
///
/// Serialized as `null`, `0` or `1` so the record store, the mirror
/// documents and the API all share one encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "Option<u8>", try_from = "Option<u8>")]
pub enum StrokeLabel {
    #[default]
    Unknown,
    NoStroke,
    Stroke,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid stroke label: {0:?} (expected \"\", \"None\", \"0\" or \"1\")")]
pub struct InvalidLabel(pub String);

impl StrokeLabel {
    /// Parse the form/CSV token. Absent, `""` and `"None"` mean unknown.
    pub fn parse_token(token: Option<&str>) -> Result<Self, InvalidLabel> {
        match token.map(str::trim) {
            None | Some("") | Some("None") => Ok(Self::Unknown),
            Some("0") => Ok(Self::NoStroke),
            Some("1") => Ok(Self::Stroke),
            Some(other) => Err(InvalidLabel(other.to_string())),
        }
    }

    pub fn as_db(&self) -> Option<i64> {
        match self {
            Self::Unknown => None,
            Self::NoStroke => Some(0),
            Self::Stroke => Some(1),
        }
    }

    pub fn from_db(value: Option<i64>) -> Result<Self, InvalidLabel> {
        match value {
            None => Ok(Self::Unknown),
            Some(0) => Ok(Self::NoStroke),
            Some(1) => Ok(Self::Stroke),
            Some(other) => Err(InvalidLabel(other.to_string())),
        }
    }
}

impl From<StrokeLabel> for Option<u8> {
    fn from(label: StrokeLabel) -> Self {
        label.as_db().map(|v| v as u8)
    }
}

impl TryFrom<Option<u8>> for StrokeLabel {
    type Error = InvalidLabel;

    fn try_from(value: Option<u8>) -> Result<Self, Self::Error> {
        Self::from_db(value.map(i64::from))
    }
}
