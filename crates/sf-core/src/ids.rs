use core::fmt;
use core::str::FromStr;

use crate::error::SfError;

/// Identifier of one equation (or equation system) as assigned by the
/// upstream model compiler.
///
/// Ids are only stable within one generated model: regenerating the model may
/// renumber every equation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EquationId(u32);

impl EquationId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Directory-safe label used for persisted artifacts (`eq_14`).
    pub fn artifact_name(self) -> String {
        format!("eq_{}", self.0)
    }
}

impl From<u32> for EquationId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EquationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for EquationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accepts `14`, `E14`, `e14` and `eq_14`.
impl FromStr for EquationId {
    type Err = SfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("eq_")
            .or_else(|| trimmed.strip_prefix('E'))
            .or_else(|| trimmed.strip_prefix('e'))
            .unwrap_or(trimmed);
        digits
            .parse::<u32>()
            .map(Self)
            .map_err(|_| SfError::InvalidId {
                text: s.to_string(),
            })
    }
}
