use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

/// Marker appended after all data in 64-bit files.
pub const CDB64_MAGIC: &[u8; 8] = b"cdb64:01";

/// Field-width selection for a database file.
///
/// `Bits32` is the standard format readable by every CDB implementation.
/// `Bits64` doubles every length and pointer field and appends
/// [`CDB64_MAGIC`] so readers can tell the two apart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Mode {
    #[default]
    Bits32,
    Bits64,
}

impl Mode {
    /// The mode as a bit count (32 or 64).
    pub const fn bits(self) -> u32 {
        match self {
            Self::Bits32 => 32,
            Self::Bits64 => 64,
        }
    }

    /// Infer the mode from the last eight bytes of a file.
    pub fn detect(trailer: &[u8]) -> Self {
        if trailer == CDB64_MAGIC {
            Self::Bits64
        } else {
            Self::Bits32
        }
    }
}

impl TryFrom<u32> for Mode {
    type Error = LayoutError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            32 => Ok(Self::Bits32),
            64 => Ok(Self::Bits64),
            other => Err(LayoutError::InvalidMode(other)),
        }
    }
}

impl From<Mode> for u32 {
    fn from(mode: Mode) -> Self {
        mode.bits()
    }
}

impl FromStr for Mode {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits = s
            .trim()
            .trim_end_matches("bit")
            .parse::<u32>()
            .map_err(|_| LayoutError::UnknownMode(s.to_owned()))?;
        Self::try_from(bits)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bit", self.bits())
    }
}
