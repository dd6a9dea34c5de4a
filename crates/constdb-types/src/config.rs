use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::mode::Mode;

/// Default target load of each slot table.
pub const DEFAULT_HASH_FILL_FACTOR: f64 = 0.7;

/// Configuration for building a database file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Field widths of the file to write.
    pub mode: Mode,
    /// How full each slot table may get, in `(0, 1]`.
    ///
    /// Lower values mean fewer collisions and shorter probes at the cost of a
    /// larger file; `1.0` packs every table completely.
    pub hash_fill_factor: f64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Bits32,
            hash_fill_factor: DEFAULT_HASH_FILL_FACTOR,
        }
    }
}

impl WriterConfig {
    pub fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        let f = self.hash_fill_factor;
        if !f.is_finite() || f <= 0.0 || f > 1.0 {
            return Err(LayoutError::InvalidFillFactor(f));
        }
        Ok(())
    }
}

/// Configuration for opening a database file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Required mode, or `None` to detect it from the file trailer.
    pub mode: Option<Mode>,
    /// Whether to memory-map named files.
    pub mmap: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self::detect()
    }
}

impl ReaderConfig {
    /// Detect the mode and use a memory map when possible.
    pub fn detect() -> Self {
        Self {
            mode: None,
            mmap: true,
        }
    }

    pub fn with_mode(mode: Mode) -> Self {
        Self {
            mode: Some(mode),
            mmap: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_writer_config() {
        let c = WriterConfig::default();
        assert_eq!(c.mode, Mode::Bits32);
        assert_eq!(c.hash_fill_factor, 0.7);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn fill_factor_bounds() {
        let mut c = WriterConfig::with_mode(Mode::Bits64);
        c.hash_fill_factor = 1.0;
        assert!(c.validate().is_ok());

        for bad in [0.0, -0.5, 1.01, f64::NAN, f64::INFINITY] {
            c.hash_fill_factor = bad;
            assert!(matches!(
                c.validate(),
                Err(LayoutError::InvalidFillFactor(_))
            ));
        }
    }

    #[test]
    fn writer_config_from_json() {
        let c: WriterConfig = serde_json::from_str(r#"{"mode": 64}"#).unwrap();
        assert_eq!(c.mode, Mode::Bits64);
        assert_eq!(c.hash_fill_factor, DEFAULT_HASH_FILL_FACTOR);

        assert!(serde_json::from_str::<WriterConfig>(r#"{"mode": 16}"#).is_err());
    }

    #[test]
    fn reader_config_detects_by_default() {
        let c: ReaderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(c, ReaderConfig::detect());
        assert!(c.mmap);

        let c: ReaderConfig = serde_json::from_str(r#"{"mode": 64, "mmap": false}"#).unwrap();
        assert_eq!(c.mode, Some(Mode::Bits64));
        assert!(!c.mmap);
        assert_eq!(ReaderConfig::with_mode(Mode::Bits32).mode, Some(Mode::Bits32));
    }
}
