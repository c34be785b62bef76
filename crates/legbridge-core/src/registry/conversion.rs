//! Parameter conversions
//!
//! Turns the textual parameter values received from callers into the single
//! bytes the board expects.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a parameter value cannot be converted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    /// The value is not a decimal integer
    #[error("not a number: {0:?}")]
    NotANumber(String),

    /// The value lies outside the accepted input range, or that range is empty
    #[error("value {value} out of range {start}..={end}")]
    OutOfRange {
        /// Value given by the caller
        value: i64,
        /// First accepted value
        start: i64,
        /// Last accepted value
        end: i64,
    },

    /// The mapped value does not fit in a data byte
    #[error("mapped value does not fit in a byte")]
    Overflow,
}

/// How a parameter value becomes a data byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conversion {
    /// Integer used as is, must fit 0..=255
    Byte,
    /// Integer linearly mapped from the input range onto the output range
    Range {
        /// Smallest accepted input
        in_start: i64,
        /// Largest accepted input
        in_end: i64,
        /// Byte sent for `in_start`
        out_start: i64,
        /// Byte sent for `in_end`
        out_end: i64,
    },
}

impl Conversion {
    /// Linear mapping with input range `in_start..=in_end`
    pub const fn range(in_start: i64, in_end: i64, out_start: i64, out_end: i64) -> Self {
        Conversion::Range {
            in_start,
            in_end,
            out_start,
            out_end,
        }
    }

    /// Linear mapping of a percentage (0..=100) onto the output range
    pub const fn percent(out_start: i64, out_end: i64) -> Self {
        Self::range(0, 100, out_start, out_end)
    }

    /// Parse and convert a raw parameter value
    pub fn convert(&self, raw: &str) -> Result<u8, ParamError> {
        let value: i64 = raw
            .parse()
            .map_err(|_| ParamError::NotANumber(raw.to_string()))?;

        match *self {
            Conversion::Byte => u8::try_from(value).map_err(|_| ParamError::OutOfRange {
                value,
                start: 0,
                end: 255,
            }),
            Conversion::Range {
                in_start,
                in_end,
                out_start,
                out_end,
            } => map_range(value, in_start, in_end, out_start, out_end),
        }
    }
}

/// Map `value` from `in_start..=in_end` onto `out_start..=out_end`.
///
/// Integer arithmetic truncating toward zero. The output range may be
/// inverted (`out_start > out_end`). An input range with
/// `in_start >= in_end` accepts no value at all.
pub fn map_range(
    value: i64,
    in_start: i64,
    in_end: i64,
    out_start: i64,
    out_end: i64,
) -> Result<u8, ParamError> {
    if in_start >= in_end || value < in_start || value > in_end {
        return Err(ParamError::OutOfRange {
            value,
            start: in_start,
            end: in_end,
        });
    }

    // Spans of i64 bounds need 65 bits; the product may exceed even i128.
    let out_span = i128::from(out_end) - i128::from(out_start);
    let in_span = i128::from(in_end) - i128::from(in_start);
    let offset = i128::from(value) - i128::from(in_start);
    let mapped = out_span
        .checked_mul(offset)
        .map(|scaled| i128::from(out_start) + scaled / in_span)
        .ok_or(ParamError::Overflow)?;
    u8::try_from(mapped).map_err(|_| ParamError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_mapping() {
        for x in 0..=100 {
            assert_eq!(map_range(x, 0, 100, 0, 100), Ok(x as u8));
        }
    }

    #[test]
    fn test_inverted_full_range() {
        assert_eq!(map_range(-100, -100, 100, 255, 1), Ok(255));
        assert_eq!(map_range(100, -100, 100, 255, 1), Ok(1));
        assert_eq!(map_range(0, -100, 100, 255, 1), Ok(128));
    }

    #[test]
    fn test_truncates_toward_zero() {
        // 60 * 130 / 100 = 78
        assert_eq!(map_range(60, 0, 100, 0, 130), Ok(78));
        // 1 * 130 / 100 = 1.3
        assert_eq!(map_range(1, 0, 100, 0, 130), Ok(1));
        // 255 + (-254 * 1) / 200 = 255 - 1.27
        assert_eq!(map_range(-99, -100, 100, 255, 1), Ok(254));
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(
            map_range(101, 0, 100, 0, 100),
            Err(ParamError::OutOfRange {
                value: 101,
                start: 0,
                end: 100
            })
        );
        assert!(map_range(-1, 0, 100, 0, 100).is_err());
    }

    #[test]
    fn test_empty_input_range() {
        assert_eq!(
            map_range(10, 10, 10, 0, 100),
            Err(ParamError::OutOfRange {
                value: 10,
                start: 10,
                end: 10
            })
        );
        assert!(matches!(
            map_range(50, 100, 0, 0, 100),
            Err(ParamError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_overflow() {
        assert_eq!(map_range(100, 0, 100, 0, 300), Err(ParamError::Overflow));
    }

    #[test]
    fn test_extreme_bounds_do_not_panic() {
        assert_eq!(map_range(0, i64::MIN, i64::MAX, i64::MIN, i64::MAX), Ok(0));
        assert_eq!(
            map_range(i64::MAX, i64::MIN, i64::MAX, i64::MIN, i64::MAX),
            Err(ParamError::Overflow)
        );
        assert_eq!(map_range(i64::MAX, i64::MIN, i64::MAX, 0, 255), Ok(255));
        assert_eq!(map_range(i64::MIN, i64::MIN, i64::MAX, 0, 255), Ok(0));
    }

    #[test]
    fn test_byte_conversion() {
        assert_eq!(Conversion::Byte.convert("0"), Ok(0));
        assert_eq!(Conversion::Byte.convert("255"), Ok(255));
        assert!(matches!(
            Conversion::Byte.convert("256"),
            Err(ParamError::OutOfRange { .. })
        ));
        assert!(matches!(
            Conversion::Byte.convert("-1"),
            Err(ParamError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_not_a_number() {
        assert_eq!(
            Conversion::percent(0, 130).convert("tall"),
            Err(ParamError::NotANumber("tall".to_string()))
        );
        assert!(Conversion::Byte.convert("").is_err());
        assert!(Conversion::Byte.convert("1.5").is_err());
    }

    #[test]
    fn test_percent_inverted() {
        // speed: 0% is the slowest step value
        let speed = Conversion::percent(100, 0);
        assert_eq!(speed.convert("0"), Ok(100));
        assert_eq!(speed.convert("100"), Ok(0));
        assert_eq!(speed.convert("25"), Ok(75));
    }
}
