//! Size values in image attributes (`width=50%`, `height=0.4`)

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{FilterError, Result};

static VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([0-9]+\.?[0-9]*)([a-z%]*)\s*$").unwrap());

/// Units a size can be expressed in; a bare number is a fraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Fraction,
    Percent,
}

impl Unit {
    fn parse(suffix: &str) -> Option<Self> {
        match suffix {
            "" | "fraction" => Some(Unit::Fraction),
            "%" => Some(Unit::Percent),
            _ => None,
        }
    }
}

/// Convert a size string to a value in `out` units
pub fn convert_units(value: &str, out: Unit) -> Result<f64> {
    let error = |message: &str| FilterError::Units {
        value: value.to_string(),
        message: message.to_string(),
    };
    let caps = VALUE_RE
        .captures(value)
        .ok_or_else(|| error("not a number with an optional unit"))?;
    let number: f64 = caps[1]
        .parse()
        .map_err(|_| error("not a number with an optional unit"))?;
    let unit = Unit::parse(&caps[2]).ok_or_else(|| error("no conversion for this unit"))?;
    Ok(match (unit, out) {
        (Unit::Percent, Unit::Fraction) => number / 100.0,
        (Unit::Fraction, Unit::Percent) => number * 100.0,
        _ => number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(convert_units("50%", Unit::Fraction).unwrap(), 0.5);
        assert_eq!(convert_units(" 0.5 ", Unit::Percent).unwrap(), 50.0);
        assert_eq!(convert_units("0.3", Unit::Fraction).unwrap(), 0.3);
        assert_eq!(convert_units("20%", Unit::Percent).unwrap(), 20.0);
    }

    #[test]
    fn test_rejects_unknown_units() {
        assert!(matches!(
            convert_units("10px", Unit::Fraction),
            Err(FilterError::Units { .. })
        ));
        assert!(convert_units("wide", Unit::Fraction).is_err());
    }
}
