//! Number formatting with a fixed count of significant digits

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_SIGNIFICANT_DIGITS;

/// How numbers are rendered to text
///
/// Rendering keeps at most `significant_digits` digits, switches to
/// exponent notation for very small or very large magnitudes, and trims
/// trailing zeros. Parsing the output recovers the value to within the
/// same precision, not bit for bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberFormat {
    pub significant_digits: usize,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            significant_digits: DEFAULT_SIGNIFICANT_DIGITS,
        }
    }
}

impl NumberFormat {
    pub fn new(significant_digits: usize) -> Self {
        Self {
            significant_digits: significant_digits.max(1),
        }
    }

    /// Render a single number
    pub fn format(&self, value: f64) -> String {
        if value.is_nan() {
            return "NaN".to_string();
        }
        if value.is_infinite() {
            return if value > 0.0 { "inf" } else { "-inf" }.to_string();
        }
        if value == 0.0 {
            return "0".to_string();
        }

        let digits = self.significant_digits.max(1);
        // Round first so the exponent reflects any carry (9.99999 -> 1.0000e1)
        let scientific = format!("{:.*e}", digits - 1, value);
        let Some((mantissa, exponent)) = scientific.split_once('e') else {
            return scientific;
        };
        let exponent: i32 = exponent.parse().unwrap_or(0);

        if exponent < -5 || exponent >= digits as i32 {
            format!("{}e{}", trim_fraction(mantissa), exponent)
        } else {
            let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
            trim_fraction(&format!("{:.*}", decimals, value)).to_string()
        }
    }

    /// Render numbers separated by single spaces
    pub fn format_array(&self, values: &[f64]) -> String {
        values
            .iter()
            .map(|v| self.format(*v))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Largest relative error introduced by [`NumberFormat::format`]
    pub fn tolerance(&self) -> f64 {
        10f64.powi(1 - self.significant_digits.max(1) as i32)
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_trims_trailing_zeros() {
        let fmt = NumberFormat::default();
        assert_eq!(fmt.format(1.0), "1");
        assert_eq!(fmt.format(0.0), "0");
        assert_eq!(fmt.format(-0.0), "0");
        assert_eq!(fmt.format(0.25), "0.25");
        assert_eq!(fmt.format(-1.5), "-1.5");
    }

    #[test]
    fn test_format_rounds_to_significant_digits() {
        let fmt = NumberFormat::default();
        assert_eq!(fmt.format(3.14159265), "3.1416");
        assert_eq!(fmt.format(12345.678), "12346");
        assert_eq!(fmt.format(9.999999), "10");
        assert_eq!(fmt.format(0.000123456), "0.00012346");
    }

    #[test]
    fn test_format_switches_to_exponent() {
        let fmt = NumberFormat::default();
        assert_eq!(fmt.format(123456.0), "1.2346e5");
        assert_eq!(fmt.format(0.0000012), "1.2e-6");
        assert_eq!("1.2346e5".parse::<f64>().unwrap(), 123460.0);
    }

    #[test]
    fn test_format_array() {
        let fmt = NumberFormat::default();
        assert_eq!(fmt.format_array(&[1.0, 0.0, 0.0, 1.0]), "1 0 0 1");
    }

    #[test]
    fn test_custom_precision() {
        let fmt = NumberFormat::new(3);
        assert_eq!(fmt.format(3.14159), "3.14");
        assert_eq!(fmt.format(1234.0), "1.23e3");
        assert!((fmt.tolerance() - 0.01).abs() < 1e-12);
    }
}
