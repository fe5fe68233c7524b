//! Prediction output formatting
//!
//! The trained model predicts in lakhs; responses are in currency units
//! rounded to cents. Rounding is decided on the exact binary value, so a
//! scaled price stored just below a half cent rounds down.

use crate::models::PricePrediction;

/// Currency units per lakh
pub const LAKH: f64 = 100_000.0;

/// Decimal places kept in the response
pub const PRICE_DECIMALS: usize = 2;

/// Converts raw pipeline output into the response value
#[derive(Debug, Clone, Copy)]
pub struct PriceFormatter {
    unit_scale: f64,
    decimals: usize,
}

impl PriceFormatter {
    pub fn new() -> Self {
        Self {
            unit_scale: LAKH,
            decimals: PRICE_DECIMALS,
        }
    }

    pub fn format(&self, raw_output: f64) -> PricePrediction {
        PricePrediction {
            predicted_price: self.round(raw_output * self.unit_scale),
        }
    }

    /// Non-finite values come back unchanged; callers decide how to treat them.
    fn round(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return value;
        }
        // Float formatting with a precision is correctly rounded; scaling by
        // 10^n first would round twice.
        format!("{:.*}", self.decimals, value)
            .parse()
            .unwrap_or(value)
    }
}

impl Default for PriceFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scales_lakhs_to_currency() {
        let formatter = PriceFormatter::new();
        assert_eq!(formatter.format(42.5).predicted_price, 4_250_000.0);
        assert_eq!(formatter.format(0.0).predicted_price, 0.0);
    }

    #[test]
    fn test_rounds_to_two_decimals() {
        let formatter = PriceFormatter::new();
        assert_eq!(formatter.format(1.234_567_89).predicted_price, 123_456.79);
        assert_eq!(formatter.format(0.000_001_234).predicted_price, 0.12);
    }

    #[test]
    fn test_rounds_on_exact_binary_value() {
        let formatter = PriceFormatter::new();
        // 792652.825 is stored just below its tie, 74641.575 just above
        assert_eq!(formatter.round(792_652.825), 792_652.82);
        assert_eq!(formatter.round(74_641.575), 74_641.58);
        assert_eq!(formatter.format(7.926_528_25).predicted_price, 792_652.82);
    }

    #[test]
    fn test_negative_output_preserved() {
        let formatter = PriceFormatter::new();
        assert_eq!(formatter.format(-0.5).predicted_price, -50_000.0);
    }

    #[test]
    fn test_non_finite_output_passes_through() {
        let formatter = PriceFormatter::new();
        assert!(formatter.format(f64::NAN).predicted_price.is_nan());
        assert_eq!(formatter.format(f64::INFINITY).predicted_price, f64::INFINITY);
    }
}
