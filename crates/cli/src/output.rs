//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Spread shown around a point estimate
pub const ESTIMATE_SPREAD: f64 = 0.10;

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format an amount in Sri Lankan rupees, e.g. `Rs 4,250,000`
pub fn format_lkr(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if rounded < 0.0 {
        format!("-Rs {}", grouped)
    } else {
        format!("Rs {}", grouped)
    }
}

/// Low and high bounds of the estimate range
pub fn estimate_range(price: f64) -> (f64, f64) {
    (price * (1.0 - ESTIMATE_SPREAD), price * (1.0 + ESTIMATE_SPREAD))
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" => status.red().to_string(),
        _ => status.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_lkr_groups_thousands() {
        assert_eq!(format_lkr(0.0), "Rs 0");
        assert_eq!(format_lkr(999.0), "Rs 999");
        assert_eq!(format_lkr(1000.0), "Rs 1,000");
        assert_eq!(format_lkr(4_250_000.55), "Rs 4,250,001");
        assert_eq!(format_lkr(123_456_789.0), "Rs 123,456,789");
        assert_eq!(format_lkr(-50_000.0), "-Rs 50,000");
    }

    #[test]
    fn test_estimate_range() {
        let (low, high) = estimate_range(1_000_000.0);
        assert!((low - 900_000.0).abs() < 1e-6);
        assert!((high - 1_100_000.0).abs() < 1e-6);
    }
}
