// amount.rs
//
// Fixed-point amount <-> human decimal string conversion.
// - Parsing is permissive: malformed input degrades to zero, never errors
// - Rendering groups the integer part by 3 and truncates (never rounds up)

use num_bigint::BigUint;
use num_traits::Zero;
use rust_decimal::{Decimal, RoundingStrategy};

const GROUPING_SIZE: usize = 3;

/// Locale-dependent separators used to read and render amounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountFormatter {
    pub decimal_separator: String,
    pub group_separator: String,
}

impl Default for AmountFormatter {
    fn default() -> Self {
        Self {
            decimal_separator: ".".to_string(),
            group_separator: " ".to_string(),
        }
    }
}

impl AmountFormatter {
    pub fn new(decimal_separator: impl Into<String>, group_separator: impl Into<String>) -> Self {
        Self {
            decimal_separator: decimal_separator.into(),
            group_separator: group_separator.into(),
        }
    }

    /// Strip grouping separators (and any whitespace) from user input.
    pub fn unformat(&self, text: &str) -> String {
        let without_groups = if self.group_separator.is_empty() {
            text.to_string()
        } else {
            text.replace(&self.group_separator, "")
        };
        without_groups.chars().filter(|c| !c.is_whitespace()).collect()
    }

    /// Parse a decimal string into an integer amount scaled to `target_fraction_digits`.
    ///
    /// Empty input, more than one decimal separator or any non-digit character yields
    /// a zero amount. Fractional digits beyond the target precision are dropped.
    pub fn string_to_amount(&self, text: &str, target_fraction_digits: usize) -> (BigUint, usize) {
        let zero = (BigUint::zero(), target_fraction_digits);

        let cleaned = self.unformat(text);
        if cleaned.is_empty() {
            return zero;
        }

        let components: Vec<&str> = cleaned.split(self.decimal_separator.as_str()).collect();
        if components.len() > 2 {
            return zero;
        }

        let integer_part = components[0];
        let fraction_part: String = components
            .get(1)
            .map(|f| f.chars().take(target_fraction_digits).collect())
            .unwrap_or_default();

        let padding = "0".repeat(target_fraction_digits - fraction_part.chars().count());
        let digits = format!("{}{}{}", integer_part, fraction_part, padding);

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return zero;
        }

        match BigUint::parse_bytes(digits.as_bytes(), 10) {
            Some(value) => (value, target_fraction_digits),
            None => zero,
        }
    }

    /// Render a fixed-point amount with `fraction_digits` of precision.
    ///
    /// `maximum_fraction_digits` limits the displayed fraction (truncating); trailing
    /// fractional zeros are never shown.
    pub fn amount_to_string(
        &self,
        amount: &BigUint,
        fraction_digits: usize,
        maximum_fraction_digits: Option<usize>,
    ) -> String {
        let digits = amount.to_str_radix(10);

        let (integer_part, fraction_part) = if fraction_digits == 0 {
            (digits, String::new())
        } else {
            let padded = if digits.len() <= fraction_digits {
                format!("{}{}", "0".repeat(fraction_digits - digits.len() + 1), digits)
            } else {
                digits
            };
            let split_at = padded.len() - fraction_digits;
            (padded[..split_at].to_string(), padded[split_at..].to_string())
        };

        let max_digits = maximum_fraction_digits
            .unwrap_or(fraction_digits)
            .min(fraction_digits);
        let fraction_display = fraction_part[..max_digits].trim_end_matches('0');

        self.join_parts(&integer_part, fraction_display)
    }

    /// Render a decimal ratio (swap rate, price impact) rounded toward zero.
    pub fn format_decimal(&self, value: Decimal, maximum_fraction_digits: u32) -> String {
        let rounded = value
            .round_dp_with_strategy(maximum_fraction_digits, RoundingStrategy::ToZero)
            .normalize();

        let rendered = rounded.abs().to_string();
        let (integer_part, fraction_part) = match rendered.split_once('.') {
            Some((i, f)) => (i.to_string(), f.to_string()),
            None => (rendered, String::new()),
        };

        let joined = self.join_parts(&integer_part, &fraction_part);
        if rounded.is_sign_negative() && !rounded.is_zero() {
            format!("-{}", joined)
        } else {
            joined
        }
    }

    fn join_parts(&self, integer_part: &str, fraction_part: &str) -> String {
        let grouped = self.group_integer(integer_part);
        if fraction_part.is_empty() {
            grouped
        } else {
            format!("{}{}{}", grouped, self.decimal_separator, fraction_part)
        }
    }

    fn group_integer(&self, digits: &str) -> String {
        let digits = digits.trim_start_matches('0');
        if digits.is_empty() {
            return "0".to_string();
        }

        let len = digits.len();
        let mut grouped =
            String::with_capacity(len + len / GROUPING_SIZE * self.group_separator.len());
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (len - i) % GROUPING_SIZE == 0 {
                grouped.push_str(&self.group_separator);
            }
            grouped.push(ch);
        }
        grouped
    }
}
