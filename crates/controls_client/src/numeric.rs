//! Text-to-number conversion with the leniency of a browser form.
//!
//! `parse_int("42px")` is `Some(42)` and `parse_int("px")` is `None`; `None`
//! is what ends up as `null` in the submitted JSON.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericPolicy {
    /// Unparseable input is submitted as `null`.
    #[default]
    Lenient,
    /// Unparseable input rejects the submit before any request is made.
    Strict,
}

impl FromStr for NumericPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(NumericPolicy::Lenient),
            "strict" => Ok(NumericPolicy::Strict),
            other => Err(format!("unknown numeric policy `{other}`")),
        }
    }
}

/// Base-10 integer prefix of `text`. Values outside `i64` yield `None`.
pub fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (sign, rest) = split_sign(text);
    let digits = leading_digits(rest);
    if digits == 0 {
        return None;
    }
    format!("{sign}{}", &rest[..digits]).parse().ok()
}

/// Decimal literal prefix of `text`, including `Infinity`.
pub fn parse_float(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let (sign, rest) = split_sign(text);
    if rest.starts_with("Infinity") {
        return Some(if sign == "-" {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    let int_digits = leading_digits(rest);
    let mut end = int_digits;
    let mut frac_digits = 0;
    if rest[end..].starts_with('.') {
        frac_digits = leading_digits(&rest[end + 1..]);
        end += 1 + frac_digits;
    }
    if int_digits + frac_digits == 0 {
        return None;
    }

    let mut mantissa = rest[..end].to_string();
    if int_digits == 0 {
        mantissa.insert(0, '0');
    }
    if mantissa.ends_with('.') {
        mantissa.push('0');
    }

    let exponent = exponent_suffix(&rest[end..]);
    format!("{sign}{mantissa}{exponent}").parse().ok()
}

fn split_sign(text: &str) -> (&'static str, &str) {
    if let Some(rest) = text.strip_prefix('-') {
        ("-", rest)
    } else if let Some(rest) = text.strip_prefix('+') {
        ("", rest)
    } else {
        ("", text)
    }
}

fn leading_digits(text: &str) -> usize {
    text.bytes().take_while(u8::is_ascii_digit).count()
}

// An exponent only counts when at least one digit follows the marker.
fn exponent_suffix(text: &str) -> &str {
    let Some(after_marker) = text.strip_prefix(['e', 'E']) else {
        return "";
    };
    let signed = usize::from(after_marker.starts_with(['+', '-']));
    let digits = leading_digits(&after_marker[signed..]);
    if digits == 0 {
        ""
    } else {
        &text[..1 + signed + digits]
    }
}

#[cfg(test)]
#[path = "tests/numeric_tests.rs"]
mod tests;
