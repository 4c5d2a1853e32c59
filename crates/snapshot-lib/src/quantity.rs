//! Kubernetes resource quantities
//!
//! Parses the textual quantity notation (`80m`, `1Gi`, `1.5`, `2e3`) into an
//! exact fixed-point value with nano precision, and renders it back in a
//! canonical form. Precision finer than one nano is rounded away from zero,
//! mirroring the API server.
//!
//! Two encodings matter for snapshots:
//! - [`Quantity::to_string`] is the canonical *textual* form. It keeps the
//!   suffix family of the input (binary or decimal), so `1024Mi` prints as `1Gi`.
//! - [`Quantity::canonical_bytes`] is the *hashing* form. It depends on the value
//!   only, so `1Gi` and `1073741824` encode to the same bytes.

use crate::error::{Result, SnapshotError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Number of nano units in one whole unit
const NANO: i128 = 1_000_000_000;

/// Largest mantissa digit count that still fits an i128 after scaling
const MAX_DIGITS: usize = 36;

const DECIMAL_SUFFIXES: &[(&str, i32)] = &[
    ("n", -9),
    ("u", -6),
    ("m", -3),
    ("", 0),
    ("k", 3),
    ("M", 6),
    ("G", 9),
    ("T", 12),
    ("P", 15),
    ("E", 18),
];

const BINARY_SUFFIXES: &[&str] = &["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei"];

/// Suffix family a quantity was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Format {
    /// `m`, `k`, `M`, `G`, ...
    #[default]
    DecimalSI,
    /// `Ki`, `Mi`, `Gi`, ...
    BinarySI,
    /// `e3`, `E-2`, ...
    DecimalExponent,
}

/// Exact resource quantity.
///
/// Equality, ordering and hashing consider the numeric value only; the format
/// is presentation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quantity {
    nanos: i128,
    format: Format,
}

impl Quantity {
    /// Parse the textual quantity notation
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        if s.is_empty() {
            return Err(SnapshotError::invalid_quantity(input, "empty quantity"));
        }

        let (negative, rest) = match s.as_bytes()[0] {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };

        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, suffix) = rest.split_at(number_end);

        let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));
        if frac_part.contains('.') {
            return Err(SnapshotError::invalid_quantity(input, "more than one decimal point"));
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(SnapshotError::invalid_quantity(input, "missing digits"));
        }

        let (format, exp10, exp1024) = parse_suffix(suffix)
            .ok_or_else(|| SnapshotError::invalid_quantity(input, format!("unknown suffix {suffix:?}")))?;

        // Trailing fractional zeros and leading integer zeros carry no value.
        let frac_part = frac_part.trim_end_matches('0');
        let digits = format!("{int_part}{frac_part}");
        let digits = digits.trim_start_matches('0');
        if digits.len() > MAX_DIGITS {
            return Err(SnapshotError::invalid_quantity(input, "too many digits"));
        }
        let mantissa: i128 = if digits.is_empty() {
            0
        } else {
            digits
                .parse()
                .map_err(|e| SnapshotError::invalid_quantity(input, format!("{e}")))?
        };

        let out_of_range = || SnapshotError::invalid_quantity(input, "value out of range");

        let mut value = mantissa
            .checked_mul(1024i128.pow(exp1024))
            .ok_or_else(out_of_range)?;

        // Zero stays zero under any exponent.
        if value != 0 {
            let scale = 9 + i64::from(exp10) - frac_part.len() as i64;
            let power = u32::try_from(scale.unsigned_abs())
                .ok()
                .and_then(|p| 10i128.checked_pow(p))
                .ok_or_else(out_of_range)?;
            value = if scale >= 0 {
                value.checked_mul(power).ok_or_else(out_of_range)?
            } else {
                div_away_from_zero(value, power)
            };
        }

        Ok(Self {
            nanos: if negative { -value } else { value },
            format,
        })
    }

    /// Build a quantity from whole units
    pub fn from_units(value: i64, format: Format) -> Self {
        Self {
            nanos: i128::from(value) * NANO,
            format,
        }
    }

    /// Build a quantity from thousandths of a unit (`250` → `250m`)
    pub fn from_millis(millis: i64) -> Self {
        Self {
            nanos: i128::from(millis) * 1_000_000,
            format: Format::DecimalSI,
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn is_zero(&self) -> bool {
        self.nanos == 0
    }

    pub fn is_negative(&self) -> bool {
        self.nanos < 0
    }

    /// Value in whole units, rounded away from zero
    pub fn value(&self) -> i128 {
        div_away_from_zero(self.nanos, NANO)
    }

    /// Value in thousandths, rounded away from zero
    pub fn milli_value(&self) -> i128 {
        div_away_from_zero(self.nanos, 1_000_000)
    }

    pub fn as_f64(&self) -> f64 {
        self.nanos as f64 / NANO as f64
    }

    /// Format-independent encoding used when hashing.
    ///
    /// The value is written as `<mantissa>e<exponent>` with trailing decimal
    /// zeros folded into the exponent, so every equal value has one encoding.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        if self.nanos == 0 {
            return b"0".to_vec();
        }
        let mut mantissa = self.nanos;
        let mut exponent = -9;
        while mantissa % 10 == 0 {
            mantissa /= 10;
            exponent += 1;
        }
        format!("{mantissa}e{exponent}").into_bytes()
    }

    fn display_format(&self) -> Format {
        match self.format {
            Format::BinarySI if self.nanos.abs() < 1024 * NANO || self.nanos % NANO != 0 => {
                Format::DecimalSI
            }
            other => other,
        }
    }
}

/// Parse a quantity and return its normalized form
pub fn as_quantity(input: &str) -> Result<Quantity> {
    normalize_quantity(&Quantity::parse(input)?)
}

/// Re-parse the canonical text of `q`.
///
/// Normalization is idempotent: normalizing a normalized quantity yields an
/// identical value and identical text.
pub fn normalize_quantity(q: &Quantity) -> Result<Quantity> {
    Quantity::parse(&q.to_string())
}

/// Parse a trusted literal into a normalized quantity.
///
/// # Panics
///
/// Panics when `input` is not a valid quantity. Only use this for constants
/// and tests, never for data read from a cluster or a file.
pub fn must_parse_quantity(input: &str) -> Quantity {
    match as_quantity(input) {
        Ok(q) => q,
        Err(e) => panic!("must_parse_quantity({input:?}): {e}"),
    }
}

fn parse_suffix(suffix: &str) -> Option<(Format, i32, u32)> {
    if let Some((_, exp)) = DECIMAL_SUFFIXES.iter().find(|(s, _)| *s == suffix) {
        return Some((Format::DecimalSI, *exp, 0));
    }
    if let Some(pos) = BINARY_SUFFIXES.iter().skip(1).position(|s| *s == suffix) {
        return Some((Format::BinarySI, 0, pos as u32 + 1));
    }
    // A lone `E` is exa and was matched above; `E3`/`e-2` are exponents.
    let exponent = suffix
        .strip_prefix('e')
        .or_else(|| suffix.strip_prefix('E'))?;
    let exp: i32 = exponent.parse().ok()?;
    Some((Format::DecimalExponent, exp, 0))
}

fn div_away_from_zero(value: i128, divisor: i128) -> i128 {
    let quotient = value / divisor;
    if value % divisor == 0 {
        quotient
    } else if value < 0 {
        quotient - 1
    } else {
        quotient + 1
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nanos == 0 {
            return f.write_str("0");
        }
        match self.display_format() {
            Format::BinarySI => {
                let mut units = self.nanos / NANO;
                let mut power = 0;
                while power < BINARY_SUFFIXES.len() - 1 && units % 1024 == 0 {
                    units /= 1024;
                    power += 1;
                }
                write!(f, "{}{}", units, BINARY_SUFFIXES[power])
            }
            format => {
                let mut mantissa = self.nanos;
                let mut exponent = -9;
                while exponent < 18 && mantissa % 1000 == 0 {
                    mantissa /= 1000;
                    exponent += 3;
                }
                if format == Format::DecimalExponent {
                    if exponent == 0 {
                        write!(f, "{mantissa}")
                    } else {
                        write!(f, "{mantissa}e{exponent}")
                    }
                } else {
                    let suffix = DECIMAL_SUFFIXES
                        .iter()
                        .find(|(_, exp)| *exp == exponent)
                        .map(|(s, _)| *s)
                        .unwrap_or_default();
                    write!(f, "{mantissa}{suffix}")
                }
            }
        }
    }
}

impl FromStr for Quantity {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&k8s_openapi::apimachinery::pkg::api::resource::Quantity> for Quantity {
    type Error = SnapshotError;

    fn try_from(q: &k8s_openapi::apimachinery::pkg::api::resource::Quantity) -> Result<Self> {
        Self::parse(&q.0)
    }
}

impl From<Quantity> for k8s_openapi::apimachinery::pkg::api::resource::Quantity {
    fn from(q: Quantity) -> Self {
        Self(q.to_string())
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.nanos == other.nanos
    }
}

impl Eq for Quantity {}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.nanos.cmp(&other.nanos)
    }
}

impl std::hash::Hash for Quantity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.nanos.hash(state);
    }
}

// A zero receiver adopts the other operand's format, like the API machinery.
impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Self) {
        if self.nanos == 0 {
            self.format = rhs.format;
        }
        self.nanos = self.nanos.saturating_add(rhs.nanos);
    }
}

impl SubAssign for Quantity {
    fn sub_assign(&mut self, rhs: Self) {
        if self.nanos == 0 {
            self.format = rhs.format;
        }
        self.nanos = self.nanos.saturating_sub(rhs.nanos);
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    fn sub(mut self, rhs: Self) -> Self::Output {
        self -= rhs;
        self
    }
}

impl Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Self::Output {
        Self {
            nanos: -self.nanos,
            format: self.format,
        }
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Quantity::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> Quantity {
        Quantity::parse(s).unwrap()
    }

    #[test]
    fn test_parse_decimal_suffixes() {
        assert_eq!(q("80m").milli_value(), 80);
        assert_eq!(q("2").value(), 2);
        assert_eq!(q("1.5").milli_value(), 1500);
        assert_eq!(q("3k").value(), 3000);
        assert_eq!(q("100u").to_string(), "100u");
        assert_eq!(q("-250m").milli_value(), -250);
        assert_eq!(q(".5").milli_value(), 500);
    }

    #[test]
    fn test_parse_binary_suffixes() {
        assert_eq!(q("1Ki").value(), 1024);
        assert_eq!(q("1Gi").value(), 1 << 30);
        assert_eq!(q("1.5Gi").value(), 3 << 29);
        assert_eq!(q("1Gi").format(), Format::BinarySI);
    }

    #[test]
    fn test_parse_exponent() {
        assert_eq!(q("1e3").value(), 1000);
        assert_eq!(q("1E3").value(), 1000);
        assert_eq!(q("5e-3").milli_value(), 5);
        // A lone E is the exa suffix, not an exponent
        assert_eq!(q("1E").value(), 1_000_000_000_000_000_000);
        assert_eq!(q("2e3").format(), Format::DecimalExponent);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "abc", "1.2.3", "1Qi", "1e", "--1", "."] {
            assert!(Quantity::parse(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_parse_rejects_out_of_range_exponents() {
        for bad in [
            "1e2147483647",
            "-1e2147483647",
            "1e40",
            "1e-2147483648",
            "0.0000000001e-2147483648",
        ] {
            match Quantity::parse(bad) {
                Err(SnapshotError::InvalidQuantity { .. }) => {}
                other => panic!("{bad:?} should be out of range, got {other:?}"),
            }
        }
        assert!(Quantity::parse("0e2147483647").unwrap().is_zero());
        assert!(Quantity::parse("0e-2147483648").unwrap().is_zero());
        assert_eq!(q("1e-18"), q("1n"));
    }

    #[test]
    fn test_sub_nano_precision_rounds_up() {
        assert_eq!(q("0.0000000001").to_string(), "1n");
        assert_eq!(q("-0.0000000001").to_string(), "-1n");
    }

    #[test]
    fn test_canonical_text() {
        assert_eq!(q("1024Mi").to_string(), "1Gi");
        assert_eq!(q("1536Mi").to_string(), "1536Mi");
        assert_eq!(q("1000").to_string(), "1k");
        assert_eq!(q("1500").to_string(), "1500");
        assert_eq!(q("0.5").to_string(), "500m");
        assert_eq!(q("3.72").to_string(), "3720m");
        assert_eq!(q("0Gi").to_string(), "0");
        // Small or fractional binary values fall back to decimal notation
        assert_eq!(q("0.5Ki").to_string(), "512");
        assert_eq!(q("1.5Ki").to_string(), "1536");
        assert_eq!(q("2e3").to_string(), "2e3");
    }

    #[test]
    fn test_canonical_bytes_ignore_format() {
        assert_eq!(q("1Gi").canonical_bytes(), q("1073741824").canonical_bytes());
        assert_eq!(q("1024Mi").canonical_bytes(), q("1Gi").canonical_bytes());
        assert_eq!(q("1k").canonical_bytes(), q("1e3").canonical_bytes());
        assert_eq!(q("0.1").canonical_bytes(), q("100m").canonical_bytes());
        assert_ne!(q("1k").canonical_bytes(), q("1Ki").canonical_bytes());
        assert_eq!(q("0").canonical_bytes(), b"0".to_vec());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in ["1024Mi", "0.5", "1500", "80m", "1.5Gi", "12e6", "0.5Ki", "-3k", "100Gi"] {
            let once = as_quantity(input).unwrap();
            let twice = normalize_quantity(&once).unwrap();
            assert_eq!(once, twice, "{input}");
            assert_eq!(once.to_string(), twice.to_string(), "{input}");
        }
    }

    #[test]
    fn test_arithmetic_keeps_receiver_format() {
        let mut mem = q("16Gi");
        mem -= q("500Mi");
        assert_eq!(mem.format(), Format::BinarySI);
        assert_eq!(mem.to_string(), "15884Mi");

        let mut zero = Quantity::default();
        zero += q("1Gi");
        assert_eq!(zero.format(), Format::BinarySI);
        assert_eq!(zero.to_string(), "1Gi");
    }

    #[test]
    fn test_subtraction_may_go_negative() {
        let cpu = q("100m") - q("250m");
        assert!(cpu.is_negative());
        assert_eq!(cpu.to_string(), "-150m");
    }

    #[test]
    fn test_equality_ignores_format() {
        assert_eq!(q("1Ki"), q("1024"));
        assert!(q("1Gi") > q("1G"));
    }

    #[test]
    fn test_serde_uses_canonical_text() {
        let json = serde_json::to_string(&q("2048Ki")).unwrap();
        assert_eq!(json, "\"2Mi\"");
        let back: Quantity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q("2Mi"));
        assert!(serde_json::from_str::<Quantity>("\"nope\"").is_err());
    }

    #[test]
    #[should_panic(expected = "must_parse_quantity")]
    fn test_must_parse_panics_on_garbage() {
        must_parse_quantity("12 apples");
    }
}
