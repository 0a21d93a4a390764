//! Exact decimal numbers
//!
//! A `Number` is `coefficient * 10^exponent` with an arbitrary precision
//! coefficient (dashu `IBig`). The pair is not normalised, so the scale of an
//! operand survives arithmetic: `1.50 + 2.5` is `4.00`, `2.50 * 2` is `5.00`.
//! Results are rounded half-even to `DEFAULT_PRECISION` significant digits
//! and must stay within `EXPONENT_LIMIT`.

use dashu_int::IBig;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::str::FromStr;
use thiserror::Error;

/// Error type for number operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumberError {
    #[error("Invalid number format: {0}")]
    ParseError(String),

    #[error("Cannot divide by zero.")]
    DivisionByZero,

    #[error("Domain error: {0}")]
    DomainError(String),

    #[error("Result out of range")]
    Overflow,
}

/// Significant decimal digits kept in results
pub const DEFAULT_PRECISION: usize = 50;

/// Bound on the adjusted exponent (position of the leading digit) of any
/// operand or result
pub const EXPONENT_LIMIT: i64 = 999_999;

/// Exact decimal number
///
/// All operations return Results or new Numbers - never panic.
#[derive(Debug, Clone)]
pub struct Number {
    coefficient: IBig,
    exponent: i64,
}

fn pow10(n: u64) -> IBig {
    IBig::from(10u8).pow(n as usize)
}

fn abs_int(n: &IBig) -> IBig {
    if *n < IBig::ZERO { -n } else { n.clone() }
}

fn digit_count(n: &IBig) -> i64 {
    abs_int(n).to_string().len() as i64
}

impl Number {
    // ========== Construction ==========

    fn from_parts(coefficient: IBig, exponent: i64) -> Self {
        Self { coefficient, exponent }
    }

    pub fn from_i64(n: i64) -> Self {
        Self::from_parts(IBig::from(n), 0)
    }

    pub fn zero() -> Self {
        Self::from_i64(0)
    }

    // ========== Predicates ==========

    pub fn is_zero(&self) -> bool {
        self.coefficient == IBig::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.coefficient < IBig::ZERO
    }

    pub fn is_integer(&self) -> bool {
        if self.is_zero() || self.exponent >= 0 {
            return true;
        }
        let shift = self.exponent.unsigned_abs();
        if shift as i64 > digit_count(&self.coefficient) {
            return false;
        }
        &self.coefficient % &pow10(shift) == IBig::ZERO
    }

    /// Exponent of the leading digit, e.g. 2 for `123` and -3 for `0.00450`
    fn adjusted(&self) -> i64 {
        self.exponent.saturating_add(digit_count(&self.coefficient) - 1)
    }

    fn signum(&self) -> i8 {
        match self.coefficient.cmp(&IBig::ZERO) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }

    /// Coefficient rewritten for a smaller exponent; `exponent <= self.exponent`
    fn rescaled(&self, exponent: i64) -> IBig {
        let shift = (self.exponent - exponent) as u64;
        &self.coefficient * pow10(shift)
    }

    // ========== Rounding ==========

    /// Round half-even to the working precision and enforce the exponent
    /// range. Zero clamps its exponent instead of failing.
    fn finish(self) -> Result<Self, NumberError> {
        if self.is_zero() {
            let exponent = self.exponent.clamp(-EXPONENT_LIMIT, EXPONENT_LIMIT);
            return Ok(Self::from_parts(IBig::ZERO, exponent));
        }

        let mut result = self;
        let excess = digit_count(&result.coefficient) - DEFAULT_PRECISION as i64;
        if excess > 0 {
            let negative = result.is_negative();
            let magnitude = abs_int(&result.coefficient);
            let divisor = pow10(excess as u64);
            let mut quotient = &magnitude / &divisor;
            let twice_rest = (&magnitude % &divisor) * IBig::from(2u8);
            let round_up = match twice_rest.cmp(&divisor) {
                Ordering::Greater => true,
                Ordering::Equal => &quotient % IBig::from(2u8) == IBig::ONE,
                Ordering::Less => false,
            };
            if round_up {
                quotient += IBig::ONE;
            }
            let mut exponent = result.exponent + excess;
            // 999..9 rounding up gains a digit
            if digit_count(&quotient) > DEFAULT_PRECISION as i64 {
                quotient = quotient / IBig::from(10u8);
                exponent += 1;
            }
            result = Self::from_parts(if negative { -quotient } else { quotient }, exponent);
        }

        let adjusted = result.adjusted();
        if adjusted > EXPONENT_LIMIT || adjusted < -EXPONENT_LIMIT {
            return Err(NumberError::Overflow);
        }
        Ok(result)
    }

    // ========== Basic Arithmetic ==========

    pub fn add(&self, other: &Self) -> Result<Self, NumberError> {
        if self.is_zero() || other.is_zero() {
            let exponent = self.exponent.min(other.exponent);
            let value = if self.is_zero() { other } else { self };
            if value.is_zero() {
                return Self::from_parts(IBig::ZERO, exponent).finish();
            }
            // A zero operand can only add scale, and no more than fits
            let exponent = exponent.max(value.exponent - DEFAULT_PRECISION as i64 - 1);
            return Self::from_parts(value.rescaled(exponent), exponent).finish();
        }

        // Order by exponent; an operand far below the other's last kept digit
        // only matters for rounding, so it shrinks to a single sticky digit.
        let (high, mut low) = if self.exponent >= other.exponent {
            (self, other.clone())
        } else {
            (other, self.clone())
        };
        let high_digits = digit_count(&high.coefficient);
        let floor = high.exponent + (-1).min(high_digits - DEFAULT_PRECISION as i64 - 2);
        if low.adjusted() < floor {
            let sticky = if low.is_negative() { -IBig::ONE } else { IBig::ONE };
            low = Self::from_parts(sticky, floor);
        }

        let exponent = low.exponent;
        let sum = high.rescaled(exponent) + &low.coefficient;
        Self::from_parts(sum, exponent).finish()
    }

    pub fn sub(&self, other: &Self) -> Result<Self, NumberError> {
        self.add(&other.neg())
    }

    pub fn mul(&self, other: &Self) -> Result<Self, NumberError> {
        let coefficient = &self.coefficient * &other.coefficient;
        Self::from_parts(coefficient, self.exponent + other.exponent).finish()
    }

    /// Division rounded to the working precision. Exact quotients keep the
    /// scale implied by the operands (`20 / 4` is `5`, `4.0 / 2` is `2.0`).
    pub fn checked_div(&self, other: &Self) -> Result<Self, NumberError> {
        if other.is_zero() {
            return Err(NumberError::DivisionByZero);
        }
        let ideal = self.exponent - other.exponent;
        if self.is_zero() {
            return Self::from_parts(IBig::ZERO, ideal).finish();
        }

        let negative = self.is_negative() != other.is_negative();
        let dividend = abs_int(&self.coefficient);
        let divisor = abs_int(&other.coefficient);

        let shift = digit_count(&divisor) - digit_count(&dividend) + DEFAULT_PRECISION as i64 + 1;
        let mut exponent = ideal - shift;
        let (mut quotient, remainder) = if shift >= 0 {
            let scaled = dividend * pow10(shift as u64);
            (&scaled / &divisor, &scaled % &divisor)
        } else {
            let scaled = divisor * pow10(shift.unsigned_abs());
            (&dividend / &scaled, &dividend % &scaled)
        };

        let ten = IBig::from(10u8);
        if remainder != IBig::ZERO {
            // Inexact: make sure the last digit is not a 0 or 5 so rounding
            // cannot mistake it for an exact tie
            if &quotient % IBig::from(5u8) == IBig::ZERO {
                quotient += IBig::ONE;
            }
        } else {
            while exponent < ideal && &quotient % &ten == IBig::ZERO {
                quotient = quotient / &ten;
                exponent += 1;
            }
        }

        Self::from_parts(if negative { -quotient } else { quotient }, exponent).finish()
    }

    /// Integer power by repeated squaring
    pub fn pow(&self, exp: i32) -> Result<Self, NumberError> {
        let mut result = Self::from_i64(1);
        let mut base = self.clone();
        let mut remaining = exp.unsigned_abs();

        while remaining > 0 {
            if remaining & 1 == 1 {
                result = result.mul(&base)?;
            }
            remaining >>= 1;
            if remaining > 0 {
                base = base.mul(&base)?;
            }
        }

        if exp < 0 {
            Self::from_i64(1).checked_div(&result)
        } else {
            Ok(result)
        }
    }

    pub fn neg(&self) -> Self {
        Self::from_parts(-&self.coefficient, self.exponent)
    }

    pub fn abs(&self) -> Self {
        Self::from_parts(abs_int(&self.coefficient), self.exponent)
    }

    // ========== Conversion ==========

    /// Try to convert to i64
    pub fn to_i64(&self) -> Option<i64> {
        if self.is_zero() {
            return Some(0);
        }
        if self.exponent >= 0 {
            let sig: i64 = self.coefficient.clone().try_into().ok()?;
            let scale = 10_i64.checked_pow(u32::try_from(self.exponent).ok()?)?;
            return sig.checked_mul(scale);
        }
        if !self.is_integer() {
            return None;
        }
        let whole = &self.coefficient / pow10(self.exponent.unsigned_abs());
        whole.try_into().ok()
    }

    /// Standard decimal string: plain notation while the exponent is not
    /// positive and the value is not tiny, scientific otherwise
    /// ("4.00", "0.25", "1.2E+3", "1E-7").
    pub fn to_sci_string(&self) -> String {
        let digits = abs_int(&self.coefficient).to_string();
        let len = digits.len() as i64;
        let left_digits = self.exponent + len;

        let dot = if self.exponent <= 0 && left_digits > -6 { left_digits } else { 1 };

        let (int_part, frac_part) = if dot <= 0 {
            ("0".to_string(), format!(".{}{}", "0".repeat(dot.unsigned_abs() as usize), digits))
        } else if dot >= len {
            (format!("{}{}", digits, "0".repeat((dot - len) as usize)), String::new())
        } else {
            let (int_part, frac_part) = digits.split_at(dot as usize);
            (int_part.to_string(), format!(".{}", frac_part))
        };

        let exp_part = if left_digits == dot {
            String::new()
        } else {
            format!("E{:+}", left_digits - dot)
        };
        let sign = if self.is_negative() { "-" } else { "" };
        format!("{}{}{}{}", sign, int_part, frac_part, exp_part)
    }
}

/// Accepts "123", "-3.14", "+7", "1.", ".5", "1.5e10", "602214076E15", with
/// surrounding whitespace. Rejects fractions, NaN, infinities, radix
/// prefixes and values whose magnitude is beyond `EXPONENT_LIMIT`.
impl FromStr for Number {
    type Err = NumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || NumberError::ParseError(s.to_string());

        let trimmed = s.trim();
        let (negative, unsigned) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let (mantissa, exp_text) = match unsigned.find(['e', 'E']) {
            Some(pos) => (&unsigned[..pos], Some(&unsigned[pos + 1..])),
            None => (unsigned, None),
        };
        let (int_digits, frac_digits) = mantissa.split_once('.').unwrap_or((mantissa, ""));

        let all_digits = |part: &str| part.bytes().all(|c| c.is_ascii_digit());
        if int_digits.len() + frac_digits.len() == 0 || !all_digits(int_digits) || !all_digits(frac_digits) {
            return Err(invalid());
        }

        let exp: i64 = match exp_text {
            Some(text) => {
                let unsigned_exp = text.strip_prefix(['+', '-']).unwrap_or(text);
                if unsigned_exp.is_empty() || !all_digits(unsigned_exp) {
                    return Err(invalid());
                }
                text.parse().map_err(|_| invalid())?
            }
            None => 0,
        };

        let digits = format!("{}{}", int_digits, frac_digits);
        let magnitude: IBig = digits.parse().map_err(|_| invalid())?;
        let exponent = exp.checked_sub(frac_digits.len() as i64).ok_or_else(invalid)?;

        let number = Self::from_parts(if negative { -magnitude } else { magnitude }, exponent);
        let magnitude_exp = if number.is_zero() { exponent } else { number.adjusted() };
        if magnitude_exp.unsigned_abs() > EXPONENT_LIMIT.unsigned_abs() {
            return Err(invalid());
        }
        Ok(number)
    }
}

// ========== Trait Implementations ==========

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_sci_string())
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_sci_string())
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Numeric equality: `2.0 == 2`
impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Number {}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        let (lhs, rhs) = (self.signum(), other.signum());
        if lhs != rhs || lhs == 0 {
            return lhs.cmp(&rhs);
        }

        let magnitude = match self.adjusted().cmp(&other.adjusted()) {
            Ordering::Equal => {
                // Same leading position: the exponent gap is bounded by the
                // coefficient lengths
                let exponent = self.exponent.min(other.exponent);
                abs_int(&self.rescaled(exponent)).cmp(&abs_int(&other.rescaled(exponent)))
            }
            unequal => unequal,
        };
        if lhs < 0 { magnitude.reverse() } else { magnitude }
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Self::from_i64(n)
    }
}
