use std::cmp::Ordering;
use std::fmt;

/// Largest scale produced from a floating-point value.
pub const MAX_SCALE: u32 = 18;

const POWERS_OF_TEN: [u128; 39] = {
    let mut table = [1u128; 39];
    let mut i = 1;
    while i < table.len() {
        table[i] = table[i - 1] * 10;
        i += 1;
    }
    table
};

/// Rounding applied when a value loses fraction digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Nearest neighbour, ties away from zero.
    HalfUp,
    /// Nearest neighbour, ties towards zero.
    HalfDown,
    /// Towards negative infinity.
    Floor,
}

/// Fixed-point decimal: `unscaled * 10^-scale`.
///
/// Floating-point inputs are taken at their shortest round-trip decimal
/// representation, so `0.355` rounds as the decimal tie it prints as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    unscaled: i128,
    scale: u32,
}

/// Shortest decimal digits of a finite, non-negative `value` and their
/// power-of-ten exponent.
fn shortest_digits(value: f64) -> Option<(u128, i32)> {
    let mut buffer = ryu::Buffer::new();
    let text = buffer.format_finite(value);
    let (mantissa, exponent) = match text.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().ok()?),
        None => (text, 0),
    };
    let (integral, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let mut digits = 0u128;
    for byte in integral.bytes().chain(fraction.bytes()) {
        digits = digits.checked_mul(10)?.checked_add(u128::from(byte.checked_sub(b'0')?))?;
    }
    let fraction_len = i32::try_from(fraction.len()).ok()?;
    Some((digits, exponent - fraction_len))
}

/// Rounds the non-negative ratio `numerator / denominator` to an integer.
fn round_ratio(
    numerator: u128,
    denominator: u128,
    negative: bool,
    rounding: Rounding,
) -> u128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder == 0 {
        return quotient;
    }
    let half = (remainder * 2).cmp(&denominator);
    let bump = match rounding {
        Rounding::HalfUp => half != Ordering::Less,
        Rounding::HalfDown => half == Ordering::Greater,
        Rounding::Floor => negative,
    };
    quotient + u128::from(bump)
}

const fn signed(magnitude: u128, negative: bool) -> Option<i128> {
    if magnitude > i128::MAX as u128 {
        return None;
    }
    #[allow(clippy::cast_possible_wrap)]
    let value = magnitude as i128;
    Some(if negative { -value } else { value })
}

impl Decimal {
    pub const ZERO: Self = Self::new(0, 0);

    #[must_use]
    pub const fn new(unscaled: i128, scale: u32) -> Self {
        Self { unscaled, scale }
    }

    #[must_use]
    pub const fn from_int(value: i64) -> Self {
        Self::new(value as i128, 0)
    }

    #[must_use]
    pub const fn scale(self) -> u32 {
        self.scale
    }

    #[must_use]
    pub const fn unscaled(self) -> i128 {
        self.unscaled
    }

    /// `value` rounded to `scale` fraction digits.
    #[must_use]
    pub fn from_f64(value: f64, scale: u32, rounding: Rounding) -> Option<Self> {
        Self::from_f64_div(value, 1, scale, rounding)
    }

    /// `value / divisor` computed exactly from the decimal form of `value`,
    /// rounded to `scale` digits.
    #[must_use]
    pub fn from_f64_div(value: f64, divisor: u32, scale: u32, rounding: Rounding) -> Option<Self> {
        if !value.is_finite() || divisor == 0 || scale > MAX_SCALE {
            return None;
        }
        let negative = value < 0.0;
        let (digits, exponent) = shortest_digits(value.abs())?;
        let shift = exponent + i32::try_from(scale).ok()?;
        let divisor = u128::from(divisor);

        let magnitude = if shift >= 0 {
            let numerator = digits.checked_mul(*POWERS_OF_TEN.get(shift.unsigned_abs() as usize)?)?;
            round_ratio(numerator, divisor, negative, rounding)
        } else {
            match POWERS_OF_TEN
                .get(shift.unsigned_abs() as usize)
                .and_then(|power| power.checked_mul(divisor))
            {
                Some(denominator) => round_ratio(digits, denominator, negative, rounding),
                // Far below one unit at this scale.
                None => u128::from(negative && digits != 0 && rounding == Rounding::Floor),
            }
        };
        Some(Self::new(signed(magnitude, negative)?, scale))
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.unscaled == 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.unscaled < 0
    }

    #[must_use]
    pub const fn abs(self) -> Self {
        Self::new(self.unscaled.abs(), self.scale)
    }

    /// Changes the number of fraction digits, rounding when digits are dropped.
    #[must_use]
    pub fn rescale(self, scale: u32, rounding: Rounding) -> Self {
        match scale.cmp(&self.scale) {
            Ordering::Equal => self,
            Ordering::Greater => {
                let factor = POWERS_OF_TEN[(scale - self.scale) as usize] as i128;
                Self::new(self.unscaled * factor, scale)
            }
            Ordering::Less => {
                let divisor = POWERS_OF_TEN[(self.scale - scale) as usize];
                let negative = self.unscaled < 0;
                let magnitude = round_ratio(self.unscaled.unsigned_abs(), divisor, negative, rounding);
                Self::new(signed(magnitude, negative).unwrap_or(i128::MAX), scale)
            }
        }
    }

    fn aligned(self, other: Self) -> (i128, i128, u32) {
        let scale = self.scale.max(other.scale);
        (
            self.rescale(scale, Rounding::Floor).unscaled,
            other.rescale(scale, Rounding::Floor).unscaled,
            scale,
        )
    }

    #[must_use]
    pub fn sub(self, other: Self) -> Self {
        let (lhs, rhs, scale) = self.aligned(other);
        Self::new(lhs - rhs, scale)
    }

    #[must_use]
    pub fn add(self, other: Self) -> Self {
        let (lhs, rhs, scale) = self.aligned(other);
        Self::new(lhs + rhs, scale)
    }

    /// Truncating division by an integer: the quotient's integral part and the
    /// remainder (same sign as `self`, same scale).
    #[must_use]
    pub fn div_rem(self, divisor: i64) -> (i64, Self) {
        let scaled_divisor = i128::from(divisor) * POWERS_OF_TEN[self.scale as usize] as i128;
        let quotient = self.unscaled / scaled_divisor;
        let remainder = self.unscaled % scaled_divisor;
        #[allow(clippy::cast_possible_truncation)]
        (quotient as i64, Self::new(remainder, self.scale))
    }

    /// Remainder of truncating division, carrying the sign of `self`.
    #[must_use]
    pub fn rem(self, divisor: i64) -> Self {
        self.div_rem(divisor).1
    }

    /// Integral part rounded towards negative infinity.
    #[must_use]
    pub fn floor(self) -> i64 {
        #[allow(clippy::cast_possible_truncation)]
        let floor = self.rescale(0, Rounding::Floor).unscaled as i64;
        floor
    }

    /// Integral part rounded towards zero.
    #[must_use]
    pub const fn trunc(self) -> i64 {
        #[allow(clippy::cast_possible_truncation)]
        let trunc = (self.unscaled / POWERS_OF_TEN[self.scale as usize] as i128) as i64;
        trunc
    }

    /// Fraction digits as a string of exactly `digits` characters, truncated or
    /// zero-padded.
    #[must_use]
    pub fn fraction_digits(self, digits: usize) -> String {
        let fraction = self.unscaled.unsigned_abs() % POWERS_OF_TEN[self.scale as usize];
        let mut text = if self.scale == 0 {
            String::new()
        } else {
            format!("{fraction:0width$}", width = self.scale as usize)
        };
        if text.len() < digits {
            text.extend(std::iter::repeat_n('0', digits - text.len()));
        }
        text.truncate(digits);
        text
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(self) -> f64 {
        self.unscaled as f64 / POWERS_OF_TEN[self.scale as usize] as f64
    }

    #[must_use]
    pub fn cmp_value(self, other: Self) -> Ordering {
        let (lhs, rhs, _) = self.aligned(other);
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for Decimal {
    /// Plain notation with exactly `scale` fraction digits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let divisor = POWERS_OF_TEN[self.scale as usize];
        let magnitude = self.unscaled.unsigned_abs();
        if self.unscaled < 0 {
            f.write_str("-")?;
        }
        write!(f, "{}", magnitude / divisor)?;
        if self.scale > 0 {
            write!(
                f,
                ".{:0width$}",
                magnitude % divisor,
                width = self.scale as usize
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_the_printed_decimal_value() {
        // Stored as 394053550.35500001..., printed as 394053550.355.
        let up = Decimal::from_f64(394_053_550.355, 2, Rounding::HalfUp).unwrap();
        assert_eq!(up.to_string(), "394053550.36");
        let down = Decimal::from_f64(-394_053_550.355, 2, Rounding::HalfDown).unwrap();
        assert_eq!(down.to_string(), "-394053550.35");
        let rounded = Decimal::from_f64(395_163_560.356, 2, Rounding::HalfUp).unwrap();
        assert_eq!(rounded.to_string(), "395163560.36");
    }

    #[test]
    fn half_modes_differ_only_on_ties() {
        assert_eq!(Decimal::from_f64(2.5, 0, Rounding::HalfUp).unwrap().to_string(), "3");
        assert_eq!(Decimal::from_f64(2.5, 0, Rounding::HalfDown).unwrap().to_string(), "2");
        assert_eq!(Decimal::from_f64(-2.5, 0, Rounding::HalfDown).unwrap().to_string(), "-2");
        assert_eq!(Decimal::from_f64(-2.5, 0, Rounding::HalfUp).unwrap().to_string(), "-3");
        assert_eq!(Decimal::from_f64(2.75, 1, Rounding::HalfDown).unwrap().to_string(), "2.7");
        assert_eq!(Decimal::from_f64(2.76, 1, Rounding::HalfDown).unwrap().to_string(), "2.8");
    }

    #[test]
    fn floor_moves_negative_values_down() {
        let value = Decimal::new(-12_345, 3);
        assert_eq!(value.rescale(1, Rounding::Floor).to_string(), "-12.4");
        assert_eq!(value.floor(), -13);
        assert_eq!(value.trunc(), -12);
    }

    #[test]
    fn div_rem_keeps_dividend_sign() {
        let (q, r) = Decimal::new(-3_725_500, 3).div_rem(60);
        assert_eq!(q, -62);
        assert_eq!(r.to_string(), "-5.500");
        let (q, r) = Decimal::new(3_725_500, 3).div_rem(3600);
        assert_eq!(q, 1);
        assert_eq!(r.to_string(), "125.500");
    }

    #[test]
    fn division_by_integer_rounds_at_scale() {
        let minutes = Decimal::from_f64_div(90.0, 60, 2, Rounding::HalfUp).unwrap();
        assert_eq!(minutes.to_string(), "1.50");
    }

    #[test]
    fn tiny_values_round_to_zero() {
        let tiny = Decimal::from_f64(1e-300, 3, Rounding::HalfUp).unwrap();
        assert!(tiny.is_zero());
        let tiny = Decimal::from_f64(-1e-300, 0, Rounding::Floor).unwrap();
        assert_eq!(tiny.to_string(), "-1");
    }

    #[test]
    fn fraction_digits_pad_and_truncate() {
        let value = Decimal::new(59_125, 3);
        assert_eq!(value.fraction_digits(2), "12");
        assert_eq!(value.fraction_digits(5), "12500");
        assert_eq!(Decimal::from_int(7).fraction_digits(2), "00");
    }
}
