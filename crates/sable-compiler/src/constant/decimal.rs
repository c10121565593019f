//! 96-bit scaled decimal used for `decimal` constants.
//!
//! The value is `mantissa / 10^scale` with `|mantissa| < 2^96` and
//! `scale <= 28`. Every operation is checked: a result that does not fit the
//! representation yields `None`.

use std::cmp::Ordering;
use std::fmt;

pub const MAX_SCALE: u8 = 28;
const MAX_MANTISSA: i128 = (1i128 << 96) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: i128,
    scale: u8,
}

fn pow10(exp: u8) -> i128 {
    10i128.pow(exp as u32)
}

impl Decimal {
    pub const ZERO: Decimal = Decimal {
        mantissa: 0,
        scale: 0,
    };

    /// Build a decimal, rejecting an out-of-range mantissa or scale.
    pub fn new(mantissa: i128, scale: u8) -> Option<Self> {
        if scale > MAX_SCALE || mantissa.abs() > MAX_MANTISSA {
            return None;
        }
        Some(Self { mantissa, scale })
    }

    pub fn from_i128(value: i128) -> Option<Self> {
        Self::new(value, 0)
    }

    /// Shortest decimal that round-trips the float, rounded to 28 places.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let text = format!("{value:e}");
        let (digits, exp) = text.split_once('e')?;
        let exp: i32 = exp.parse().ok()?;
        let negative = digits.starts_with('-');
        let digits = digits.trim_start_matches('-');
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
        let all: String = format!("{int_part}{frac_part}");
        let mut mantissa: i128 = all.parse().ok()?;
        // value = all * 10^(exp - frac_len)
        let mut power = exp - frac_part.len() as i32;
        if power > 0 {
            mantissa = mantissa.checked_mul(10i128.checked_pow(power as u32)?)?;
            power = 0;
        }
        let mut scale = (-power) as u32;
        while scale > MAX_SCALE as u32 {
            mantissa = round_div(mantissa, 10);
            scale -= 1;
        }
        if negative {
            mantissa = -mantissa;
        }
        Self::new(mantissa, scale as u8).map(Self::normalize)
    }

    pub fn mantissa(&self) -> i128 {
        self.mantissa
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    pub fn to_f64(&self) -> f64 {
        self.mantissa as f64 / 10f64.powi(self.scale as i32)
    }

    /// Integer part, truncated toward zero.
    pub fn trunc(&self) -> i128 {
        self.mantissa / pow10(self.scale)
    }

    /// Drop trailing zeros of the fractional part.
    pub fn normalize(self) -> Self {
        let mut d = self;
        while d.scale > 0 && d.mantissa % 10 == 0 {
            d.mantissa /= 10;
            d.scale -= 1;
        }
        d
    }

    /// Both operands at the larger scale.
    fn aligned(self, other: Self) -> Option<(i128, i128, u8)> {
        let scale = self.scale.max(other.scale);
        let rescale = |d: Decimal| d.mantissa.checked_mul(pow10(scale - d.scale));
        Some((rescale(self)?, rescale(other)?, scale))
    }

    /// Reduce a wide intermediate result until it fits.
    fn fit(mut mantissa: i128, mut scale: u8) -> Option<Self> {
        while mantissa.abs() > MAX_MANTISSA || scale > MAX_SCALE {
            if scale == 0 {
                return None;
            }
            mantissa = round_div(mantissa, 10);
            scale -= 1;
        }
        Some(Self { mantissa, scale })
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        let (a, b, scale) = self.aligned(other)?;
        Self::fit(a.checked_add(b)?, scale)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        let (a, b, scale) = self.aligned(other)?;
        Self::fit(a.checked_sub(b)?, scale)
    }

    pub fn checked_mul(self, other: Self) -> Option<Self> {
        let mantissa = self.mantissa.checked_mul(other.mantissa)?;
        Self::fit(mantissa, self.scale + other.scale)
    }

    /// Quotient carried to as many places as the representation allows.
    pub fn checked_div(self, other: Self) -> Option<Self> {
        if other.is_zero() {
            return None;
        }
        let (mut num, den, _) = self.aligned(other)?;
        let mut scale = 0u8;
        let mut quotient = num / den;
        let mut rem = num % den;
        while rem != 0 && scale < MAX_SCALE {
            num = match rem.checked_mul(10) {
                Some(n) => n,
                None => break,
            };
            let next = match quotient.checked_mul(10) {
                Some(q) if q.abs() <= MAX_MANTISSA => q,
                _ => break,
            };
            quotient = next + num / den;
            rem = num % den;
            scale += 1;
        }
        Self::fit(quotient, scale).map(Self::normalize)
    }

    pub fn checked_rem(self, other: Self) -> Option<Self> {
        if other.is_zero() {
            return None;
        }
        let (a, b, scale) = self.aligned(other)?;
        Self::fit(a % b, scale)
    }

    pub fn neg(self) -> Self {
        Self {
            mantissa: -self.mantissa,
            scale: self.scale,
        }
    }
}

fn round_div(value: i128, by: i128) -> i128 {
    let q = value / by;
    let r = value % by;
    if r.abs() * 2 >= by { q + value.signum() } else { q }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.aligned(*other) {
            Some((a, b, _)) => a.cmp(&b),
            None => self.to_f64().total_cmp(&other.to_f64()),
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.mantissa);
        }
        let divisor = pow10(self.scale);
        let sign = if self.mantissa < 0 { "-" } else { "" };
        let abs = self.mantissa.abs();
        write!(
            f,
            "{sign}{}.{:0width$}",
            abs / divisor,
            abs % divisor,
            width = self.scale as usize
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(mantissa: i128, scale: u8) -> Decimal {
        Decimal::new(mantissa, scale).unwrap()
    }

    #[test]
    fn add_aligns_scales() {
        let sum = dec(15, 1).checked_add(dec(25, 2)).unwrap();
        assert_eq!(sum.to_string(), "1.75");
    }

    #[test]
    fn mul_adds_scales() {
        let product = dec(15, 1).checked_mul(dec(2, 0)).unwrap();
        assert_eq!(product.normalize().to_string(), "3");
    }

    #[test]
    fn div_extends_scale() {
        let third = dec(1, 0).checked_div(dec(4, 0)).unwrap();
        assert_eq!(third.to_string(), "0.25");
        assert!(dec(1, 0).checked_div(Decimal::ZERO).is_none());
    }

    #[test]
    fn overflow_is_detected() {
        let max = dec(MAX_MANTISSA, 0);
        assert!(max.checked_add(dec(1, 0)).is_none());
        assert!(Decimal::new(MAX_MANTISSA + 1, 0).is_none());
    }

    #[test]
    fn from_f64_round_trips_short_values() {
        assert_eq!(Decimal::from_f64(1.5).unwrap().to_string(), "1.5");
        assert_eq!(Decimal::from_f64(-0.125).unwrap().to_string(), "-0.125");
        assert_eq!(Decimal::from_f64(1e3).unwrap().to_string(), "1000");
        assert!(Decimal::from_f64(f64::NAN).is_none());
        assert!(Decimal::from_f64(1e30).is_none());
    }

    #[test]
    fn ordering_ignores_scale() {
        assert_eq!(dec(10, 1).cmp(&dec(1, 0)), Ordering::Equal);
        assert!(dec(-5, 0) < dec(1, 3));
        assert_eq!(dec(1234, 2).trunc(), 12);
    }
}
