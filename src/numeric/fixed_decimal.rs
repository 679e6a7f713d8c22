// ============================================================================
// Fixed-Point Decimal
// Exact fixed-point arithmetic for prices and volumes
// ============================================================================

use super::errors::{NumericError, NumericResult};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Neg;

/// Fixed-point decimal number with compile-time precision.
///
/// Internally stores `value × 10^DECIMALS` as an i64, so repeated partial
/// fills accumulate without floating-point drift.
///
/// # Example
/// ```ignore
/// use limit_order_book::numeric::FixedDecimal;
///
/// let price = FixedDecimal::<4>::from_integer(100)?;  // 100.0000
/// let qty = "2.5".parse::<FixedDecimal<8>>()?;        // 2.50000000
/// ```
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct FixedDecimal<const DECIMALS: u8>(i64);

/// Compute 10^n at compile time
const fn pow10(n: u8) -> i64 {
    let mut result: i64 = 1;
    let mut i = 0;
    while i < n {
        result *= 10;
        i += 1;
    }
    result
}

impl<const D: u8> FixedDecimal<D> {
    /// The scale factor (10^DECIMALS)
    pub const SCALE: i64 = pow10(D);

    /// Zero value
    pub const ZERO: Self = Self(0);

    /// One (1.0)
    pub const ONE: Self = Self(pow10(D));

    /// Maximum representable value. Doubles as the `+inf` price sentinel.
    pub const MAX: Self = Self(i64::MAX);

    /// Minimum representable value. Doubles as the `-inf` price sentinel.
    pub const MIN: Self = Self(i64::MIN);

    // ========================================================================
    // Construction
    // ========================================================================

    /// Create from raw internal representation.
    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Create from an integer value.
    ///
    /// # Errors
    /// Returns `Overflow` if the value is too large to represent.
    #[inline]
    pub fn from_integer(value: i64) -> NumericResult<Self> {
        value
            .checked_mul(Self::SCALE)
            .map(Self)
            .ok_or(NumericError::Overflow)
    }

    /// Create from integer and fractional parts.
    ///
    /// `fraction` is expressed in units of 10^-DECIMALS and must be below `SCALE`.
    #[inline]
    pub fn from_parts(integer: i64, fraction: u64) -> NumericResult<Self> {
        if fraction >= Self::SCALE as u64 {
            return Err(NumericError::InvalidInput);
        }

        let int_scaled = integer
            .checked_mul(Self::SCALE)
            .ok_or(NumericError::Overflow)?;

        let frac_signed = if integer < 0 {
            -(fraction as i64)
        } else {
            fraction as i64
        };

        int_scaled
            .checked_add(frac_signed)
            .map(Self)
            .ok_or(NumericError::Overflow)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Get the raw internal value (scaled).
    #[inline]
    pub const fn raw_value(self) -> i64 {
        self.0
    }

    /// Get the integer part (truncated toward zero).
    #[inline]
    pub const fn integer_part(self) -> i64 {
        self.0 / Self::SCALE
    }

    /// Get the fractional part as a positive value.
    #[inline]
    pub const fn fractional_part(self) -> u64 {
        (self.0 % Self::SCALE).unsigned_abs()
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// True for either infinity sentinel.
    #[inline]
    pub const fn is_sentinel(self) -> bool {
        self.0 == i64::MAX || self.0 == i64::MIN
    }

    // ========================================================================
    // Arithmetic Operations
    // ========================================================================

    /// Checked addition.
    #[inline]
    pub fn checked_add(self, rhs: Self) -> NumericResult<Self> {
        self.0.checked_add(rhs.0).map(Self).ok_or({
            if rhs.0 > 0 {
                NumericError::Overflow
            } else {
                NumericError::Underflow
            }
        })
    }

    /// Checked subtraction.
    #[inline]
    pub fn checked_sub(self, rhs: Self) -> NumericResult<Self> {
        self.0.checked_sub(rhs.0).map(Self).ok_or({
            if rhs.0 < 0 {
                NumericError::Overflow
            } else {
                NumericError::Underflow
            }
        })
    }

    /// Subtraction clamped at zero. Used for remaining-volume computations
    /// where a negative result means "nothing left".
    #[inline]
    pub fn saturating_sub_to_zero(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0).max(0))
    }

    /// Raw product of two fixed-point values of possibly different scales.
    ///
    /// The result carries `D + E` implied decimals and is held in an i128 so
    /// that notional sums over many fills cannot overflow.
    #[inline]
    pub fn weighted_product<const E: u8>(self, weight: FixedDecimal<E>) -> i128 {
        (self.0 as i128) * (weight.raw_value() as i128)
    }

    /// Inverse of [`weighted_product`](Self::weighted_product) summed over
    /// many terms: divides a `D + E` scaled sum by a total weight, rounding
    /// half away from zero.
    pub fn from_weighted_average<const E: u8>(
        weighted_sum: i128,
        total_weight: FixedDecimal<E>,
    ) -> NumericResult<Self> {
        let divisor = total_weight.raw_value() as i128;
        if divisor == 0 {
            return Err(NumericError::DivisionByZero);
        }

        let mut quotient = weighted_sum / divisor;
        let remainder = weighted_sum % divisor;
        if remainder.abs() * 2 >= divisor.abs() {
            if (weighted_sum < 0) == (divisor < 0) {
                quotient += 1;
            } else {
                quotient -= 1;
            }
        }

        if quotient > i64::MAX as i128 {
            Err(NumericError::Overflow)
        } else if quotient < i64::MIN as i128 {
            Err(NumericError::Underflow)
        } else {
            Ok(Self(quotient as i64))
        }
    }

    #[inline]
    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    #[inline]
    pub fn max(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }
}

// ============================================================================
// Trait Implementations
// ============================================================================

impl<const D: u8> Default for FixedDecimal<D> {
    #[inline]
    fn default() -> Self {
        Self::ZERO
    }
}

impl<const D: u8> PartialEq for FixedDecimal<D> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<const D: u8> Eq for FixedDecimal<D> {}

impl<const D: u8> PartialOrd for FixedDecimal<D> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<const D: u8> Ord for FixedDecimal<D> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<const D: u8> Hash for FixedDecimal<D> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<const D: u8> Neg for FixedDecimal<D> {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl<const D: u8> std::iter::Sum for FixedDecimal<D> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|v| v.0).sum())
    }
}

// ============================================================================
// Display and Debug
// ============================================================================

impl<const D: u8> fmt::Debug for FixedDecimal<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            i64::MAX => write!(f, "FixedDecimal<{}>(+inf)", D),
            i64::MIN => write!(f, "FixedDecimal<{}>(-inf)", D),
            raw => write!(f, "FixedDecimal<{}>({}, raw={})", D, self, raw),
        }
    }
}

impl<const D: u8> fmt::Display for FixedDecimal<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let int_part = self.integer_part();
        let frac_part = self.fractional_part();

        if D == 0 {
            write!(f, "{}", int_part)
        } else if self.0 < 0 && int_part == 0 {
            write!(f, "-0.{:0>width$}", frac_part, width = D as usize)
        } else {
            write!(f, "{}.{:0>width$}", int_part, frac_part, width = D as usize)
        }
    }
}

// ============================================================================
// Conversion from rust_decimal (for API boundaries)
// ============================================================================

impl<const D: u8> FixedDecimal<D> {
    /// Convert from rust_decimal::Decimal, failing on any precision loss.
    pub fn from_decimal(d: rust_decimal::Decimal) -> NumericResult<Self> {
        use rust_decimal::prelude::ToPrimitive;

        let scaled = d
            .checked_mul(rust_decimal::Decimal::from(Self::SCALE))
            .ok_or(NumericError::Overflow)?;

        if scaled.fract() != rust_decimal::Decimal::ZERO {
            return Err(NumericError::PrecisionLoss);
        }

        scaled.to_i64().map(Self).ok_or(NumericError::Overflow)
    }

    /// Convert from rust_decimal::Decimal, rounding half away from zero to
    /// `DECIMALS` places. This is how venue prices and sizes are normalised
    /// on ingestion.
    pub fn from_decimal_rounded(d: rust_decimal::Decimal) -> NumericResult<Self> {
        let rounded = d.round_dp_with_strategy(
            D as u32,
            rust_decimal::RoundingStrategy::MidpointAwayFromZero,
        );
        Self::from_decimal(rounded)
    }

    /// Convert to rust_decimal::Decimal.
    pub fn to_decimal(self) -> rust_decimal::Decimal {
        rust_decimal::Decimal::new(self.0, D as u32)
    }
}

// ============================================================================
// String Parsing
// ============================================================================

impl<const D: u8> std::str::FromStr for FixedDecimal<D> {
    type Err = NumericError;

    /// Parse from a decimal string such as `"123"`, `"4.5"` or `"-0.001"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(NumericError::InvalidInput);
        }

        let (is_negative, s) = if let Some(rest) = s.strip_prefix('-') {
            (true, rest)
        } else {
            (false, s)
        };

        let (int_str, frac_str) = match s.split_once('.') {
            Some((int_str, frac_str)) => (int_str, Some(frac_str)),
            None => (s, None),
        };

        let int_val: i64 = if int_str.is_empty() {
            0
        } else {
            int_str.parse().map_err(|_| NumericError::InvalidInput)?
        };

        let frac_val: u64 = match frac_str {
            None | Some("") => 0,
            Some(frac) if frac.len() > D as usize => return Err(NumericError::PrecisionLoss),
            Some(frac) => {
                let padded = format!("{:0<width$}", frac, width = D as usize);
                padded.parse().map_err(|_| NumericError::InvalidInput)?
            },
        };

        let result = Self::from_parts(int_val, frac_val)?;
        Ok(if is_negative { -result } else { result })
    }
}

// ============================================================================
// Serde (string representation, exact round trip)
// ============================================================================

#[cfg(feature = "serde")]
impl<const D: u8> serde::Serialize for FixedDecimal<D> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de, const D: u8> serde::Deserialize<'de> for FixedDecimal<D> {
    fn deserialize<De: serde::Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Type Aliases
// ============================================================================

/// Price with 4 decimal places
pub type Price = FixedDecimal<4>;

/// Volume with 8 decimal places
pub type Quantity = FixedDecimal<8>;

#[cfg(test)]
mod tests {
    use super::*;

    type FD4 = FixedDecimal<4>;
    type FD8 = FixedDecimal<8>;

    #[test]
    fn test_constants() {
        assert_eq!(FD4::SCALE, 10_000);
        assert_eq!(FD8::SCALE, 100_000_000);
        assert_eq!(FD8::ONE.raw_value(), 100_000_000);
    }

    #[test]
    fn test_from_parts() {
        let x = FD4::from_parts(123, 4567).unwrap();
        assert_eq!(x.to_string(), "123.4567");

        let y = FD4::from_parts(-5, 5000).unwrap();
        assert_eq!(y.integer_part(), -5);
        assert!(y.is_negative());

        assert_eq!(FD4::from_parts(1, 10_000), Err(NumericError::InvalidInput));
    }

    #[test]
    fn test_checked_add_and_sub() {
        let a = FD8::from_integer(100).unwrap();
        let b = FD8::from_integer(30).unwrap();
        assert_eq!(a.checked_add(b).unwrap().integer_part(), 130);
        assert_eq!(b.checked_sub(a).unwrap().integer_part(), -70);

        assert_eq!(FD8::MAX.checked_add(FD8::ONE), Err(NumericError::Overflow));
        assert_eq!(FD8::MIN.checked_sub(FD8::ONE), Err(NumericError::Underflow));
    }

    #[test]
    fn test_saturating_sub_to_zero() {
        let a: FD8 = "1.5".parse().unwrap();
        let b: FD8 = "2".parse().unwrap();
        assert_eq!(a.saturating_sub_to_zero(b), FD8::ZERO);
        assert_eq!(b.saturating_sub_to_zero(a), "0.5".parse().unwrap());
    }

    #[test]
    fn test_weighted_average_price() {
        // 1 @ 5.5 and 2 @ 6.0 -> (5.5 + 12.0) / 3 = 5.8333...
        let p1: Price = "5.5".parse().unwrap();
        let p2: Price = "6".parse().unwrap();
        let v1: Quantity = "1".parse().unwrap();
        let v2: Quantity = "2".parse().unwrap();

        let weighted = p1.weighted_product(v1) + p2.weighted_product(v2);
        let total = v1.checked_add(v2).unwrap();
        let vwap = Price::from_weighted_average(weighted, total).unwrap();
        assert_eq!(vwap.to_string(), "5.8333");
    }

    #[test]
    fn test_weighted_average_rounds_half_up() {
        // (1.0001 + 1.0002) / 2 = 1.00015 -> 1.0002
        let w = Price::from_raw(10_001).weighted_product(Quantity::ONE)
            + Price::from_raw(10_002).weighted_product(Quantity::ONE);
        let two = Quantity::from_integer(2).unwrap();
        assert_eq!(Price::from_weighted_average(w, two).unwrap().raw_value(), 10_002);
    }

    #[test]
    fn test_weighted_average_zero_weight() {
        assert_eq!(
            Price::from_weighted_average(10, Quantity::ZERO),
            Err(NumericError::DivisionByZero)
        );
    }

    #[test]
    fn test_from_str() {
        let x: FD4 = "123.456".parse().unwrap();
        assert_eq!(x.fractional_part(), 4560);

        let y: FD4 = "-0.001".parse().unwrap();
        assert!(y.is_negative());
        assert_eq!(y.to_string(), "-0.0010");

        assert_eq!("abc".parse::<FD4>(), Err(NumericError::InvalidInput));
        assert_eq!("1.00001".parse::<FD4>(), Err(NumericError::PrecisionLoss));
    }

    #[test]
    fn test_decimal_conversions() {
        use rust_decimal::Decimal;

        let d = Decimal::new(12345, 2); // 123.45
        assert_eq!(FD4::from_decimal(d).unwrap().to_string(), "123.4500");

        let too_fine = Decimal::new(123_456_789, 6); // 123.456789
        assert_eq!(FD4::from_decimal(too_fine), Err(NumericError::PrecisionLoss));
        assert_eq!(
            FD4::from_decimal_rounded(too_fine).unwrap().to_string(),
            "123.4568"
        );

        let x = FD4::from_parts(7, 2500).unwrap();
        assert_eq!(x.to_decimal(), Decimal::new(72500, 4));
    }

    #[test]
    fn test_sentinels() {
        assert!(Price::MAX.is_sentinel());
        assert!(Price::MIN.is_sentinel());
        assert!(!Price::ONE.is_sentinel());
        assert!(Price::MAX > Price::from_integer(1_000_000).unwrap());
    }

    #[test]
    fn test_sum() {
        let total: FD8 = ["0.1", "0.2", "0.3"]
            .iter()
            .map(|s| s.parse::<FD8>().unwrap())
            .sum();
        assert_eq!(total, "0.6".parse().unwrap());
    }
}
