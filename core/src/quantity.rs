use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Sub, SubAssign},
    str::FromStr,
};

use deps::bigdecimal::{BigDecimal, ParseBigDecimalError};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

/// an arbitrary-precision, non-negative integer quantity.
///
/// Used both for lovelace amounts and native-token quantities -- the
/// ledger never deals in fractional units, so arithmetic here is exact
/// integer arithmetic backed by a big decimal with a fixed scale of zero.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(BigDecimal);

#[derive(Debug, thiserror::Error)]
pub enum QuantityFromStrError {
    #[error("not a valid decimal number: {0}")]
    InvalidDecimal(#[from] ParseBigDecimalError),
    #[error("quantity cannot have a fractional part: {value}")]
    NotIntegral { value: String },
    #[error("quantity cannot be negative: {value}")]
    Negative { value: String },
}

impl Quantity {
    #[inline]
    pub fn zero() -> Self {
        Self(BigDecimal::from(0))
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == BigDecimal::from(0)
    }

    /// `self - rhs` if `self >= rhs`, else `None`.
    pub fn checked_sub(&self, rhs: &Self) -> Option<Self> {
        if self.0 >= rhs.0 {
            Some(Self(&self.0 - &rhs.0))
        } else {
            None
        }
    }

    pub fn to_u64(&self) -> Option<u64> {
        use deps::bigdecimal::ToPrimitive;
        self.0.to_u64()
    }
}

impl From<u64> for Quantity {
    fn from(value: u64) -> Self {
        Self(BigDecimal::from(value))
    }
}

impl FromStr for Quantity {
    type Err = QuantityFromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: BigDecimal = s.parse()?;
        let (digits, scale) = value.as_bigint_and_exponent();
        if digits.sign() == deps::bigdecimal::num_bigint::Sign::Minus {
            return Err(QuantityFromStrError::Negative {
                value: s.to_owned(),
            });
        }
        if scale > 0 {
            return Err(QuantityFromStrError::NotIntegral {
                value: s.to_owned(),
            });
        }
        Ok(Self(value))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

impl Add for Quantity {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a Quantity> for &'a Quantity {
    type Output = Quantity;
    fn add(self, rhs: &'a Quantity) -> Self::Output {
        Quantity(&self.0 + &rhs.0)
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl AddAssign<&Quantity> for Quantity {
    fn add_assign(&mut self, rhs: &Quantity) {
        self.0 += &rhs.0;
    }
}

/// subtraction may go negative; callers that must stay non-negative use
/// [`Quantity::checked_sub`] instead.
impl Sub for Quantity {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl<'a> Sub<&'a Quantity> for &'a Quantity {
    type Output = Quantity;
    fn sub(self, rhs: &'a Quantity) -> Self::Output {
        Quantity(&self.0 - &rhs.0)
    }
}

impl SubAssign for Quantity {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, v| acc + v)
    }
}

impl<'a> Sum<&'a Quantity> for Quantity {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, v| &acc + v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    #[test]
    fn from_str_rejects_fraction() {
        assert!(matches!(
            "1.5".parse::<Quantity>(),
            Err(QuantityFromStrError::NotIntegral { .. })
        ));
    }

    #[test]
    fn from_str_rejects_negative() {
        assert!(matches!(
            "-1".parse::<Quantity>(),
            Err(QuantityFromStrError::Negative { .. })
        ));
    }

    #[test]
    fn checked_sub_clamps() {
        let a = Quantity::from(5u64);
        let b = Quantity::from(10u64);
        assert_eq!(a.checked_sub(&b), None);
        assert_eq!(b.checked_sub(&a), Some(Quantity::from(5u64)));
    }

    #[test]
    fn round_trip_serde() {
        let q = Quantity::from(42u64);
        let json = serde_json::to_string(&q).unwrap();
        assert_eq!(json, "\"42\"");
        let back: Quantity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q);
    }

    quickcheck! {
        fn addition_commutes(a: u64, b: u64) -> bool {
            Quantity::from(a) + Quantity::from(b) == Quantity::from(b) + Quantity::from(a)
        }

        fn checked_sub_then_add_roundtrips(a: u64, b: u64) -> bool {
            let (big, small) = if a >= b { (a, b) } else { (b, a) };
            Quantity::from(big)
                .checked_sub(&Quantity::from(small))
                .map(|diff| diff + Quantity::from(small) == Quantity::from(big))
                .unwrap_or(false)
        }

        fn string_roundtrip(value: u64) -> bool {
            let q = Quantity::from(value);
            q.to_string().parse::<Quantity>().unwrap() == q
        }
    }
}
