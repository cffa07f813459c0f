use crate::Quantity;
use std::{
    fmt,
    ops::{Add, AddAssign, Sub, SubAssign},
};

/// a signed view over a [`Quantity`]: either a shortfall, exactly zero, or
/// a surplus.
///
/// Used throughout the engine to express "inputs minus outputs" for a
/// single asset unit without resorting to a signed-integer representation
/// of an otherwise-unsigned [`Quantity`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Balance {
    Debt(Quantity),
    Balanced,
    Excess(Quantity),
}

impl Balance {
    #[inline]
    pub fn zero() -> Self {
        Self::Balanced
    }

    #[inline]
    pub fn in_debt(&self) -> bool {
        matches!(self, Self::Debt(_))
    }

    #[inline]
    pub fn balanced(&self) -> bool {
        matches!(self, Self::Balanced)
    }

    #[inline]
    pub fn in_excess(&self) -> bool {
        matches!(self, Self::Excess(_))
    }

    /// the excess amount, if any.
    pub fn excess(&self) -> Option<&Quantity> {
        match self {
            Self::Excess(v) => Some(v),
            _ => None,
        }
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::Balanced
    }
}

impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Self::Balanced, rhs) => rhs,
            (lhs, Self::Balanced) => lhs,
            (Self::Excess(lhs), Self::Excess(rhs)) => Self::Excess(lhs + rhs),
            (Self::Debt(lhs), Self::Debt(rhs)) => Self::Debt(lhs + rhs),
            (Self::Debt(lhs), Self::Excess(rhs)) => match lhs.cmp(&rhs) {
                std::cmp::Ordering::Less => Self::Excess(rhs - lhs),
                std::cmp::Ordering::Equal => Self::Balanced,
                std::cmp::Ordering::Greater => Self::Debt(lhs - rhs),
            },
            (Self::Excess(lhs), Self::Debt(rhs)) => match lhs.cmp(&rhs) {
                std::cmp::Ordering::Less => Self::Debt(rhs - lhs),
                std::cmp::Ordering::Equal => Self::Balanced,
                std::cmp::Ordering::Greater => Self::Excess(lhs - rhs),
            },
        }
    }
}

impl Add<Quantity> for Balance {
    type Output = Self;
    fn add(self, rhs: Quantity) -> Self::Output {
        self + if rhs.is_zero() {
            Self::Balanced
        } else {
            Self::Excess(rhs)
        }
    }
}

impl AddAssign<Quantity> for Balance {
    fn add_assign(&mut self, rhs: Quantity) {
        let lhs = std::mem::take(self);
        *self = lhs + rhs;
    }
}

impl Sub<Quantity> for Balance {
    type Output = Self;
    fn sub(self, rhs: Quantity) -> Self::Output {
        self + if rhs.is_zero() {
            Self::Balanced
        } else {
            Self::Debt(rhs)
        }
    }
}

impl SubAssign<Quantity> for Balance {
    fn sub_assign(&mut self, rhs: Quantity) {
        let lhs = std::mem::take(self);
        *self = lhs - rhs;
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Balanced => "0".fmt(f),
            Self::Debt(v) => write!(f, "-{v}"),
            Self::Excess(v) => write!(f, "+{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! qty {
        ($v:literal) => {
            Quantity::from($v as u64)
        };
    }

    #[test]
    fn assign_sub() {
        let mut balance = Balance::Balanced;
        balance -= qty!(10);
        assert_eq!(balance, Balance::Debt(qty!(10)));

        balance -= qty!(10);
        assert_eq!(balance, Balance::Debt(qty!(20)));
    }

    #[test]
    fn assign_add() {
        let mut balance = Balance::Debt(qty!(10));
        balance += qty!(10);
        assert_eq!(balance, Balance::Balanced);

        balance += qty!(5);
        assert_eq!(balance, Balance::Excess(qty!(5)));
    }

    #[test]
    fn add_sub_cross_sign() {
        assert_eq!(Balance::Debt(qty!(1)) + qty!(1), Balance::Balanced);
        assert_eq!(Balance::Excess(qty!(2)) - qty!(1), Balance::Excess(qty!(1)));
        assert_eq!(Balance::Excess(qty!(1)) - qty!(2), Balance::Debt(qty!(1)));
    }

    quickcheck::quickcheck! {
        fn credit_then_debit_same_amount_is_balanced(amount: u64) -> bool {
            let mut balance = Balance::zero();
            balance += Quantity::from(amount);
            balance -= Quantity::from(amount);
            balance == Balance::Balanced
        }

        fn net_matches_subtraction(credit: u64, debit: u64) -> bool {
            let mut balance = Balance::zero();
            balance += Quantity::from(credit);
            balance -= Quantity::from(debit);
            match credit.cmp(&debit) {
                std::cmp::Ordering::Equal => balance == Balance::Balanced,
                std::cmp::Ordering::Greater => balance == Balance::Excess(Quantity::from(credit - debit)),
                std::cmp::Ordering::Less => balance == Balance::Debt(Quantity::from(debit - credit)),
            }
        }
    }
}
