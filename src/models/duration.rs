//! Exact rational durations
//!
//! A [`RationalDuration`] is a reduced fraction of a whole note plus a dot count.
//! The dot count only records how the duration was notated and takes no part in
//! equality, ordering or hashing: a dotted quarter made with [`RationalDuration::add_dot`]
//! equals `3/8` created directly.
//!
//! All arithmetic goes through `num_rational::Ratio<u64>` and is reduced right away,
//! so equality stays a plain comparison of numerator and denominator.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use num_rational::Ratio;
use serde::{Deserialize, Serialize};

use crate::error::{NotationError, Result};

/// Largest supported number of dots
pub const MAX_DOTS: u8 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RationalDuration {
    numerator: u32,
    denominator: u32,
    dots: u8,
}

impl RationalDuration {
    /// Create a duration of `numerator / denominator` whole notes
    pub fn of(numerator: u32, denominator: u32) -> Result<Self> {
        Self::of_dotted(numerator, denominator, 0)
    }

    /// Create a duration that records `dots` as its notated dot count.
    ///
    /// The dot count does not change the length. Use [`RationalDuration::add_dot`]
    /// to lengthen a duration by a dot.
    pub fn of_dotted(numerator: u32, denominator: u32, dots: u8) -> Result<Self> {
        if numerator < 1 {
            return Err(NotationError::InvalidDuration(format!(
                "numerator must be at least 1, was {}",
                numerator
            )));
        }
        if denominator < 1 {
            return Err(NotationError::InvalidDuration(format!(
                "denominator must be at least 1, was {}",
                denominator
            )));
        }
        if dots > MAX_DOTS {
            return Err(NotationError::InvalidDuration(format!(
                "dot count must be at most {}, was {}",
                MAX_DOTS, dots
            )));
        }

        let reduced = Ratio::new(numerator, denominator);
        Ok(Self {
            numerator: *reduced.numer(),
            denominator: *reduced.denom(),
            dots,
        })
    }

    fn from_ratio(ratio: Ratio<u64>, dots: u8) -> Result<Self> {
        let numerator = u32::try_from(*ratio.numer()).map_err(|_| overflow(&ratio))?;
        let denominator = u32::try_from(*ratio.denom()).map_err(|_| overflow(&ratio))?;
        Self::of_dotted(numerator, denominator, dots)
    }

    fn ratio(&self) -> Ratio<u64> {
        Ratio::new_raw(self.numerator as u64, self.denominator as u64)
    }

    pub fn numerator(&self) -> u32 {
        self.numerator
    }

    pub fn denominator(&self) -> u32 {
        self.denominator
    }

    pub fn dot_count(&self) -> u8 {
        self.dots
    }

    pub fn add(&self, other: &RationalDuration) -> Result<Self> {
        Self::from_ratio(self.ratio() + other.ratio(), 0)
    }

    /// Fails when `other` is not strictly shorter than `self`
    pub fn subtract(&self, other: &RationalDuration) -> Result<Self> {
        if !self.is_longer_than(other) {
            return Err(NotationError::InvalidDuration(format!(
                "cannot subtract {} from {}",
                other, self
            )));
        }
        Self::from_ratio(self.ratio() - other.ratio(), 0)
    }

    pub fn multiply(&self, factor: u32) -> Result<Self> {
        if factor < 1 {
            return Err(NotationError::InvalidDuration(format!(
                "multiplier must be at least 1, was {}",
                factor
            )));
        }
        Self::from_ratio(self.ratio() * factor as u64, 0)
    }

    pub fn divide(&self, divisor: u32) -> Result<Self> {
        if divisor < 1 {
            return Err(NotationError::InvalidDuration(format!(
                "divisor must be at least 1, was {}",
                divisor
            )));
        }
        Self::from_ratio(self.ratio() / divisor as u64, 0)
    }

    pub fn compare(&self, other: &RationalDuration) -> Ordering {
        self.cmp(other)
    }

    pub fn is_longer_than(&self, other: &RationalDuration) -> bool {
        self.cmp(other) == Ordering::Greater
    }

    pub fn is_shorter_than(&self, other: &RationalDuration) -> bool {
        self.cmp(other) == Ordering::Less
    }

    /// Sum of all durations. An empty sequence has no valid duration.
    pub fn sum<'a, I>(durations: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a RationalDuration>,
    {
        let mut iter = durations.into_iter();
        let first = iter
            .next()
            .ok_or_else(|| NotationError::InvalidDuration("cannot sum zero durations".to_string()))?;

        let mut total = first.ratio();
        for duration in iter {
            total = total + duration.ratio();
        }
        Self::from_ratio(total, 0)
    }

    /// Lengthen by one dot.
    ///
    /// With `n` dots already present the next dot adds `d / (2^(n+2) - 2)`,
    /// which is the closed form of the geometric series d0/2 + d0/4 + ...
    pub fn add_dot(&self) -> Result<Self> {
        if self.dots >= MAX_DOTS {
            return Err(NotationError::InvalidDuration(format!(
                "cannot add more than {} dots",
                MAX_DOTS
            )));
        }
        let divisor = (1u64 << (self.dots + 2)) - 2;
        let value = self.ratio();
        Self::from_ratio(value + value / divisor, self.dots + 1)
    }

    /// Inverse of [`RationalDuration::add_dot`]. A duration without dots is returned unchanged.
    pub fn remove_dot(&self) -> Result<Self> {
        if self.dots == 0 {
            return Ok(*self);
        }
        let divisor = (1u64 << (self.dots + 1)) - 1;
        let value = self.ratio();
        Self::from_ratio(value - value / divisor, self.dots - 1)
    }

    /// The undotted duration this one was derived from
    pub fn remove_dots(&self) -> Result<Self> {
        let mut duration = *self;
        while duration.dots > 0 {
            duration = duration.remove_dot()?;
        }
        Ok(duration)
    }
}

fn overflow(ratio: &Ratio<u64>) -> NotationError {
    NotationError::InvalidDuration(format!(
        "{}/{} does not fit a 32-bit fraction",
        ratio.numer(),
        ratio.denom()
    ))
}

impl PartialEq for RationalDuration {
    fn eq(&self, other: &Self) -> bool {
        self.numerator == other.numerator && self.denominator == other.denominator
    }
}

impl Eq for RationalDuration {}

impl Hash for RationalDuration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.numerator.hash(state);
        self.denominator.hash(state);
    }
}

impl PartialOrd for RationalDuration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RationalDuration {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.numerator as u64 * other.denominator as u64;
        let rhs = other.numerator as u64 * self.denominator as u64;
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for RationalDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}/{})", self.numerator, self.denominator)?;
        for _ in 0..self.dots {
            write!(f, ".")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn d(n: u32, den: u32) -> RationalDuration {
        RationalDuration::of(n, den).unwrap()
    }

    fn gcd(a: u32, b: u32) -> u32 {
        if b == 0 { a } else { gcd(b, a % b) }
    }

    #[test]
    fn test_stored_in_lowest_terms() {
        for (n, den) in [(2, 4), (6, 8), (12, 16), (3, 9), (100, 250), (7, 7), (1, 1024)] {
            let duration = d(n, den);
            assert_eq!(gcd(duration.numerator(), duration.denominator()), 1, "{}/{}", n, den);
        }
        assert_eq!(d(6, 8), d(3, 4));
        assert_eq!(d(6, 8).numerator(), 3);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(RationalDuration::of(0, 4), Err(NotationError::InvalidDuration(_))));
        assert!(matches!(RationalDuration::of(1, 0), Err(NotationError::InvalidDuration(_))));
        assert!(matches!(
            RationalDuration::of_dotted(1, 4, 6),
            Err(NotationError::InvalidDuration(_))
        ));
        assert!(d(1, 4).multiply(0).is_err());
        assert!(d(1, 4).divide(0).is_err());
    }

    #[test]
    fn test_dots_excluded_from_equality_and_hash() {
        let plain = d(3, 8);
        let dotted = d(1, 4).add_dot().unwrap();
        assert_eq!(dotted.dot_count(), 1);
        assert_eq!(plain, dotted);

        let mut set = HashSet::new();
        set.insert(plain);
        assert!(set.contains(&dotted));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(d(1, 4).add(&d(1, 8)).unwrap(), d(3, 8));
        assert_eq!(d(1, 2).subtract(&d(1, 8)).unwrap(), d(3, 8));
        assert_eq!(d(1, 8).multiply(3).unwrap(), d(3, 8));
        assert_eq!(d(1, 4).divide(3).unwrap(), d(1, 12));
        assert!(d(1, 4).subtract(&d(1, 4)).is_err());
        assert!(d(1, 8).subtract(&d(1, 4)).is_err());
    }

    #[test]
    fn test_arithmetic_results_have_no_dots() {
        let dotted = d(1, 4).add_dot().unwrap();
        assert_eq!(dotted.add(&d(1, 8)).unwrap().dot_count(), 0);
    }

    #[test]
    fn test_comparison() {
        assert!(d(1, 2).is_longer_than(&d(1, 4)));
        assert!(d(1, 12).is_shorter_than(&d(1, 8)));
        assert!(!d(2, 8).is_longer_than(&d(1, 4)));
        assert_eq!(d(1, 3).compare(&d(1, 3)), Ordering::Equal);
        let mut durations = vec![d(1, 2), d(1, 16), d(3, 8)];
        durations.sort();
        assert_eq!(durations, vec![d(1, 16), d(3, 8), d(1, 2)]);
    }

    #[test]
    fn test_sum_of_triplets() {
        let triplet = d(1, 12);
        let beat = RationalDuration::sum(&[triplet, triplet, triplet]).unwrap();
        assert_eq!(beat, d(1, 4));
        assert!(RationalDuration::sum(&[]).is_err());
    }

    #[test]
    fn test_sum_order_independent() {
        let a = [d(1, 8), d(1, 12), d(3, 16)];
        let b = [d(3, 16), d(1, 8), d(1, 12)];
        assert_eq!(RationalDuration::sum(&a).unwrap(), RationalDuration::sum(&b).unwrap());
    }

    #[test]
    fn test_add_dot_values() {
        let quarter = d(1, 4);
        let one = quarter.add_dot().unwrap();
        let two = one.add_dot().unwrap();
        let three = two.add_dot().unwrap();
        assert_eq!(one, d(3, 8));
        assert_eq!(two, d(7, 16));
        assert_eq!(three, d(15, 32));
        assert_eq!(three.dot_count(), 3);
    }

    #[test]
    fn test_add_then_remove_dot_is_identity() {
        for den in [1, 2, 4, 8, 16, 32, 64] {
            let mut duration = d(1, den);
            for _ in 0..MAX_DOTS {
                let dotted = duration.add_dot().unwrap();
                let restored = dotted.remove_dot().unwrap();
                assert_eq!(restored, duration);
                assert_eq!(restored.dot_count(), duration.dot_count());
                duration = dotted;
            }
        }
    }

    #[test]
    fn test_dot_limit() {
        let mut duration = d(1, 1);
        for _ in 0..MAX_DOTS {
            duration = duration.add_dot().unwrap();
        }
        assert!(duration.add_dot().is_err());
        assert_eq!(duration.remove_dots().unwrap(), d(1, 1));
    }

    #[test]
    fn test_remove_dot_without_dots_is_noop() {
        let half = d(1, 2);
        let same = half.remove_dot().unwrap();
        assert_eq!(same, half);
        assert_eq!(same.dot_count(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(d(1, 4).add_dot().unwrap().to_string(), "(3/8).");
        assert_eq!(d(2, 1).to_string(), "(2/1)");
    }
}
