//! Volume conversion shared by aggregation and warning detection.
//!
//! Every drink type converts to liters through a fixed factor:
//!
//! | Drink      | Volume  |
//! |------------|---------|
//! | Pint       | 0.50 L  |
//! | Half-pint  | 0.25 L  |
//! | 33cl can   | 0.33 L  |
//!
//! Volumes are held as whole centiliters so sums and threshold comparisons are
//! exact. Conversion to liters only happens at the edges.
//!
//! # Example
//!
//! ```
//! use pinte_types::{Volume, to_liters};
//!
//! assert_eq!(to_liters(2, 1, 0), 1.25);
//!
//! let volume = Volume::from_counts(1, 0, 1);
//! assert_eq!(volume.centiliters(), 83);
//! ```

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign};

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Centiliters in one pint.
pub const PINT_CL: u64 = 50;
/// Centiliters in one half-pint.
pub const HALF_PINT_CL: u64 = 25;
/// Centiliters in one 33cl can.
pub const CAN_33_CL: u64 = 33;

/// Convert drink counts to liters.
///
/// `pints * 0.5 + half_pints * 0.25 + liters_33 * 0.33`.
#[must_use]
pub fn to_liters(pints: u32, half_pints: u32, liters_33: u32) -> f64 {
    Volume::from_counts(pints, half_pints, liters_33).liters()
}

/// Round a liter figure to two decimals for display.
#[must_use]
pub fn round_liters(liters: f64) -> f64 {
    (liters * 100.0).round() / 100.0
}

/// An exact volume of drink, in centiliters.
///
/// Serialized as liters rounded to two decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Volume {
    centiliters: u64,
}

impl Volume {
    /// An empty volume.
    pub const ZERO: Volume = Volume { centiliters: 0 };

    /// Create a volume from a raw centiliter amount.
    #[must_use]
    pub const fn from_centiliters(centiliters: u64) -> Self {
        Self { centiliters }
    }

    /// Volume of the given drink counts.
    #[must_use]
    pub const fn from_counts(pints: u32, half_pints: u32, liters_33: u32) -> Self {
        Self {
            centiliters: pints as u64 * PINT_CL
                + half_pints as u64 * HALF_PINT_CL
                + liters_33 as u64 * CAN_33_CL,
        }
    }

    /// The volume in centiliters.
    #[must_use]
    pub const fn centiliters(&self) -> u64 {
        self.centiliters
    }

    /// The volume in liters.
    #[must_use]
    pub fn liters(&self) -> f64 {
        self.centiliters as f64 / 100.0
    }

    /// Subtract another volume, stopping at zero.
    #[must_use]
    pub const fn saturating_sub(self, rhs: Volume) -> Volume {
        Volume::from_centiliters(self.centiliters.saturating_sub(rhs.centiliters))
    }

    /// Whether the volume is empty.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.centiliters == 0
    }
}

impl Add for Volume {
    type Output = Volume;

    fn add(self, rhs: Volume) -> Volume {
        Volume::from_centiliters(self.centiliters + rhs.centiliters)
    }
}

impl AddAssign for Volume {
    fn add_assign(&mut self, rhs: Volume) {
        self.centiliters += rhs.centiliters;
    }
}

impl Sum for Volume {
    fn sum<I: Iterator<Item = Volume>>(iter: I) -> Volume {
        iter.fold(Volume::ZERO, Add::add)
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} L", self.liters())
    }
}

#[cfg(feature = "serde")]
impl Serialize for Volume {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(round_liters(self.liters()))
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Volume {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let liters = f64::deserialize(deserializer)?;
        if !liters.is_finite() || liters < 0.0 {
            return Err(serde::de::Error::custom(format!(
                "volume must be a non-negative number of liters (got {liters})"
            )));
        }
        Ok(Volume::from_centiliters((liters * 100.0).round() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_factors() {
        assert_eq!(to_liters(1, 0, 0), 0.5);
        assert_eq!(to_liters(0, 1, 0), 0.25);
        assert_eq!(to_liters(0, 0, 1), 0.33);
        assert_eq!(to_liters(0, 0, 0), 0.0);
    }

    #[test]
    fn test_mixed_counts() {
        // 2 * 0.5 + 3 * 0.25 + 4 * 0.33 = 3.07
        let volume = Volume::from_counts(2, 3, 4);
        assert_eq!(volume.centiliters(), 307);
        assert!((volume.liters() - 3.07).abs() < 1e-9);
    }

    #[test]
    fn test_three_pints_is_exactly_threshold() {
        let total: Volume = (0..3).map(|_| Volume::from_counts(1, 0, 0)).sum();
        assert_eq!(total.centiliters(), 150);
        assert_eq!(total.liters(), 1.5);
    }

    #[test]
    fn test_large_counts_do_not_overflow() {
        let volume = Volume::from_counts(u32::MAX, u32::MAX, u32::MAX);
        assert_eq!(volume.centiliters(), u32::MAX as u64 * 108);
    }

    #[test]
    fn test_saturating_sub() {
        let pint = Volume::from_counts(1, 0, 0);
        let half = Volume::from_counts(0, 1, 0);
        assert_eq!(pint.saturating_sub(half), half);
        assert_eq!(half.saturating_sub(pint), Volume::ZERO);
    }

    #[test]
    fn test_round_liters() {
        assert_eq!(round_liters(1.234_567), 1.23);
        assert_eq!(round_liters(0.999), 1.0);
        assert_eq!(round_liters(0.0), 0.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(Volume::from_counts(1, 1, 0).to_string(), "0.75 L");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_as_liters() {
        let volume = Volume::from_counts(2, 1, 1);
        let json = serde_json::to_string(&volume).unwrap();
        assert_eq!(json, "1.58");

        let back: Volume = serde_json::from_str(&json).unwrap();
        assert_eq!(back, volume);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_negative_rejected() {
        let result: Result<Volume, _> = serde_json::from_str("-1.0");
        assert!(result.is_err());
    }
}
