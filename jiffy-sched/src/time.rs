/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Wrapping 32-bit microsecond time.
//!
//! The coarse clock is a `u32` that counts microseconds and wraps roughly
//! every 71.6 minutes.  Raw numeric comparison of two [`Time`] values is
//! therefore meaningless near the rollover point, so `Time` deliberately does
//! not implement `PartialOrd`.  Every ordering decision in the crate goes
//! through [`later_than`], which compares the signed wrapping difference.
//!
//! # Caller obligation
//! `later_than(a, b)` is correct only while the true separation of `a` and `b`
//! is below 2³¹ µs (about 35.8 minutes).  Scheduling a deadline further ahead
//! than that is out of contract: it will look like a deadline in the past and
//! fire immediately.

use std::fmt;

/// Number of microseconds in one millisecond.
pub const US_PER_MS: u32 = 1_000;

/// Number of microseconds in one second.
pub const US_PER_SEC: u32 = 1_000_000;

/// Largest forward offset for which [`later_than`] still orders correctly.
pub const MAX_OFFSET_US: u32 = i32::MAX as u32;

/// A point on the wrapping 32-bit microsecond timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Time(u32);

impl Time {
    /// The timeline origin (also the instant right after rollover).
    pub const ZERO: Time = Time(0);

    /// Wraps a raw microsecond count.
    pub const fn from_us(us: u32) -> Self {
        Time(us)
    }

    /// Raw microsecond count.
    pub const fn as_us(self) -> u32 {
        self.0
    }

    /// `self + us` with 32-bit wraparound.
    pub const fn wrapping_add_us(self, us: u32) -> Self {
        Time(self.0.wrapping_add(us))
    }

    /// `self - us` with 32-bit wraparound.
    pub const fn wrapping_sub_us(self, us: u32) -> Self {
        Time(self.0.wrapping_sub(us))
    }

    /// Signed distance from `earlier` to `self`.
    ///
    /// Positive when `self` is after `earlier`.  Only meaningful for pairs
    /// within [`MAX_OFFSET_US`] of each other.
    pub const fn signed_since(self, earlier: Time) -> i32 {
        self.0.wrapping_sub(earlier.0) as i32
    }

    /// `true` if `self` is strictly after `other`.  See [`later_than`].
    pub const fn later_than(self, other: Time) -> bool {
        later_than(self, other)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}µs", self.0)
    }
}

/// Wraparound-safe ordering: `true` iff `a` is strictly after `b`.
///
/// Computes `a - b` with wrapping arithmetic and tests the result as a signed
/// 32-bit value.
pub const fn later_than(a: Time, b: Time) -> bool {
    a.signed_since(b) > 0
}

/// `ms` milliseconds expressed in microseconds.
pub const fn time_ms(ms: u32) -> u32 {
    ms * US_PER_MS
}

/// `sec` seconds expressed in microseconds.
pub const fn time_sec(sec: u32) -> u32 {
    sec * US_PER_SEC
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn later_than_plain_values() {
        assert!(later_than(Time::from_us(10), Time::from_us(5)));
        assert!(!later_than(Time::from_us(5), Time::from_us(10)));
        assert!(Time::from_us(10).later_than(Time::from_us(5)));
    }

    #[test]
    fn later_than_is_irreflexive() {
        let t = Time::from_us(1234);
        assert!(!later_than(t, t));
    }

    #[test]
    fn later_than_across_rollover() {
        let before = Time::from_us(u32::MAX - 10);
        let after = before.wrapping_add_us(20);
        assert_eq!(after.as_us(), 9);
        assert!(later_than(after, before));
        assert!(!later_than(before, after));
    }

    #[test]
    fn offset_beyond_half_range_looks_like_past() {
        let now = Time::from_us(0);
        let too_far = now.wrapping_add_us(MAX_OFFSET_US + 1);
        assert!(!later_than(too_far, now));
    }

    #[test]
    fn signed_since_reports_direction() {
        let a = Time::from_us(5);
        let b = Time::from_us(u32::MAX - 4);
        assert_eq!(a.signed_since(b), 10);
        assert_eq!(b.signed_since(a), -10);
    }

    #[test]
    fn unit_helpers() {
        assert_eq!(time_ms(3), 3_000);
        assert_eq!(time_sec(20), 20_000_000);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            rng_algorithm: proptest::test_runner::RngAlgorithm::ChaCha,
            rng_seed: proptest::test_runner::RngSeed::Fixed(0x71C_C10C),
            .. ProptestConfig::default()
        })]

        #[test]
        fn exactly_one_direction_holds(base in any::<u32>(), delta in 1u32..=MAX_OFFSET_US) {
            let a = Time::from_us(base);
            let b = a.wrapping_add_us(delta);
            prop_assert!(later_than(b, a));
            prop_assert!(!later_than(a, b));
        }

        #[test]
        fn chain_within_range_is_transitive(
            base in any::<u32>(),
            d1 in 1u32..=(MAX_OFFSET_US / 2),
            d2 in 1u32..=(MAX_OFFSET_US / 2),
        ) {
            let a = Time::from_us(base);
            let b = a.wrapping_add_us(d1);
            let c = b.wrapping_add_us(d2);
            prop_assert!(later_than(b, a));
            prop_assert!(later_than(c, b));
            prop_assert!(later_than(c, a));
        }
    }
}
