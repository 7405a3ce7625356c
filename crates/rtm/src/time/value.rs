// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Second/microsecond time arithmetic.
//!
//! `TimeValue` is always kept normalized: `usec` lies in `0..1_000_000`
//! for non-negative values and in `-999_999..=0` for negative ones, so the
//! sign of both fields always agrees.

use std::fmt;
use std::ops::{Add, Sub};
use std::time::Duration;

const USEC_PER_SEC: i64 = 1_000_000;

/// Time interval carried as (seconds, microseconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeValue {
    sec: i64,
    usec: i64,
}

impl TimeValue {
    /// Zero interval.
    pub const ZERO: TimeValue = TimeValue { sec: 0, usec: 0 };

    /// Build from seconds and microseconds, normalizing carry/borrow.
    pub fn new(sec: i64, usec: i64) -> Self {
        let mut tv = Self { sec, usec };
        tv.normalize();
        tv
    }

    /// Build from a floating-point number of seconds.
    pub fn from_secs_f64(secs: f64) -> Self {
        let sec = secs.trunc() as i64;
        let usec = ((secs - secs.trunc()) * USEC_PER_SEC as f64).round() as i64;
        Self::new(sec, usec)
    }

    /// Build from a microsecond count.
    pub fn from_usec(usec: i64) -> Self {
        Self::new(usec / USEC_PER_SEC, usec % USEC_PER_SEC)
    }

    pub fn sec(&self) -> i64 {
        self.sec
    }

    pub fn usec(&self) -> i64 {
        self.usec
    }

    /// Total value in microseconds.
    pub fn as_usec(&self) -> i64 {
        self.sec * USEC_PER_SEC + self.usec
    }

    /// Value as a floating-point number of seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.sec as f64 + self.usec as f64 / USEC_PER_SEC as f64
    }

    /// -1, 0 or 1 depending on the sign of the interval.
    pub fn sign(&self) -> i32 {
        match self.as_usec() {
            v if v > 0 => 1,
            v if v < 0 => -1,
            _ => 0,
        }
    }

    pub fn is_positive(&self) -> bool {
        self.sign() > 0
    }

    /// Convert to a `Duration`; negative values clamp to zero.
    pub fn to_duration(&self) -> Duration {
        if self.sign() <= 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(self.as_usec() as u64)
    }

    fn normalize(&mut self) {
        if self.usec >= USEC_PER_SEC || self.usec <= -USEC_PER_SEC {
            self.sec += self.usec / USEC_PER_SEC;
            self.usec %= USEC_PER_SEC;
        }
        if self.sec > 0 && self.usec < 0 {
            self.sec -= 1;
            self.usec += USEC_PER_SEC;
        } else if self.sec < 0 && self.usec > 0 {
            self.sec += 1;
            self.usec -= USEC_PER_SEC;
        }
    }
}

impl Add for TimeValue {
    type Output = TimeValue;

    fn add(self, rhs: TimeValue) -> TimeValue {
        TimeValue::new(self.sec + rhs.sec, self.usec + rhs.usec)
    }
}

impl Sub for TimeValue {
    type Output = TimeValue;

    fn sub(self, rhs: TimeValue) -> TimeValue {
        TimeValue::new(self.sec - rhs.sec, self.usec - rhs.usec)
    }
}

impl From<Duration> for TimeValue {
    fn from(d: Duration) -> Self {
        TimeValue::new(d.as_secs() as i64, i64::from(d.subsec_micros()))
    }
}

impl From<f64> for TimeValue {
    fn from(secs: f64) -> Self {
        TimeValue::from_secs_f64(secs)
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.as_secs_f64())
    }
}
