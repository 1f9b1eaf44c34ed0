//! # Core Types
//!
//! Fundamental types shared between the simulated transport and the
//! consensus engines it connects.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::time::Duration;
use uuid::Uuid;

/// Index into the agreed sequence of states.
///
/// # Examples
///
/// ```rust
/// use bftnet_core::Height;
///
/// let h = Height::new(7);
/// assert_eq!(h.next().value(), 8);
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Height(pub u64);

impl Height {
    pub fn new(height: u64) -> Self {
        Self(height)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Retry attempt within a single height.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Round(pub u64);

impl Round {
    pub fn new(round: u64) -> Self {
        Self(round)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque state data negotiated by the consensus engine.
///
/// The transport never interprets state contents; it only carries proposals
/// into the engine and reads back the latest decided value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State(pub Bytes);

impl State {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for State {
    fn from(data: Vec<u8>) -> Self {
        Self(Bytes::from(data))
    }
}

impl From<&'static [u8]> for State {
    fn from(data: &'static [u8]) -> Self {
        Self(Bytes::from_static(data))
    }
}

/// Encoded public verification key of a consensus participant.
///
/// Key management lives with the engine; here the key is only an identity
/// that peers hand out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub Bytes);

impl PublicKey {
    pub fn new(encoded: impl Into<Bytes>) -> Self {
        Self(encoded.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Synthetic, non-routable address of an in-process peer.
///
/// Every peer gets a fresh random identifier at construction, which is
/// enough for uniqueness and log correlation.
///
/// # Examples
///
/// ```rust
/// use bftnet_core::PeerAddr;
///
/// let a = PeerAddr::new();
/// assert_eq!(a.network(), "ipc");
/// assert!(a.to_string().starts_with("ipc://"));
/// assert_ne!(a, PeerAddr::new());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerAddr(pub Uuid);

impl PeerAddr {
    pub const NETWORK: &'static str = "ipc";

    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Name of the network this address belongs to.
    pub fn network(&self) -> &'static str {
        Self::NETWORK
    }
}

impl Default for PeerAddr {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", Self::NETWORK, self.0)
    }
}

/// Signed delivery delay with nanosecond resolution.
///
/// Sampled delays come from an unbounded distribution and may be negative,
/// which `std::time::Duration` cannot represent. Arithmetic saturates at the
/// `i64` bounds.
///
/// # Examples
///
/// ```rust
/// use bftnet_core::Delay;
/// use std::time::Duration;
///
/// let d = Delay::from_nanos(-5);
/// assert!(d.is_negative());
/// assert_eq!(d.clamped(), Duration::ZERO);
/// assert_eq!(Delay::from(Duration::from_millis(2)).as_nanos(), 2_000_000);
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Delay(i64);

impl Delay {
    pub const ZERO: Delay = Delay(0);
    pub const MAX: Delay = Delay(i64::MAX);
    pub const MIN: Delay = Delay(i64::MIN);

    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    /// Converts floating-point nanoseconds, saturating out-of-range values
    /// and mapping NaN to zero.
    pub fn from_nanos_f64(nanos: f64) -> Self {
        Self(nanos as i64)
    }

    pub fn as_nanos(&self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1e9
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// The delay as a `Duration`, with negative values clamped to zero.
    pub fn clamped(&self) -> Duration {
        if self.0 <= 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.0 as u64)
        }
    }

    /// Zero if negative, otherwise unchanged.
    pub fn max_zero(self) -> Self {
        Self(self.0.max(0))
    }
}

impl From<Duration> for Delay {
    fn from(duration: Duration) -> Self {
        Self(i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX))
    }
}

impl Add for Delay {
    type Output = Delay;

    fn add(self, rhs: Delay) -> Delay {
        Delay(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Delay {
    fn add_assign(&mut self, rhs: Delay) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sum for Delay {
    fn sum<I: Iterator<Item = Delay>>(iter: I) -> Delay {
        iter.fold(Delay::ZERO, |acc, d| acc + d)
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = Duration::from_nanos(self.0.unsigned_abs());
        if self.is_negative() {
            write!(f, "-{:?}", magnitude)
        } else {
            write!(f, "{:?}", magnitude)
        }
    }
}
