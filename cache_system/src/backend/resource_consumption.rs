//! Abstract resource accounting for capacity-bounded backends.

use std::ops::{Add, Sub};

/// Something that can be summed, subtracted, and compared, used to account
/// for how much of a bounded resource (entry count, byte size, ...) a cache
/// entry consumes.
pub trait Resource:
    Add<Output = Self> + Sub<Output = Self> + PartialOrd + Copy + std::fmt::Debug + Send + Sync + 'static
{
    /// The zero value of this resource.
    fn zero() -> Self;

    /// Unit label used in logs/metrics, e.g. `"bytes"` or `"entries"`.
    fn unit() -> &'static str;
}

/// A plain entry-count resource, a cheap sizing proxy for the document and
/// result-chunk caches.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Eq, Ord)]
pub struct EntryCount(pub usize);

impl Resource for EntryCount {
    fn zero() -> Self {
        Self(0)
    }

    fn unit() -> &'static str {
        "entries"
    }
}

impl Add for EntryCount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.checked_add(rhs.0).expect("entry count overflow"))
    }
}

impl Sub for EntryCount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.checked_sub(rhs.0).expect("entry count underflow"))
    }
}
