//! Inclusive IPv4 host ranges and rejection sampling over them.

use crate::error::AllocError;
use rand::Rng;
use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;
use tracing::debug;

/// Inclusive range of IPv4 host addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostRange {
    first: u32,
    last: u32,
}

impl HostRange {
    /// Create a range from its first and last address.
    pub fn new(first: Ipv4Addr, last: Ipv4Addr) -> Result<Self, AllocError> {
        let (first, last) = (u32::from(first), u32::from(last));
        if first > last {
            return Err(AllocError::InvalidPool(format!(
                "{} is after {}",
                Ipv4Addr::from(first),
                Ipv4Addr::from(last)
            )));
        }
        Ok(Self { first, last })
    }

    pub(crate) fn from_bounds(first: u32, last: u32) -> Self {
        debug_assert!(first <= last);
        Self { first, last }
    }

    /// First address in the range
    pub fn first(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.first)
    }

    /// Last address in the range
    pub fn last(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.last)
    }

    /// Number of addresses in the range
    pub fn capacity(&self) -> u64 {
        u64::from(self.last - self.first) + 1
    }

    /// Check whether `addr` lies inside the range
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        (self.first..=self.last).contains(&u32::from(addr))
    }

    /// Count the distinct assigned addresses that fall inside the range.
    pub fn assigned_count(&self, assigned: &HashSet<Ipv4Addr>) -> u64 {
        assigned.iter().filter(|addr| self.contains(**addr)).count() as u64
    }

    /// Draw random addresses until one is not in `assigned`.
    ///
    /// Fails without sampling when the range is already fully assigned.
    pub fn sample_free<R: Rng + ?Sized>(
        &self,
        assigned: &HashSet<Ipv4Addr>,
        rng: &mut R,
    ) -> Result<Ipv4Addr, AllocError> {
        let capacity = self.capacity();
        let used = self.assigned_count(assigned);
        if used >= capacity {
            return Err(AllocError::PoolExhausted {
                pool: self.to_string(),
                capacity,
            });
        }

        let mut draws = 0u64;
        loop {
            draws += 1;
            let candidate = Ipv4Addr::from(rng.gen_range(self.first..=self.last));
            if !assigned.contains(&candidate) {
                debug!(
                    "Picked {} from {} after {} draws ({}/{} in use)",
                    candidate, self, draws, used, capacity
                );
                return Ok(candidate);
            }
        }
    }
}

impl fmt::Display for HostRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first(), self.last())
    }
}
