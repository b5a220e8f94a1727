//! Link-local allocation for point-to-point tunnel addressing.
//!
//! Draws from 169.254.1.0-169.254.254.255; the first and last /24 of
//! 169.254.0.0/16 are reserved.

use crate::error::AllocError;
use crate::range::HostRange;
use rand::Rng;
use std::collections::HashSet;
use std::net::Ipv4Addr;

/// First allocatable link-local address
pub const LINK_LOCAL_FIRST: Ipv4Addr = Ipv4Addr::new(169, 254, 1, 0);

/// Last allocatable link-local address
pub const LINK_LOCAL_LAST: Ipv4Addr = Ipv4Addr::new(169, 254, 254, 255);

fn link_local_range() -> HostRange {
    HostRange::from_bounds(u32::from(LINK_LOCAL_FIRST), u32::from(LINK_LOCAL_LAST))
}

/// Allocate an unassigned link-local address.
pub fn allocate_link_local<R: Rng + ?Sized>(
    assigned: &HashSet<Ipv4Addr>,
    rng: &mut R,
) -> Result<Ipv4Addr, AllocError> {
    link_local_range().sample_free(assigned, rng)
}
