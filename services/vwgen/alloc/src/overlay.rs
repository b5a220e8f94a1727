//! Overlay IPv4 allocation from the network's configurable pool.

use crate::error::AllocError;
use crate::range::HostRange;
use ipnet::Ipv4Net;
use rand::Rng;
use std::collections::HashSet;
use std::net::Ipv4Addr;

/// Usable host range of `pool`.
///
/// Network and broadcast addresses are excluded for prefixes shorter than 31;
/// a /31 uses both addresses and a /32 its single address.
pub fn usable_hosts(pool: &Ipv4Net) -> HostRange {
    let network = u32::from(pool.network());
    let broadcast = u32::from(pool.broadcast());
    if pool.prefix_len() < 31 {
        HostRange::from_bounds(network + 1, broadcast - 1)
    } else {
        HostRange::from_bounds(network, broadcast)
    }
}

/// Allocate an unassigned address from `pool`, returned with the pool's prefix length.
pub fn allocate_overlay_ipv4<R: Rng + ?Sized>(
    pool: &Ipv4Net,
    assigned: &HashSet<Ipv4Addr>,
    rng: &mut R,
) -> Result<Ipv4Net, AllocError> {
    let address = usable_hosts(pool)
        .sample_free(assigned, rng)
        .map_err(|e| match e {
            AllocError::PoolExhausted { capacity, .. } => AllocError::PoolExhausted {
                pool: pool.trunc().to_string(),
                capacity,
            },
            other => other,
        })?;

    Ipv4Net::new(address, pool.prefix_len()).map_err(|e| AllocError::InvalidPool(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pool(s: &str) -> Ipv4Net {
        s.parse().unwrap()
    }

    #[test]
    fn test_usable_hosts() {
        assert_eq!(usable_hosts(&pool("192.168.5.0/24")).capacity(), 254);
        assert_eq!(usable_hosts(&pool("10.0.0.0/30")).capacity(), 2);
        assert_eq!(usable_hosts(&pool("10.0.0.0/31")).capacity(), 2);
        assert_eq!(usable_hosts(&pool("10.0.0.7/32")).capacity(), 1);
        assert_eq!(usable_hosts(&pool("0.0.0.0/0")).capacity(), (1u64 << 32) - 2);

        // Host bits in the pool definition are ignored
        let range = usable_hosts(&pool("192.168.5.77/24"));
        assert_eq!(range.first(), Ipv4Addr::new(192, 168, 5, 1));
        assert_eq!(range.last(), Ipv4Addr::new(192, 168, 5, 254));
    }

    #[test]
    fn test_allocate_fills_pool_then_exhausts() {
        let pool = pool("192.168.5.0/24");
        let mut rng = StdRng::seed_from_u64(42);
        let mut assigned = HashSet::new();

        for _ in 0..254 {
            let net = allocate_overlay_ipv4(&pool, &assigned, &mut rng).unwrap();
            assert_eq!(net.prefix_len(), 24);
            assert!(pool.contains(&net.addr()));
            assert_ne!(net.addr(), Ipv4Addr::new(192, 168, 5, 0));
            assert_ne!(net.addr(), Ipv4Addr::new(192, 168, 5, 255));
            assert!(assigned.insert(net.addr()), "duplicate {}", net);
        }

        let result = allocate_overlay_ipv4(&pool, &assigned, &mut rng);
        assert_eq!(
            result,
            Err(AllocError::PoolExhausted {
                pool: "192.168.5.0/24".to_string(),
                capacity: 254,
            })
        );
    }

    #[test]
    fn test_allocate_formats_with_prefix() {
        let mut rng = StdRng::seed_from_u64(9);
        let net = allocate_overlay_ipv4(&pool("192.168.5.0/24"), &HashSet::new(), &mut rng).unwrap();
        assert!(net.to_string().starts_with("192.168.5."));
        assert!(net.to_string().ends_with("/24"));
    }

    #[test]
    fn test_allocate_point_to_point_pools() {
        let mut rng = StdRng::seed_from_u64(5);

        let p31 = pool("10.1.1.0/31");
        let mut assigned = HashSet::new();
        for _ in 0..2 {
            let net = allocate_overlay_ipv4(&p31, &assigned, &mut rng).unwrap();
            assert!(assigned.insert(net.addr()));
        }
        assert!(matches!(
            allocate_overlay_ipv4(&p31, &assigned, &mut rng),
            Err(AllocError::PoolExhausted { capacity: 2, .. })
        ));

        let p32 = pool("10.1.1.9/32");
        let net = allocate_overlay_ipv4(&p32, &HashSet::new(), &mut rng).unwrap();
        assert_eq!(net.to_string(), "10.1.1.9/32");
        let assigned: HashSet<_> = [net.addr()].into_iter().collect();
        assert!(allocate_overlay_ipv4(&p32, &assigned, &mut rng).is_err());
    }

    #[test]
    fn test_addresses_outside_pool_do_not_count() {
        let p30 = pool("10.2.0.0/30");
        let assigned: HashSet<Ipv4Addr> = [
            Ipv4Addr::new(10, 2, 0, 1),
            Ipv4Addr::new(172, 16, 0, 1),
            Ipv4Addr::new(172, 16, 0, 2),
        ]
        .into_iter()
        .collect();

        let mut rng = StdRng::seed_from_u64(11);
        let net = allocate_overlay_ipv4(&p30, &assigned, &mut rng).unwrap();
        assert_eq!(net.addr(), Ipv4Addr::new(10, 2, 0, 2));
    }
}
