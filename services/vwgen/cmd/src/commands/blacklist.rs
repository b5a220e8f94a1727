//! `vwgen blacklist <network> <add|delete> <left> <right>...`

use super::{missing_network, missing_node, Status};
use anyhow::Result;
use rand::{CryptoRng, Rng};
use std::str::FromStr;
use vwgen_store::{ConfigStore, Intent, StoreError};

/// Blacklist operation; any prefix of `add` or `delete` is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Delete,
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            Err(format!("vwgen: Invalid operation '{}'", s))
        } else if "add".starts_with(s) {
            Ok(Operation::Add)
        } else if "delete".starts_with(s) {
            Ok(Operation::Delete)
        } else {
            Err(format!("vwgen: Invalid operation '{}'", s))
        }
    }
}

/// Add or remove the pairs `(left, right)` for every `right`.
///
/// Adding skips unknown nodes. Deleting reports them but still drops the pair
/// so stale entries can be cleaned up.
pub fn run<R: Rng + CryptoRng>(
    store: &mut ConfigStore<R>,
    network: &str,
    operation: &str,
    left: &str,
    right: &[String],
) -> Result<Status> {
    let operation = match operation.parse::<Operation>() {
        Ok(operation) => operation,
        Err(message) => {
            eprintln!("{}", message);
            return Ok(Status::EINVAL);
        }
    };

    if !store.load(network, Intent::Modify)? {
        eprintln!("{}", missing_network(network));
        return Ok(Status::ENOENT);
    }

    let mut status = Status::OK;
    if !store.document().nodes().contains_key(left) {
        eprintln!("{}", missing_node(network, left));
        status = Status::ENOENT;
        if operation == Operation::Add {
            store.close();
            return Ok(status);
        }
    }

    for other in right {
        if !store.document().nodes().contains_key(other.as_str()) {
            eprintln!("{}", missing_node(network, other));
            status = status.or(Status::ENOENT);
            if operation == Operation::Add {
                continue;
            }
        }

        match operation {
            Operation::Add => match store.blacklist().add(left, other) {
                Ok(added) => {
                    if !added {
                        crate::component_debug!(
                            "blacklist",
                            "{} and {} are already blacklisted",
                            left,
                            other
                        );
                    }
                }
                Err(StoreError::Invalid(reason)) => {
                    eprintln!("vwgen: {}", reason);
                    status = status.or(Status::EINVAL);
                }
                Err(e) => return Err(e.into()),
            },
            Operation::Delete => {
                let known = store.document().nodes().contains_key(left)
                    && store.document().nodes().contains_key(other.as_str());
                let removed = store.blacklist().remove(left, other);
                if removed && !known {
                    crate::component_warn!(
                        "blacklist",
                        "Removed stale pair {} <-> {}",
                        left,
                        other
                    );
                } else if !removed {
                    crate::component_debug!(
                        "blacklist",
                        "{} and {} were not blacklisted",
                        left,
                        other
                    );
                }
            }
        }
    }

    store.save()?;
    store.close();
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{reopen, seeded};
    use tempfile::TempDir;

    fn populate(dir: &TempDir) {
        let mut store = seeded(dir, 20);
        store.load("mesh", Intent::Write).unwrap();
        for name in ["alice", "bob", "carol"] {
            store.add_node(name).unwrap();
        }
        store.save().unwrap();
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_operation_prefixes() {
        assert_eq!("a".parse::<Operation>().unwrap(), Operation::Add);
        assert_eq!("add".parse::<Operation>().unwrap(), Operation::Add);
        assert_eq!("d".parse::<Operation>().unwrap(), Operation::Delete);
        assert_eq!("del".parse::<Operation>().unwrap(), Operation::Delete);
        assert!("adds".parse::<Operation>().is_err());
        assert!("remove".parse::<Operation>().is_err());
        assert!("".parse::<Operation>().is_err());
    }

    #[test]
    fn test_add_then_delete_restores_blacklist() {
        let dir = TempDir::new().unwrap();
        populate(&dir);

        let mut store = seeded(&dir, 1);
        let status = run(&mut store, "mesh", "add", "alice", &names(&["bob", "carol"])).unwrap();
        assert!(status.is_ok());
        {
            let reader = reopen(&dir, "mesh");
            let blacklist = reader.document().blacklist();
            assert!(blacklist.contains("bob", "alice"));
            assert!(blacklist.contains("alice", "carol"));
            assert_eq!(reader.document().whitelist_of("alice"), Vec::<&str>::new());
        }

        let mut store = seeded(&dir, 2);
        let status = run(&mut store, "mesh", "del", "carol", &names(&["alice"])).unwrap();
        assert!(status.is_ok());
        let status = run(&mut store, "mesh", "d", "bob", &names(&["alice"])).unwrap();
        assert!(status.is_ok());

        let reader = reopen(&dir, "mesh");
        assert!(reader.document().blacklist().is_empty());
    }

    #[test]
    fn test_add_skips_unknown_nodes() {
        let dir = TempDir::new().unwrap();
        populate(&dir);

        let mut store = seeded(&dir, 3);
        let status = run(&mut store, "mesh", "a", "alice", &names(&["mallory", "bob"])).unwrap();
        assert_eq!(status, Status::ENOENT);

        let reader = reopen(&dir, "mesh");
        assert_eq!(reader.document().blacklist().len(), 1);
        assert!(reader.document().blacklist().contains("alice", "bob"));
    }

    #[test]
    fn test_unknown_left_node_on_add_changes_nothing() {
        let dir = TempDir::new().unwrap();
        populate(&dir);

        let mut store = seeded(&dir, 4);
        let status = run(&mut store, "mesh", "add", "mallory", &names(&["bob"])).unwrap();
        assert_eq!(status, Status::ENOENT);
        assert!(reopen(&dir, "mesh").document().blacklist().is_empty());
    }

    #[test]
    fn test_self_pair_is_invalid() {
        let dir = TempDir::new().unwrap();
        populate(&dir);

        let mut store = seeded(&dir, 5);
        let status = run(&mut store, "mesh", "add", "alice", &names(&["alice", "bob"])).unwrap();
        assert_eq!(status, Status::EINVAL);
        assert_eq!(reopen(&dir, "mesh").document().blacklist().len(), 1);
    }

    #[test]
    fn test_invalid_operation() {
        let dir = TempDir::new().unwrap();
        populate(&dir);

        let mut store = seeded(&dir, 6);
        let status = run(&mut store, "mesh", "toggle", "alice", &names(&["bob"])).unwrap();
        assert_eq!(status, Status::EINVAL);
    }

    #[test]
    fn test_missing_network() {
        let dir = TempDir::new().unwrap();
        let mut store = seeded(&dir, 7);
        let status = run(&mut store, "mesh", "add", "alice", &names(&["bob"])).unwrap();
        assert_eq!(status, Status::ENOENT);
    }
}
