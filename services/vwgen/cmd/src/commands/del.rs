//! `vwgen del <network> <node>...`

use super::{missing_network, missing_node, Status};
use anyhow::Result;
use rand::{CryptoRng, Rng};
use vwgen_store::{ConfigStore, Intent, StoreError};

pub fn run<R: Rng + CryptoRng>(
    store: &mut ConfigStore<R>,
    network: &str,
    nodes: &[String],
) -> Result<Status> {
    if !store.load(network, Intent::Modify)? {
        eprintln!("{}", missing_network(network));
        return Ok(Status::ENOENT);
    }

    let mut status = Status::OK;
    for name in nodes {
        match store.delete_node(name) {
            Ok(_) => crate::component_debug!("del", "Deleted node {}", name),
            Err(StoreError::NodeNotFound(_)) => {
                eprintln!("{}", missing_node(network, name));
                status = status.or(Status::ENOENT);
            }
            Err(e) => return Err(e.into()),
        }
    }

    store.save()?;
    store.close();
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{node_names, reopen, seeded};
    use tempfile::TempDir;

    fn populate(dir: &TempDir) {
        let mut store = seeded(dir, 10);
        store.load("mesh", Intent::Write).unwrap();
        for name in ["alice", "bob", "carol"] {
            store.add_node(name).unwrap();
        }
        store.blacklist().add("alice", "bob").unwrap();
        store.blacklist().add("bob", "carol").unwrap();
        store.save().unwrap();
    }

    #[test]
    fn test_del_missing_network() {
        let dir = TempDir::new().unwrap();
        let mut store = seeded(&dir, 1);
        let status = run(&mut store, "nowhere", &["alice".to_string()]).unwrap();
        assert_eq!(status, Status::ENOENT);
        assert!(!dir.path().join("nowhere.conf").exists());
    }

    #[test]
    fn test_del_prunes_blacklist() {
        let dir = TempDir::new().unwrap();
        populate(&dir);

        let mut store = seeded(&dir, 2);
        let status = run(&mut store, "mesh", &["bob".to_string()]).unwrap();
        assert!(status.is_ok());

        let reader = reopen(&dir, "mesh");
        assert_eq!(node_names(&reader), vec!["alice", "carol"]);
        assert!(reader.document().blacklist().is_empty());
    }

    #[test]
    fn test_del_missing_node_continues() {
        let dir = TempDir::new().unwrap();
        populate(&dir);

        let mut store = seeded(&dir, 3);
        let nodes = vec!["mallory".to_string(), "carol".to_string()];
        let status = run(&mut store, "mesh", &nodes).unwrap();
        assert_eq!(status, Status::ENOENT);

        let reader = reopen(&dir, "mesh");
        assert_eq!(node_names(&reader), vec!["alice", "bob"]);
        assert!(reader.document().blacklist().contains("alice", "bob"));
        assert_eq!(reader.document().blacklist().len(), 1);
    }

    #[test]
    fn test_del_cleans_up_legacy_self_pair() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("mesh.conf"),
            "[Node.alice]\n[Node.bob]\n\n[PeerBlacklist]\nBlacklist = [[\"alice\", \"alice\"], [\"alice\", \"bob\"]]\n",
        )
        .unwrap();

        let mut store = seeded(&dir, 4);
        let status = run(&mut store, "mesh", &["alice".to_string()]).unwrap();
        assert!(status.is_ok());

        let reader = reopen(&dir, "mesh");
        assert_eq!(node_names(&reader), vec!["bob"]);
        assert!(reader.document().blacklist().is_empty());
    }
}
