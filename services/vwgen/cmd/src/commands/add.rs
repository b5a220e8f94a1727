//! `vwgen add <network> <node>...`

use super::Status;
use anyhow::Result;
use rand::{CryptoRng, Rng};
use vwgen_alloc::AllocError;
use vwgen_store::{ConfigStore, Intent, StoreError};

/// Add nodes with fresh keys and addresses.
///
/// Taken names are reported and skipped. A full address pool stops the batch;
/// nodes added before that are still saved.
pub fn run<R: Rng + CryptoRng>(
    store: &mut ConfigStore<R>,
    network: &str,
    nodes: &[String],
) -> Result<Status> {
    let existed = store.load(network, Intent::Write)?;
    if !existed {
        crate::component_debug!("add", "Creating network {}", network);
    }
    store.network();

    let mut status = Status::OK;
    for name in nodes {
        match store.add_node(name) {
            Ok(node) => {
                crate::component_debug!(
                    "add",
                    "Added node {} with addresses {:?}",
                    name,
                    node.address
                );
            }
            Err(StoreError::NodeExists(_)) => {
                eprintln!("vwgen: Network '{}' already has node '{}'", network, name);
                status = status.or(Status::EEXIST);
            }
            Err(StoreError::Invalid(reason)) => {
                eprintln!("vwgen: {}", reason);
                status = status.or(Status::EINVAL);
            }
            Err(StoreError::Alloc(AllocError::PoolExhausted { pool, capacity })) => {
                eprintln!(
                    "vwgen: Address pool {} is full ({} addresses), not adding '{}'",
                    pool, capacity, name
                );
                status = status.or(Status::ENOSPC);
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    store.save()?;
    store.close();
    Ok(status)
}
