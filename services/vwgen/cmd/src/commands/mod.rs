//! Subcommands. Each one runs a single load, mutate, save, close session
//! against a [`ConfigStore`](vwgen_store::ConfigStore) and reports an errno
//! style [`Status`].

pub mod add;
pub mod blacklist;
pub mod del;
pub mod keys;
pub mod set;
pub mod show;

use std::fmt;
use std::process::ExitCode;

/// Errno-style outcome of a command; batch commands keep the first failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(u8);

impl Status {
    /// Success
    pub const OK: Status = Status(0);
    /// Network or node not found
    pub const ENOENT: Status = Status(2);
    /// Node already exists
    pub const EEXIST: Status = Status(17);
    /// Malformed argument or operation
    pub const EINVAL: Status = Status(22);
    /// Address pool is full
    pub const ENOSPC: Status = Status(28);

    /// Keep `self` if it already records a failure, otherwise take `other`
    pub fn or(self, other: Status) -> Status {
        if self == Status::OK {
            other
        } else {
            self
        }
    }

    /// Whether the command fully succeeded
    pub fn is_ok(self) -> bool {
        self == Status::OK
    }

    /// Numeric exit code
    pub fn code(self) -> u8 {
        self.0
    }
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        ExitCode::from(status.0)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Status::OK => "OK",
            Status::ENOENT => "ENOENT",
            Status::EEXIST => "EEXIST",
            Status::EINVAL => "EINVAL",
            Status::ENOSPC => "ENOSPC",
            _ => "EUNKNOWN",
        };
        write!(f, "{} ({})", name, self.0)
    }
}

/// Message printed when a command needs an existing network file
pub(crate) fn missing_network(network: &str) -> String {
    format!(
        "vwgen: Unable to find configuration file '{}.{}'",
        network,
        vwgen_store::CONF_EXTENSION
    )
}

/// Message printed when a node is not part of the network
pub(crate) fn missing_node(network: &str, node: &str) -> String {
    format!("vwgen: Network '{}' does not have node '{}'", network, node)
}

#[cfg(test)]
pub(crate) mod test_support {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;
    use vwgen_store::{ConfigStore, Intent};

    pub(crate) fn seeded(dir: &TempDir, seed: u64) -> ConfigStore {
        ConfigStore::with_rng(dir.path(), StdRng::seed_from_u64(seed))
    }

    /// Reopen `network` read-only the way a later invocation would
    pub(crate) fn reopen(dir: &TempDir, network: &str) -> ConfigStore {
        let mut store = seeded(dir, 0);
        assert!(store.load(network, Intent::Read).unwrap());
        store
    }

    /// Sorted node names of a loaded store
    pub(crate) fn node_names(store: &ConfigStore) -> Vec<String> {
        store.document().nodes().keys().cloned().collect()
    }
}
