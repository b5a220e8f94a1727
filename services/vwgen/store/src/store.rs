//! Locked access to one network configuration file.

use crate::blacklist::PeerBlacklist;
use crate::error::StoreError;
use crate::lock::{LockMode, LockedFile};
use crate::model::{Document, Network, Node};
use rand::rngs::StdRng;
use rand::{CryptoRng, Rng, SeedableRng};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File extension of network configuration files
pub const CONF_EXTENSION: &str = "conf";

/// What a session intends to do with the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Only read; takes a shared lock
    Read,
    /// Change an existing network; takes an exclusive lock, never creates
    Modify,
    /// Create the network if needed; takes an exclusive lock up front
    Write,
}

impl Intent {
    fn lock_mode(self) -> LockMode {
        match self {
            Intent::Read => LockMode::Shared,
            Intent::Modify | Intent::Write => LockMode::Exclusive,
        }
    }
}

/// Network configuration store backed by `<dir>/<network>.conf`.
///
/// A session is `load`, then reads and mutations through the typed views,
/// then `save` and `close`. The file lock is held from `load` until `close`
/// or drop.
pub struct ConfigStore<R = StdRng> {
    dir: PathBuf,
    name: Option<String>,
    document: Document,
    file: Option<LockedFile>,
    rng: R,
}

impl ConfigStore<StdRng> {
    /// Create a store for network files in `dir`, seeded from the OS
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_rng(dir, StdRng::from_entropy())
    }
}

impl<R> ConfigStore<R> {
    /// Create a store drawing all randomness from `rng`
    pub fn with_rng(dir: impl Into<PathBuf>, rng: R) -> Self {
        Self {
            dir: dir.into(),
            name: None,
            document: Document::default(),
            file: None,
            rng,
        }
    }

    /// Name of the loaded network
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Path of the loaded network's file
    pub fn path(&self) -> Option<PathBuf> {
        self.name.as_deref().map(|name| self.path_for(name))
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, CONF_EXTENSION))
    }

    /// The whole in-memory document
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Live node table
    pub fn nodes(&mut self) -> &mut BTreeMap<String, Node> {
        self.document.nodes_mut()
    }

    /// Live peering blacklist
    pub fn blacklist(&mut self) -> &mut PeerBlacklist {
        self.document.blacklist_mut()
    }

    /// Release the file lock. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(file) = self.file.take() {
            debug!("Closing {:?}", file.path());
        }
    }

    /// Load network `name`, locking its file according to `intent`.
    ///
    /// A trailing `.conf` is stripped from `name`. Returns `false` for a new
    /// network, i.e. a missing or zero-length file.
    ///
    /// [`Intent::Write`] creates the file under its exclusive lock, so two
    /// sessions creating the same network are serialized like any other
    /// writers. With [`Intent::Read`] or [`Intent::Modify`] a missing file
    /// leaves the store unloaded and [`save`](Self::save) does nothing. A file
    /// that fails to parse also leaves the store unloaded with its lock
    /// released.
    pub fn load(&mut self, name: &str, intent: Intent) -> Result<bool, StoreError> {
        let name = name
            .strip_suffix(&format!(".{}", CONF_EXTENSION))
            .unwrap_or(name);
        if name.is_empty() {
            return Err(StoreError::Invalid("network name must not be empty".to_string()));
        }

        self.name = None;
        self.document = Document::default();
        let path = self.path_for(name);

        let text = match self.read_locked(&path, intent) {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!("No configuration at {:?}", path);
                return Ok(false);
            }
            Err(e) => {
                self.close();
                return Err(e);
            }
        };

        let document = match Document::parse(&text) {
            Ok(document) => document,
            Err(e) => {
                self.close();
                return Err(e);
            }
        };
        self.name = Some(name.to_string());
        self.document = document;

        if text.is_empty() {
            debug!("Starting new network at {:?}", path);
            return Ok(false);
        }
        debug!(
            "Loaded {:?} with {} nodes",
            path,
            self.document.nodes().len()
        );
        Ok(true)
    }

    /// Lock `path` for `intent` and read it; `None` when it does not exist.
    fn read_locked(&mut self, path: &Path, intent: Intent) -> Result<Option<String>, StoreError> {
        let opened = match intent {
            Intent::Write => self.create_file(path),
            Intent::Read | Intent::Modify => self.open_file(path, intent.lock_mode()),
        };
        match opened {
            Ok(file) => Ok(Some(file.read_to_string()?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the document back in canonical form.
    ///
    /// A no-op when nothing was loaded. Creates the file when it did not exist,
    /// and upgrades a shared lock to an exclusive one if needed.
    pub fn save(&mut self) -> Result<(), StoreError> {
        let Some(name) = self.name.clone() else {
            return Ok(());
        };
        let data = self.document.to_canonical_string()?;
        let path = self.path_for(&name);

        if let Err(e) = self.open_file(&path, LockMode::Exclusive) {
            if e.kind() != io::ErrorKind::NotFound {
                return Err(e.into());
            }
            debug!("Creating {:?}", path);
            self.close();
            self.file = Some(LockedFile::create(&path)?);
        }
        let file = self.file.as_mut().ok_or(StoreError::NotLoaded)?;
        file.replace_contents(data.as_bytes())?;

        info!("Saved network configuration to {:?}", path);
        Ok(())
    }

    /// Like [`open_file`](Self::open_file) with an exclusive lock, creating
    /// `path` when it is missing.
    fn create_file(&mut self, path: &Path) -> io::Result<&mut LockedFile> {
        let reusable = self
            .file
            .as_ref()
            .map_or(false, |file| file.satisfies(path, LockMode::Exclusive));
        if !reusable {
            self.close();
            self.file = Some(LockedFile::create(path)?);
        }
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "lock not held"))
    }

    /// Reuse the held file when its lock already covers `mode`, otherwise
    /// release it and lock `path` afresh.
    fn open_file(&mut self, path: &Path, mode: LockMode) -> io::Result<&mut LockedFile> {
        let reusable = self
            .file
            .as_ref()
            .map_or(false, |file| file.satisfies(path, mode));
        if !reusable {
            self.close();
            self.file = Some(LockedFile::open(path, mode)?);
        }
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "lock not held"))
    }
}

impl<R: Rng + CryptoRng> ConfigStore<R> {
    /// Network settings, initialized with random defaults on first access
    pub fn network(&mut self) -> &mut Network {
        self.document.network_or_init(&mut self.rng)
    }

    /// Add a node with fresh addresses and key
    pub fn add_node(&mut self, name: &str) -> Result<&Node, StoreError> {
        self.document.add_node(name, &mut self.rng)
    }

    /// Remove a node and its blacklist entries
    pub fn delete_node(&mut self, name: &str) -> Result<Node, StoreError> {
        self.document.remove_node(name)
    }

    /// Random source shared by every operation of this store
    pub fn rng(&mut self) -> &mut R {
        &mut self.rng
    }
}

impl<R> Drop for ConfigStore<R> {
    fn drop(&mut self) {
        self.close();
    }
}
