//! Identity store: callsign → Ed25519 public key, with fixed-record
//! file persistence.

use std::fs;
use std::io;
use std::path::Path;

use log::debug;

use crate::callsign::Callsign;

/// Length of one on-disk record: 6-byte callsign base, 1-byte SSID, 32-byte
/// public key.
pub const RECORD_LEN: usize = 6 + 1 + 32;

/// Errors raised by keyring load/save.
#[derive(Debug, thiserror::Error)]
pub enum KeyringError {
    /// Underlying file I/O failed.
    #[error("keyring I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file size isn't a multiple of [`RECORD_LEN`].
    #[error("keyring file size {size} is not a multiple of {RECORD_LEN}")]
    CorruptFile {
        /// Size of the file in bytes.
        size: u64,
    },

    /// A record's SSID byte decoded to a value above 15.
    #[error("keyring record {index} has an SSID out of range")]
    SsidOutOfRange {
        /// Index of the offending record.
        index: usize,
    },
}

/// A callsign bound to its Ed25519 public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The station's callsign.
    pub callsign: Callsign,
    /// 32-byte Ed25519 public key.
    pub public_key: [u8; 32],
}

/// An ordered, in-memory set of identities.
#[derive(Debug, Default, Clone)]
pub struct Keyring {
    identities: Vec<Identity>,
}

impl Keyring {
    /// An empty keyring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace (in place) the identity for `callsign`.
    pub fn add(&mut self, callsign: Callsign, public_key: [u8; 32]) {
        if let Some(existing) = self.identities.iter_mut().find(|i| i.callsign == callsign) {
            existing.public_key = public_key;
        } else {
            self.identities.push(Identity {
                callsign,
                public_key,
            });
        }
    }

    /// Remove the first identity matching `callsign`, if any, shifting
    /// subsequent entries down. Any other record sharing the same callsign
    /// (possible after loading a file that was never de-duplicated) is left
    /// in place.
    pub fn delete(&mut self, callsign: &Callsign) {
        if let Some(pos) = self.identities.iter().position(|i| &i.callsign == callsign) {
            self.identities.remove(pos);
        }
    }

    /// Find the identity for `callsign`, first match wins.
    pub fn search(&self, callsign: &Callsign) -> Option<&Identity> {
        self.identities.iter().find(|i| &i.callsign == callsign)
    }

    /// Find the first identity whose public key is `key`, regardless of
    /// callsign. Not used by [`crate::windbag::parse_envelope`] itself (see
    /// the `ALTERNATE` open question), but exposed for callers that want to
    /// build that lookup themselves.
    pub fn find_by_key(&self, key: &[u8; 32]) -> Option<&Identity> {
        self.identities.iter().find(|i| &i.public_key == key)
    }

    /// All identities, in insertion order.
    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    /// Load from a packed binary file. A missing file yields an empty
    /// keyring, matching the original's tolerance of `ENOENT`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KeyringError> {
        let path = path.as_ref();
        let data = match fs::read(path) {
            Ok(d) => d,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("keyring: {} not found, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };

        if data.len() % RECORD_LEN != 0 {
            return Err(KeyringError::CorruptFile {
                size: data.len() as u64,
            });
        }

        let mut keyring = Self::new();
        for (index, record) in data.chunks_exact(RECORD_LEN).enumerate() {
            let base_bytes = &record[..6];
            let base_len = base_bytes.iter().position(|&b| b == 0).unwrap_or(6);
            let base = String::from_utf8_lossy(&base_bytes[..base_len]).into_owned();
            let ssid = record[6];
            if ssid > crate::callsign::SSID_MAX {
                return Err(KeyringError::SsidOutOfRange { index });
            }
            let callsign =
                Callsign::new(&base, ssid).map_err(|_| KeyringError::SsidOutOfRange { index })?;
            let mut public_key = [0u8; 32];
            public_key.copy_from_slice(&record[7..39]);
            keyring.identities.push(Identity {
                callsign,
                public_key,
            });
        }
        debug!(
            "keyring: loaded {} identities from {}",
            keyring.identities.len(),
            path.display()
        );
        Ok(keyring)
    }

    /// Rewrite the file from scratch with the current contents, in
    /// insertion order. Creates the parent directory if missing.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), KeyringError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = Vec::with_capacity(self.identities.len() * RECORD_LEN);
        for id in &self.identities {
            let mut base = [0u8; 6];
            let base_bytes = id.callsign.base().as_bytes();
            base[..base_bytes.len()].copy_from_slice(base_bytes);
            out.extend_from_slice(&base);
            out.push(id.callsign.ssid());
            out.extend_from_slice(&id.public_key);
        }
        fs::write(path, out)?;
        debug!(
            "keyring: saved {} identities to {}",
            self.identities.len(),
            path.display()
        );
        Ok(())
    }
}
