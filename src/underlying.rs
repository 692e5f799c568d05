//! The "conventional key store" this crate overlays: a generic container
//! keyed by a single textual alias, natively holding only three entry
//! kinds. Its own on-wire format is an out-of-scope external collaborator —
//! [`UnderlyingStore`] stands in for it, with two concrete engines: an
//! in-memory one for `location`-less stores and tests, and a file-backed one
//! that persists a JSON envelope with atomic replace, optionally sealed
//! under AES-256-GCM when a protection password is configured.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::Aes256Gcm;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::StoreError;

const SCHEMA_VERSION: u32 = 1;
const AES_GCM_NONCE_BYTES: usize = 12;
const AES_GCM_AAD: &[u8] = b"credential-store-file-v1";

/// The three entry kinds the underlying container natively supports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnderlyingEntry {
    SecretKey { algorithm: String, encoded: Vec<u8> },
    PrivateKeyChain { algorithm: String, private_key: Vec<u8>, chain: Vec<Vec<u8>> },
    /// Never produced by `CredentialCodec`; present so a tampered or
    /// foreign-written entry of this kind is still representable and can be
    /// rejected with `InvalidEntryType` rather than silently misread.
    TrustedCertificate { cert: Vec<u8> },
}

impl UnderlyingEntry {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SecretKey { .. } => "secret-key",
            Self::PrivateKeyChain { .. } => "private-key-chain",
            Self::TrustedCertificate { .. } => "trusted-certificate",
        }
    }
}

/// The generic keyed container this crate layers a richer model on top of.
pub trait UnderlyingStore {
    fn get(&self, alias: &str) -> Option<&UnderlyingEntry>;
    fn set(&mut self, alias: String, entry: UnderlyingEntry);
    fn delete(&mut self, alias: &str) -> bool;
    fn contains_alias(&self, alias: &str) -> bool;
    fn aliases(&self) -> Vec<String>;
    /// Persist to the backing location, if any. A no-op for an in-memory
    /// engine (there is nowhere to persist to).
    fn flush(&self, password: Option<&str>) -> Result<(), StoreError>;
}

/// A store with no backing file: every entry lives only as long as the
/// process. Used when `location` is absent from the store configuration.
#[derive(Default)]
pub struct InMemoryEngine {
    entries: BTreeMap<String, UnderlyingEntry>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UnderlyingStore for InMemoryEngine {
    fn get(&self, alias: &str) -> Option<&UnderlyingEntry> {
        self.entries.get(alias)
    }

    fn set(&mut self, alias: String, entry: UnderlyingEntry) {
        self.entries.insert(alias, entry);
    }

    fn delete(&mut self, alias: &str) -> bool {
        self.entries.remove(alias).is_some()
    }

    fn contains_alias(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    fn aliases(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn flush(&self, _password: Option<&str>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind")]
enum StoredEntry {
    SecretKey { algorithm: String, encoded_hex: String },
    PrivateKeyChain { algorithm: String, private_key_hex: String, chain_hex: Vec<String> },
    TrustedCertificate { cert_hex: String },
}

impl From<&UnderlyingEntry> for StoredEntry {
    fn from(entry: &UnderlyingEntry) -> Self {
        match entry {
            UnderlyingEntry::SecretKey { algorithm, encoded } => {
                Self::SecretKey { algorithm: algorithm.clone(), encoded_hex: hex::encode(encoded) }
            }
            UnderlyingEntry::PrivateKeyChain { algorithm, private_key, chain } => {
                Self::PrivateKeyChain {
                    algorithm: algorithm.clone(),
                    private_key_hex: hex::encode(private_key),
                    chain_hex: chain.iter().map(hex::encode).collect(),
                }
            }
            UnderlyingEntry::TrustedCertificate { cert } => {
                Self::TrustedCertificate { cert_hex: hex::encode(cert) }
            }
        }
    }
}

impl TryFrom<StoredEntry> for UnderlyingEntry {
    type Error = StoreError;

    fn try_from(stored: StoredEntry) -> Result<Self, StoreError> {
        let decode = |h: &str| {
            hex::decode(h).map_err(|e| StoreError::CannotInitialize(format!("corrupt hex in persisted entry: {e}")))
        };
        Ok(match stored {
            StoredEntry::SecretKey { algorithm, encoded_hex } => {
                Self::SecretKey { algorithm, encoded: decode(&encoded_hex)? }
            }
            StoredEntry::PrivateKeyChain { algorithm, private_key_hex, chain_hex } => {
                let private_key = decode(&private_key_hex)?;
                let chain = chain_hex.iter().map(|h| decode(h)).collect::<Result<Vec<_>, _>>()?;
                Self::PrivateKeyChain { algorithm, private_key, chain }
            }
            StoredEntry::TrustedCertificate { cert_hex } => {
                Self::TrustedCertificate { cert: decode(&cert_hex)? }
            }
        })
    }
}

#[derive(Serialize, Deserialize)]
struct FileEnvelope {
    schema_version: u32,
    sealed: bool,
    payload_hex: String,
}

fn derive_key(password: &str) -> [u8; 32] {
    let digest = Sha256::digest(password.as_bytes());
    let mut key = [0u8; 32];
    key.copy_from_slice(&digest);
    key
}

fn seal(plaintext: &[u8], password: &str) -> Result<Vec<u8>, StoreError> {
    let key = derive_key(password);
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|_| StoreError::CannotFlush("invalid key material length".into()))?;
    let mut nonce = [0u8; AES_GCM_NONCE_BYTES];
    OsRng.fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt((&nonce).into(), Payload { msg: plaintext, aad: AES_GCM_AAD })
        .map_err(|_| StoreError::CannotFlush("sealing the persisted container failed".into()))?;
    let mut sealed = Vec::with_capacity(AES_GCM_NONCE_BYTES + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

fn unseal(sealed: &[u8], password: &str) -> Result<Vec<u8>, StoreError> {
    if sealed.len() <= AES_GCM_NONCE_BYTES {
        return Err(StoreError::CannotInitialize("sealed container payload is truncated".into()));
    }
    let key = derive_key(password);
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|_| StoreError::CannotInitialize("invalid key material length".into()))?;
    let (nonce, ciphertext) = sealed.split_at(AES_GCM_NONCE_BYTES);
    cipher
        .decrypt(nonce.into(), Payload { msg: ciphertext, aad: AES_GCM_AAD })
        .map_err(|_| StoreError::CannotInitialize("container password is incorrect or the file is corrupt".into()))
}

/// A store persisted as a JSON envelope at `location`, with atomic
/// temp-file-then-rename replacement on `flush`.
pub struct FileEngine {
    location: PathBuf,
    entries: BTreeMap<String, UnderlyingEntry>,
}

impl FileEngine {
    pub fn create_empty(location: PathBuf) -> Self {
        Self { location, entries: BTreeMap::new() }
    }

    pub fn load(location: &Path, password: Option<&str>) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(location)
            .map_err(|e| StoreError::CannotInitialize(format!("reading {}: {e}", location.display())))?;
        let envelope: FileEnvelope = serde_json::from_str(&raw)
            .map_err(|e| StoreError::CannotInitialize(format!("parsing {}: {e}", location.display())))?;
        if envelope.schema_version != SCHEMA_VERSION {
            return Err(StoreError::CannotInitialize(format!(
                "unsupported schema_version {} (expected {SCHEMA_VERSION})",
                envelope.schema_version
            )));
        }
        let payload = hex::decode(&envelope.payload_hex)
            .map_err(|e| StoreError::CannotInitialize(format!("corrupt envelope payload: {e}")))?;
        let plaintext = if envelope.sealed {
            let password = password
                .ok_or_else(|| StoreError::CannotInitialize("container is sealed but no password was supplied".into()))?;
            unseal(&payload, password)?
        } else {
            payload
        };
        let stored: BTreeMap<String, StoredEntry> = serde_json::from_slice(&plaintext)
            .map_err(|e| StoreError::CannotInitialize(format!("decoding container entries: {e}")))?;
        let mut entries = BTreeMap::new();
        for (alias, stored_entry) in stored {
            entries.insert(alias, UnderlyingEntry::try_from(stored_entry)?);
        }
        Ok(Self { location: location.to_path_buf(), entries })
    }

}

fn tmp_path_for(location: &Path) -> PathBuf {
    let mut name = location.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    location.with_file_name(name)
}

impl UnderlyingStore for FileEngine {
    fn get(&self, alias: &str) -> Option<&UnderlyingEntry> {
        self.entries.get(alias)
    }

    fn set(&mut self, alias: String, entry: UnderlyingEntry) {
        self.entries.insert(alias, entry);
    }

    fn delete(&mut self, alias: &str) -> bool {
        self.entries.remove(alias).is_some()
    }

    fn contains_alias(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    fn aliases(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Serialize to a temporary file beside `location`, then atomically
    /// replace it. On any failure before the rename, the original file is
    /// untouched; the temporary file is removed on a best-effort basis, with
    /// a cleanup failure recorded as a chained cause of the original error.
    fn flush(&self, password: Option<&str>) -> Result<(), StoreError> {
        let stored: BTreeMap<String, StoredEntry> =
            self.entries.iter().map(|(alias, entry)| (alias.clone(), StoredEntry::from(entry))).collect();
        let plaintext = serde_json::to_vec(&stored)
            .map_err(|e| StoreError::CannotFlush(format!("encoding container entries: {e}")))?;
        let (sealed, payload) = match password {
            Some(password) => (true, seal(&plaintext, password)?),
            None => (false, plaintext),
        };
        let envelope = FileEnvelope { schema_version: SCHEMA_VERSION, sealed, payload_hex: hex::encode(payload) };
        let encoded = serde_json::to_string_pretty(&envelope)
            .map_err(|e| StoreError::CannotFlush(format!("encoding container envelope: {e}")))?;

        let tmp_path = tmp_path_for(&self.location);
        if let Err(e) = std::fs::write(&tmp_path, encoded.as_bytes()) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(StoreError::CannotFlush(format!(
                "writing temporary container file {}: {e}",
                tmp_path.display()
            )));
        }
        if let Err(e) = std::fs::rename(&tmp_path, &self.location) {
            let primary = format!("replacing {} with the updated container: {e}", self.location.display());
            let message = match std::fs::remove_file(&tmp_path) {
                Ok(()) => primary,
                Err(cleanup_err) => format!("{primary} (cleanup of temporary file also failed: {cleanup_err})"),
            };
            return Err(StoreError::CannotFlush(message));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_engine_round_trips() {
        let mut engine = InMemoryEngine::new();
        engine.set("a".into(), UnderlyingEntry::SecretKey { algorithm: "aes".into(), encoded: vec![1, 2, 3] });
        assert!(engine.contains_alias("a"));
        assert_eq!(engine.aliases(), vec!["a".to_string()]);
        assert!(engine.delete("a"));
        assert!(!engine.contains_alias("a"));
    }

    #[test]
    fn file_engine_round_trips_unsealed() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join("store.json");
        let mut engine = FileEngine::create_empty(location.clone());
        engine.set(
            "u/password/bcrypt/".into(),
            UnderlyingEntry::SecretKey { algorithm: "bcrypt".into(), encoded: vec![9, 9, 9] },
        );
        engine.flush(None).unwrap();

        let reloaded = FileEngine::load(&location, None).unwrap();
        assert_eq!(reloaded.aliases(), vec!["u/password/bcrypt/".to_string()]);
        assert_eq!(
            reloaded.get("u/password/bcrypt/"),
            Some(&UnderlyingEntry::SecretKey { algorithm: "bcrypt".into(), encoded: vec![9, 9, 9] })
        );
    }

    #[test]
    fn file_engine_round_trips_sealed() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join("store.json");
        let mut engine = FileEngine::create_empty(location.clone());
        engine.set("svc1/bearer_token//".into(), UnderlyingEntry::SecretKey { algorithm: String::new(), encoded: b"tok".to_vec() });
        engine.flush(Some("hunter2")).unwrap();

        let reloaded = FileEngine::load(&location, Some("hunter2")).unwrap();
        assert_eq!(reloaded.aliases().len(), 1);

        let wrong_password = FileEngine::load(&location, Some("wrong"));
        assert!(wrong_password.is_err());

        let no_password = FileEngine::load(&location, None);
        assert!(no_password.is_err());
    }

    #[test]
    fn flush_leaves_original_untouched_when_location_is_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join("missing-dir").join("store.json");
        let engine = FileEngine::create_empty(location.clone());
        assert!(engine.flush(None).is_err());
        assert!(!location.exists());
    }
}
