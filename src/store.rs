//! The public façade: `CredentialStore`, guarded by one `RwLock` per the
//! corrected (write-for-mutation) locking discipline.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::alias;
use crate::codec;
use crate::error::StoreError;
use crate::index::Index;
use crate::protection::ProtectionParameter;
use crate::types::{Credential, CredentialTypeQuery, ParamKey};
use crate::underlying::{FileEngine, InMemoryEngine, UnderlyingStore};

/// The four recognized configuration keys; any other key in the attribute
/// map passed to `initialize` is ignored silently.
#[derive(Clone, Debug)]
pub struct CredentialStoreConfig {
    pub location: Option<PathBuf>,
    pub modifiable: bool,
    pub create: bool,
    pub key_store_type: Option<String>,
}

impl Default for CredentialStoreConfig {
    fn default() -> Self {
        Self { location: None, modifiable: true, create: false, key_store_type: None }
    }
}

impl CredentialStoreConfig {
    /// Parse the recognized subset of a raw attribute map, defaulting and
    /// ignoring unknown keys. `keyStoreType` is accepted and recorded for
    /// parity with the configuration surface but does not currently select
    /// between engines — this crate ships exactly one file-backed engine
    /// and one in-memory engine, chosen by whether `location` is set.
    pub fn from_attributes(attrs: &BTreeMap<String, String>) -> Self {
        let location = attrs.get("location").filter(|v| !v.is_empty()).map(PathBuf::from);
        let modifiable = attrs.get("modifiable").map(|v| v != "false").unwrap_or(true);
        let create = attrs.get("create").map(|v| v == "true").unwrap_or(false);
        let key_store_type = attrs.get("keyStoreType").cloned();
        Self { location, modifiable, create, key_store_type }
    }
}

struct StoreState {
    config: CredentialStoreConfig,
    underlying: Box<dyn UnderlyingStore + Send + Sync>,
    index: Index,
    default_protection: ProtectionParameter,
}

/// A credential store layered over a conventional key store.
///
/// `initialize` must be called once before any other operation; every other
/// operation on an uninitialized store fails with `StoreError::NotInitialized`.
pub struct CredentialStore {
    state: RwLock<Option<StoreState>>,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    pub fn new() -> Self {
        Self { state: RwLock::new(None) }
    }

    pub fn initialize(
        &self,
        attrs: &BTreeMap<String, String>,
        protection: ProtectionParameter,
    ) -> Result<(), StoreError> {
        let mut guard = self.state.write().unwrap();

        let config = CredentialStoreConfig::from_attributes(attrs);
        let mut index = Index::new();

        let underlying: Box<dyn UnderlyingStore + Send + Sync> = match &config.location {
            Some(path) if path.exists() => {
                tracing::debug!(location = %path.display(), "loading credential store");
                let engine = FileEngine::load(path, protection.as_password())?;
                reconstruct_index(&engine, &mut index);
                Box::new(engine)
            }
            Some(path) if config.create => {
                tracing::debug!(location = %path.display(), "creating empty credential store");
                Box::new(FileEngine::create_empty(path.clone()))
            }
            Some(_) => return Err(StoreError::AutomaticCreationDisabled),
            None => Box::new(InMemoryEngine::new()),
        };

        *guard = Some(StoreState { config, underlying, index, default_protection: protection });
        Ok(())
    }

    pub fn is_modifiable(&self) -> Result<bool, StoreError> {
        let guard = self.state.read().unwrap();
        let state = guard.as_ref().ok_or(StoreError::NotInitialized)?;
        Ok(state.config.modifiable)
    }

    pub fn store(
        &self,
        alias_in: &str,
        credential: Credential,
        protection: Option<&ProtectionParameter>,
    ) -> Result<(), StoreError> {
        let mut guard = self.state.write().unwrap();
        let state = guard.as_mut().ok_or(StoreError::NotInitialized)?;
        if !state.config.modifiable {
            return Err(StoreError::NonModifiable);
        }
        // Resolved for parity with the public contract; this crate's
        // engines seal the whole container under one password rather than
        // individual entries, so a per-call override has nothing further to
        // apply to beyond the shape validation `ProtectionParameter` already
        // gives for free.
        let _ = crate::protection::resolve(protection, &state.default_protection);

        let credential_type = credential.credential_type();
        let algorithm = credential.algorithm();
        let underlying_entry = codec::encode_credential(&credential).map_err(|e| e.with_alias(alias_in))?;
        let underlying_alias = alias::encode(alias_in, credential_type, algorithm.as_deref(), None);

        let old_alias = state.index.insert(
            alias_in.to_lowercase(),
            credential_type,
            algorithm.map(|a| a.to_lowercase()),
            None,
            underlying_alias.clone(),
        );
        let new_alias_for_cleanup = underlying_alias.clone();
        state.underlying.set(underlying_alias, underlying_entry);
        if let Some(old_alias) = old_alias {
            if old_alias != new_alias_for_cleanup {
                state.underlying.delete(&old_alias);
            }
        }

        tracing::debug!(alias = alias_in, ?credential_type, "stored credential");
        Ok(())
    }

    pub fn retrieve(
        &self,
        alias_in: &str,
        type_query: CredentialTypeQuery,
        algorithm: Option<&str>,
        params: Option<&[u8]>,
        protection: Option<&ProtectionParameter>,
    ) -> Result<Option<Credential>, StoreError> {
        let guard = self.state.read().unwrap();
        let state = guard.as_ref().ok_or(StoreError::NotInitialized)?;
        let _ = crate::protection::resolve(protection, &state.default_protection);

        let alias_lc = alias_in.to_lowercase();
        let algorithm_lc = algorithm.map(|a| a.to_lowercase());
        let params_key = params.map(|p| ParamKey::new(p.to_vec()));

        let Some(hit) = state.index.lookup(&alias_lc, type_query, algorithm_lc.as_deref(), params_key.as_ref())
        else {
            return Ok(None);
        };

        let entry = state.underlying.get(&hit.underlying_alias).ok_or_else(|| {
            StoreError::CannotRead(format!(
                "indexed underlying alias '{}' is missing from the container",
                hit.underlying_alias
            ))
        })?;

        let credential = codec::decode_credential(hit.credential_type, hit.algorithm_lc.as_deref(), entry)
            .map_err(|e| e.with_alias(alias_in))?;

        if let (Credential::SecretKey(sk), Some(expected)) = (&credential, hit.algorithm_lc.as_deref()) {
            if sk.algorithm.to_lowercase() != expected {
                return Err(StoreError::InvalidEntryType {
                    alias: alias_in.to_string(),
                    expected: "secret-key (algorithm matches alias)",
                    found: "secret-key (algorithm mismatch)",
                });
            }
        }

        Ok(Some(credential))
    }

    pub fn remove(
        &self,
        alias_in: &str,
        type_query: CredentialTypeQuery,
        algorithm: Option<&str>,
        params: Option<&[u8]>,
    ) -> Result<(), StoreError> {
        let mut guard = self.state.write().unwrap();
        let state = guard.as_mut().ok_or(StoreError::NotInitialized)?;
        if !state.config.modifiable {
            return Err(StoreError::NonModifiable);
        }

        let alias_lc = alias_in.to_lowercase();
        let algorithm_lc = algorithm.map(|a| a.to_lowercase());
        let params_key = params.map(|p| ParamKey::new(p.to_vec()));

        let removed = state.index.remove(&alias_lc, type_query, algorithm_lc.as_deref(), params_key.as_ref());
        for underlying_alias in &removed {
            if !state.underlying.delete(underlying_alias) {
                tracing::warn!(underlying_alias, "index referenced an alias missing from the container");
            }
        }
        tracing::debug!(alias = alias_in, removed = removed.len(), "removed credentials");
        Ok(())
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        let guard = self.state.write().unwrap();
        let state = guard.as_ref().ok_or(StoreError::NotInitialized)?;
        if state.config.location.is_none() {
            return Ok(());
        }
        state.underlying.flush(state.default_protection.as_password())?;
        tracing::debug!("flushed credential store");
        Ok(())
    }

    pub fn aliases(&self) -> Result<Vec<String>, StoreError> {
        let guard = self.state.read().unwrap();
        let state = guard.as_ref().ok_or(StoreError::NotInitialized)?;
        Ok(state.index.aliases().map(str::to_string).collect())
    }
}

fn reconstruct_index(engine: &FileEngine, index: &mut Index) {
    for underlying_alias in engine.aliases() {
        match alias::decode(&underlying_alias) {
            Some(decoded) => {
                index.insert(
                    decoded.alias_lc,
                    decoded.credential_type,
                    decoded.algorithm_lc,
                    decoded.params_der.map(ParamKey::new),
                    underlying_alias,
                );
            }
            None => {
                tracing::warn!(underlying_alias, "skipping alias that does not match the encoding grammar");
            }
        }
    }
}
