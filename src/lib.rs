//! # Credential Store
//!
//! An alias-keyed credential store layered over a conventional key store.
//!
//! A conventional key-store engine addresses entries by a single textual
//! alias and natively holds only three entry kinds: secret keys,
//! private-key-plus-certificate-chain entries, and trusted certificates.
//! This crate overlays a richer model on top of one: a logical credential is
//! identified by `(alias, credential type, algorithm?, parameters?)`, and
//! several such credentials can coexist under the same user-supplied alias.
//!
//! ## Quick start
//!
//! ```
//! use std::collections::BTreeMap;
//! use credential_store::{
//!     BearerTokenCredential, Credential, CredentialStore, CredentialTypeQuery,
//!     ProtectionParameter,
//! };
//!
//! let store = CredentialStore::new();
//! store.initialize(&BTreeMap::new(), ProtectionParameter::None).unwrap();
//!
//! store
//!     .store(
//!         "svc1",
//!         Credential::BearerToken(BearerTokenCredential { token: "tok_abc123".into() }),
//!         None,
//!     )
//!     .unwrap();
//!
//! let retrieved = store
//!     .retrieve("svc1", CredentialTypeQuery::Exact(credential_store::CredentialType::BearerToken), None, None, None)
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(retrieved, Credential::BearerToken(BearerTokenCredential { token: "tok_abc123".into() }));
//! ```
//!
//! ## What's NOT provided
//!
//! - The underlying key-store engine's own on-wire format (this crate ships
//!   one file-backed engine and one in-memory engine; see [`underlying`])
//! - Cryptographic primitive implementations (password hashing, certificate
//!   parsing, key generation) — credentials arrive pre-encoded
//! - Cross-process coordination; concurrency is in-process only
//! - Migration between key-store engine types

mod alias;
mod codec;
mod der;
mod error;
mod index;
mod protection;
mod store;
mod types;
pub mod underlying;

pub use error::StoreError;
pub use protection::ProtectionParameter;
pub use store::{CredentialStore, CredentialStoreConfig};
pub use types::{
    BearerTokenCredential, Credential, CredentialType, CredentialTypeQuery, DigestAlgorithm,
    DigestOrdering, KeyPairCredential, OtpAlgorithm, ParamKey, PasswordAlgorithm, PasswordCredential,
    PasswordShape, PasswordValue, PublicKeyCredential, SecretKeyCredential,
    X509ChainPrivateCredential, X509ChainPublicCredential,
};
