//! Credential variants, the closed password-algorithm set, and `ParamKey`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use zeroize::{Zeroize, ZeroizeOnDrop};

// ---------------------------------------------------------------------------
// Credential type tags
// ---------------------------------------------------------------------------

/// The closed set of credential variants this store understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CredentialType {
    SecretKey,
    PublicKey,
    KeyPair,
    X509ChainPublic,
    X509ChainPrivate,
    BearerToken,
    Password,
}

impl CredentialType {
    /// Canonical lower-case alias token (`[a-z0-9_]+`, no hyphens — the
    /// `AliasCodec` grammar reserves hyphens for the algorithm segment).
    pub fn token(&self) -> &'static str {
        match self {
            Self::SecretKey => "secret_key",
            Self::PublicKey => "public_key",
            Self::KeyPair => "key_pair",
            Self::X509ChainPublic => "x509_chain_public",
            Self::X509ChainPrivate => "x509_chain_private",
            Self::BearerToken => "bearer_token",
            Self::Password => "password",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "secret_key" => Self::SecretKey,
            "public_key" => Self::PublicKey,
            "key_pair" => Self::KeyPair,
            "x509_chain_public" => Self::X509ChainPublic,
            "x509_chain_private" => Self::X509ChainPrivate,
            "bearer_token" => Self::BearerToken,
            "password" => Self::Password,
            _ => return None,
        })
    }
}

/// A (possibly loose) request for a credential type.
///
/// `retrieve`/`remove` accept this instead of a bare [`CredentialType`] so
/// that a caller can ask for any member of a family ("any key-shaped
/// credential", "any X.509 chain"): a request for a supertype matches the
/// first indexed subtype found, in mid-map insertion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialTypeQuery {
    Exact(CredentialType),
    AnyKeyCredential,
    AnyX509Chain,
    Any,
}

impl CredentialTypeQuery {
    pub fn matches(&self, candidate: CredentialType) -> bool {
        match self {
            Self::Exact(t) => *t == candidate,
            Self::AnyKeyCredential => matches!(
                candidate,
                CredentialType::SecretKey | CredentialType::PublicKey | CredentialType::KeyPair
            ),
            Self::AnyX509Chain => matches!(
                candidate,
                CredentialType::X509ChainPublic | CredentialType::X509ChainPrivate
            ),
            Self::Any => true,
        }
    }

    /// The exact type to mint when storing, if this query pins one down.
    pub fn exact(&self) -> Option<CredentialType> {
        match self {
            Self::Exact(t) => Some(*t),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Digest / ordering helpers for the password algorithm families
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Md2,
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    fn token(&self) -> &'static str {
        match self {
            Self::Md2 => "md2",
            Self::Md5 => "md5",
            Self::Sha1 => "sha",
            Self::Sha256 => "sha-256",
            Self::Sha384 => "sha-384",
            Self::Sha512 => "sha-512",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DigestOrdering {
    SaltPassword,
    PasswordSalt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OtpAlgorithm {
    Md5,
    Sha1,
}

// ---------------------------------------------------------------------------
// Password algorithms (closed set)
// ---------------------------------------------------------------------------

/// Which DER shape a password algorithm encodes as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasswordShape {
    /// `SEQUENCE { hash, salt, iterationCount }`
    IteratedSalted,
    /// `OCTET_STRING utf8(password)`
    Clear,
    /// `SEQUENCE { username, realm, digest }`
    Digest,
    /// `SEQUENCE { hash, seed, sequenceNumber }`
    Otp,
    /// `SEQUENCE { hash, salt }`
    Salted,
    /// `SEQUENCE { digest }`
    Simple,
    /// `SEQUENCE { initialKeyMaterial, iterationCount, salt, maskedBytes }`
    Masked,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PasswordAlgorithm {
    Bcrypt,
    BsdDesCrypt,
    ScramSha1,
    ScramSha256,
    ScramSha384,
    ScramSha512,
    SunCryptMd5,
    SunCryptMd5BareSalt,
    CryptSha256,
    CryptSha512,
    Clear,
    Digest(DigestAlgorithm),
    Otp(OtpAlgorithm),
    SaltedSimpleDigest(DigestOrdering, DigestAlgorithm),
    UnixDesCrypt,
    UnixMd5Crypt,
    SimpleDigest(DigestAlgorithm),
    /// Any of the masked-password family; the payload is the standard
    /// algorithm name (e.g. `masked-md5-des`), validated to carry the
    /// `masked-` prefix required by the closed set.
    Masked(String),
}

impl PasswordAlgorithm {
    pub fn shape(&self) -> PasswordShape {
        match self {
            Self::Bcrypt
            | Self::BsdDesCrypt
            | Self::ScramSha1
            | Self::ScramSha256
            | Self::ScramSha384
            | Self::ScramSha512
            | Self::SunCryptMd5
            | Self::SunCryptMd5BareSalt
            | Self::CryptSha256
            | Self::CryptSha512 => PasswordShape::IteratedSalted,
            Self::Clear => PasswordShape::Clear,
            Self::Digest(_) => PasswordShape::Digest,
            Self::Otp(_) => PasswordShape::Otp,
            Self::SaltedSimpleDigest(..) | Self::UnixDesCrypt | Self::UnixMd5Crypt => {
                PasswordShape::Salted
            }
            Self::SimpleDigest(_) => PasswordShape::Simple,
            Self::Masked(_) => PasswordShape::Masked,
        }
    }

    /// Canonical lower-case algorithm token for the composite alias.
    /// May contain hyphens (the grammar's algorithm segment allows them).
    pub fn token(&self) -> String {
        match self {
            Self::Bcrypt => "bcrypt".to_string(),
            Self::BsdDesCrypt => "bsd-crypt-des".to_string(),
            Self::ScramSha1 => "scram-sha-1".to_string(),
            Self::ScramSha256 => "scram-sha-256".to_string(),
            Self::ScramSha384 => "scram-sha-384".to_string(),
            Self::ScramSha512 => "scram-sha-512".to_string(),
            Self::SunCryptMd5 => "sun-crypt-md5".to_string(),
            Self::SunCryptMd5BareSalt => "sun-crypt-md5-bare-salt".to_string(),
            Self::CryptSha256 => "crypt-sha-256".to_string(),
            Self::CryptSha512 => "crypt-sha-512".to_string(),
            Self::Clear => "clear".to_string(),
            Self::Digest(d) => format!("digest-{}", d.token()),
            Self::Otp(OtpAlgorithm::Md5) => "otp-md5".to_string(),
            Self::Otp(OtpAlgorithm::Sha1) => "otp-sha1".to_string(),
            Self::SaltedSimpleDigest(DigestOrdering::SaltPassword, d) => {
                format!("salted-simple-digest-{}", d.token())
            }
            Self::SaltedSimpleDigest(DigestOrdering::PasswordSalt, d) => {
                format!("simple-digest-salted-{}", d.token())
            }
            Self::UnixDesCrypt => "unix-des-crypt".to_string(),
            Self::UnixMd5Crypt => "unix-md5-crypt".to_string(),
            Self::SimpleDigest(d) => format!("simple-digest-{}", d.token()),
            Self::Masked(name) => name.clone(),
        }
    }

    /// Parse back a password algorithm from its alias token. `masked-*`
    /// names are accepted wholesale since the masked family is open-ended
    /// by name but closed by shape.
    pub fn from_token(token: &str) -> Option<Self> {
        use DigestAlgorithm::*;
        Some(match token {
            "bcrypt" => Self::Bcrypt,
            "bsd-crypt-des" => Self::BsdDesCrypt,
            "scram-sha-1" => Self::ScramSha1,
            "scram-sha-256" => Self::ScramSha256,
            "scram-sha-384" => Self::ScramSha384,
            "scram-sha-512" => Self::ScramSha512,
            "sun-crypt-md5" => Self::SunCryptMd5,
            "sun-crypt-md5-bare-salt" => Self::SunCryptMd5BareSalt,
            "crypt-sha-256" => Self::CryptSha256,
            "crypt-sha-512" => Self::CryptSha512,
            "clear" => Self::Clear,
            "digest-md5" => Self::Digest(Md5),
            "digest-sha" => Self::Digest(Sha1),
            "digest-sha-256" => Self::Digest(Sha256),
            "digest-sha-384" => Self::Digest(Sha384),
            "digest-sha-512" => Self::Digest(Sha512),
            "otp-md5" => Self::Otp(OtpAlgorithm::Md5),
            "otp-sha1" => Self::Otp(OtpAlgorithm::Sha1),
            "unix-des-crypt" => Self::UnixDesCrypt,
            "unix-md5-crypt" => Self::UnixMd5Crypt,
            "simple-digest-md2" => Self::SimpleDigest(Md2),
            "simple-digest-md5" => Self::SimpleDigest(Md5),
            "simple-digest-sha" => Self::SimpleDigest(Sha1),
            "simple-digest-sha-256" => Self::SimpleDigest(Sha256),
            "simple-digest-sha-384" => Self::SimpleDigest(Sha384),
            "simple-digest-sha-512" => Self::SimpleDigest(Sha512),
            "salted-simple-digest-md5" => {
                Self::SaltedSimpleDigest(DigestOrdering::SaltPassword, Md5)
            }
            "salted-simple-digest-sha" => {
                Self::SaltedSimpleDigest(DigestOrdering::SaltPassword, Sha1)
            }
            "salted-simple-digest-sha-256" => {
                Self::SaltedSimpleDigest(DigestOrdering::SaltPassword, Sha256)
            }
            "simple-digest-salted-md5" => {
                Self::SaltedSimpleDigest(DigestOrdering::PasswordSalt, Md5)
            }
            "simple-digest-salted-sha" => {
                Self::SaltedSimpleDigest(DigestOrdering::PasswordSalt, Sha1)
            }
            other if other.starts_with("masked-") => Self::Masked(other.to_string()),
            _ => return None,
        })
    }
}

/// Holds the decoded secret material of a password entry, so it carries its
/// own [`Zeroize`]/[`ZeroizeOnDrop`] rather than relying on the caller to
/// scrub it.
#[derive(Clone, Debug, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub enum PasswordValue {
    IteratedSalted { hash: Vec<u8>, salt: Vec<u8>, iteration_count: i64 },
    Clear(String),
    Digest { username: String, realm: String, digest: Vec<u8> },
    Otp { hash: Vec<u8>, seed: Vec<u8>, sequence_number: i64 },
    Salted { hash: Vec<u8>, salt: Vec<u8> },
    Simple { digest: Vec<u8> },
    Masked { initial_key_material: String, iteration_count: i64, salt: Vec<u8>, masked: Vec<u8> },
}

impl PasswordValue {
    pub fn shape(&self) -> PasswordShape {
        match self {
            Self::IteratedSalted { .. } => PasswordShape::IteratedSalted,
            Self::Clear(_) => PasswordShape::Clear,
            Self::Digest { .. } => PasswordShape::Digest,
            Self::Otp { .. } => PasswordShape::Otp,
            Self::Salted { .. } => PasswordShape::Salted,
            Self::Simple { .. } => PasswordShape::Simple,
            Self::Masked { .. } => PasswordShape::Masked,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordCredential {
    pub algorithm: PasswordAlgorithm,
    pub value: PasswordValue,
}

// ---------------------------------------------------------------------------
// The seven credential variants
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretKeyCredential {
    pub algorithm: String,
    /// The key's opaque encoding, unwrapped.
    pub encoded: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKeyCredential {
    pub algorithm: String,
    /// The X.509 `SubjectPublicKeyInfo` bytes of the key, unwrapped.
    pub spki: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyPairCredential {
    pub algorithm: String,
    pub public_spki: Vec<u8>,
    pub private_pkcs8: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct X509ChainPublicCredential {
    pub algorithm: String,
    /// Ordered, non-empty chain of DER certificate bytes.
    pub chain: Vec<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct X509ChainPrivateCredential {
    pub algorithm: String,
    pub private_pkcs8: Vec<u8>,
    pub chain: Vec<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct BearerTokenCredential {
    pub token: String,
}

/// The closed set of credential shapes this store can hold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credential {
    SecretKey(SecretKeyCredential),
    PublicKey(PublicKeyCredential),
    KeyPair(KeyPairCredential),
    X509ChainPublic(X509ChainPublicCredential),
    X509ChainPrivate(X509ChainPrivateCredential),
    BearerToken(BearerTokenCredential),
    Password(PasswordCredential),
}

impl Credential {
    pub fn credential_type(&self) -> CredentialType {
        match self {
            Self::SecretKey(_) => CredentialType::SecretKey,
            Self::PublicKey(_) => CredentialType::PublicKey,
            Self::KeyPair(_) => CredentialType::KeyPair,
            Self::X509ChainPublic(_) => CredentialType::X509ChainPublic,
            Self::X509ChainPrivate(_) => CredentialType::X509ChainPrivate,
            Self::BearerToken(_) => CredentialType::BearerToken,
            Self::Password(_) => CredentialType::Password,
        }
    }

    /// The algorithm carried by this credential, if any. `BearerToken`
    /// carries neither algorithm nor parameters.
    pub fn algorithm(&self) -> Option<String> {
        match self {
            Self::SecretKey(c) => Some(c.algorithm.clone()),
            Self::PublicKey(c) => Some(c.algorithm.clone()),
            Self::KeyPair(c) => Some(c.algorithm.clone()),
            Self::X509ChainPublic(c) => Some(c.algorithm.clone()),
            Self::X509ChainPrivate(c) => Some(c.algorithm.clone()),
            Self::BearerToken(_) => None,
            Self::Password(c) => Some(c.algorithm.token()),
        }
    }
}

// ---------------------------------------------------------------------------
// ParamKey
// ---------------------------------------------------------------------------

/// Value-equality wrapper over an algorithm-parameter spec.
///
/// Parameter specs are, in this crate, already-DER-encoded opaque bytes —
/// parsing them is an out-of-scope external collaborator — so structural
/// equality reduces to byte equality of the DER form. The cached hash
/// avoids re-hashing a potentially large DER blob on every index lookup.
#[derive(Clone, Debug)]
pub struct ParamKey {
    der: Vec<u8>,
    hash: u64,
}

impl ParamKey {
    pub fn new(der: Vec<u8>) -> Self {
        let mut hasher = DefaultHasher::new();
        der.hash(&mut hasher);
        let hash = hasher.finish();
        Self { der, hash }
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }
}

impl PartialEq for ParamKey {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for ParamKey {}

impl Hash for ParamKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}
