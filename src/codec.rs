//! `CredentialCodec`: encodes each credential variant into the blob the
//! underlying container accepts, and decodes it back.
//!
//! Every variant except [`X509ChainPrivateCredential`] becomes the byte
//! array of a synthetic secret-key entry tagged with algorithm OID
//! `1.2.840.113549.1.7.1` (PKCS#7 `data`); `X509ChainPrivateCredential` is
//! stored natively as a private-key-plus-chain entry, since the underlying
//! container supports that shape directly.

use crate::der::{encode_integer, encode_octet_string, encode_sequence, TlvReader};
use crate::error::StoreError;
use crate::types::*;
use crate::underlying::UnderlyingEntry;

/// OID for PKCS#7 `data`, used to tag every synthetic secret-key blob this
/// codec produces so a reader can tell "real" secret keys stored by some
/// other producer apart from our own framed credentials.
pub const SYNTHETIC_BLOB_OID: &str = "1.2.840.113549.1.7.1";

pub fn encode_credential(credential: &Credential) -> Result<UnderlyingEntry, StoreError> {
    match credential {
        Credential::SecretKey(c) => Ok(UnderlyingEntry::SecretKey {
            algorithm: SYNTHETIC_BLOB_OID.to_string(),
            encoded: c.encoded.clone(),
        }),
        Credential::PublicKey(c) => Ok(UnderlyingEntry::SecretKey {
            algorithm: SYNTHETIC_BLOB_OID.to_string(),
            encoded: c.spki.clone(),
        }),
        Credential::KeyPair(c) => {
            let blob = encode_sequence(&[
                encode_octet_string(&c.public_spki),
                encode_octet_string(&c.private_pkcs8),
            ]);
            Ok(UnderlyingEntry::SecretKey { algorithm: SYNTHETIC_BLOB_OID.to_string(), encoded: blob })
        }
        Credential::X509ChainPublic(c) => {
            if c.chain.is_empty() {
                return Err(StoreError::CannotWrite(
                    "X.509 certificate chain must be non-empty".into(),
                ));
            }
            let mut children = vec![encode_integer(c.chain.len() as i64)];
            children.extend(c.chain.iter().map(|cert| encode_octet_string(cert)));
            let blob = encode_sequence(&children);
            Ok(UnderlyingEntry::SecretKey { algorithm: SYNTHETIC_BLOB_OID.to_string(), encoded: blob })
        }
        Credential::X509ChainPrivate(c) => {
            if c.chain.is_empty() {
                return Err(StoreError::CannotWrite(
                    "X.509 certificate chain must be non-empty".into(),
                ));
            }
            Ok(UnderlyingEntry::PrivateKeyChain {
                algorithm: c.algorithm.clone(),
                private_key: c.private_pkcs8.clone(),
                chain: c.chain.clone(),
            })
        }
        Credential::BearerToken(c) => Ok(UnderlyingEntry::SecretKey {
            algorithm: SYNTHETIC_BLOB_OID.to_string(),
            encoded: c.token.as_bytes().to_vec(),
        }),
        Credential::Password(c) => {
            if let PasswordAlgorithm::Masked(name) = &c.algorithm {
                if !name.starts_with("masked-") {
                    return Err(StoreError::UnsupportedCredential(format!(
                        "masked password algorithm '{name}' does not carry the required 'masked-' prefix"
                    )));
                }
            }
            let blob = encode_password_value(&c.value)?;
            Ok(UnderlyingEntry::SecretKey { algorithm: SYNTHETIC_BLOB_OID.to_string(), encoded: blob })
        }
    }
}

pub fn decode_credential(
    credential_type: CredentialType,
    algorithm_lc: Option<&str>,
    entry: &UnderlyingEntry,
) -> Result<Credential, StoreError> {
    match (credential_type, entry) {
        (CredentialType::SecretKey, UnderlyingEntry::SecretKey { encoded, .. }) => {
            Ok(Credential::SecretKey(SecretKeyCredential {
                algorithm: algorithm_lc.unwrap_or_default().to_string(),
                encoded: encoded.clone(),
            }))
        }
        (CredentialType::PublicKey, UnderlyingEntry::SecretKey { encoded, .. }) => {
            Ok(Credential::PublicKey(PublicKeyCredential {
                algorithm: algorithm_lc.unwrap_or_default().to_string(),
                spki: encoded.clone(),
            }))
        }
        (CredentialType::KeyPair, UnderlyingEntry::SecretKey { encoded, .. }) => {
            let mut reader = TlvReader::new(encoded);
            let mut seq = reader.read_sequence()?;
            let public_spki = seq.read_octet_string()?.to_vec();
            let private_pkcs8 = seq.read_octet_string()?.to_vec();
            seq.finish()?;
            reader.finish()?;
            Ok(Credential::KeyPair(KeyPairCredential {
                algorithm: algorithm_lc.unwrap_or_default().to_string(),
                public_spki,
                private_pkcs8,
            }))
        }
        (CredentialType::X509ChainPublic, UnderlyingEntry::SecretKey { encoded, .. }) => {
            let mut reader = TlvReader::new(encoded);
            let mut seq = reader.read_sequence()?;
            let count = seq.read_integer()?;
            if count < 0 {
                return Err(StoreError::CannotRead("negative certificate count".into()));
            }
            let mut chain = Vec::with_capacity(count as usize);
            for _ in 0..count {
                chain.push(seq.read_octet_string()?.to_vec());
            }
            seq.finish()?;
            reader.finish()?;
            Ok(Credential::X509ChainPublic(X509ChainPublicCredential {
                algorithm: algorithm_lc.unwrap_or_default().to_string(),
                chain,
            }))
        }
        (
            CredentialType::X509ChainPrivate,
            UnderlyingEntry::PrivateKeyChain { algorithm, private_key, chain },
        ) => Ok(Credential::X509ChainPrivate(X509ChainPrivateCredential {
            algorithm: algorithm.clone(),
            private_pkcs8: private_key.clone(),
            chain: chain.clone(),
        })),
        (CredentialType::BearerToken, UnderlyingEntry::SecretKey { encoded, .. }) => {
            let token = String::from_utf8(encoded.clone())
                .map_err(|e| StoreError::CannotRead(format!("bearer token is not UTF-8: {e}")))?;
            Ok(Credential::BearerToken(BearerTokenCredential { token }))
        }
        (CredentialType::Password, UnderlyingEntry::SecretKey { algorithm, encoded }) => {
            let password_algorithm = algorithm_lc
                .and_then(PasswordAlgorithm::from_token)
                .ok_or_else(|| StoreError::UnsupportedCredential(format!(
                    "password algorithm '{}' is outside the closed set",
                    algorithm_lc.unwrap_or_default()
                )))?;
            let value = decode_password_value(password_algorithm.shape(), encoded)?;
            Ok(Credential::Password(PasswordCredential { algorithm: password_algorithm, value }))
        }
        (expected, found) => Err(StoreError::InvalidEntryType {
            alias: String::new(),
            expected: credential_type_entry_kind(expected),
            found: found.kind(),
        }),
    }
}

fn credential_type_entry_kind(t: CredentialType) -> &'static str {
    match t {
        CredentialType::X509ChainPrivate => "private-key-chain",
        _ => "secret-key",
    }
}

fn encode_password_value(value: &PasswordValue) -> Result<Vec<u8>, StoreError> {
    Ok(match value {
        PasswordValue::IteratedSalted { hash, salt, iteration_count } => encode_sequence(&[
            encode_octet_string(hash),
            encode_octet_string(salt),
            encode_integer(*iteration_count),
        ]),
        PasswordValue::Clear(password) => encode_octet_string(password.as_bytes()),
        PasswordValue::Digest { username, realm, digest } => encode_sequence(&[
            encode_octet_string(username.as_bytes()),
            encode_octet_string(realm.as_bytes()),
            encode_octet_string(digest),
        ]),
        PasswordValue::Otp { hash, seed, sequence_number } => encode_sequence(&[
            encode_octet_string(hash),
            encode_octet_string(seed),
            encode_integer(*sequence_number),
        ]),
        PasswordValue::Salted { hash, salt } => {
            encode_sequence(&[encode_octet_string(hash), encode_octet_string(salt)])
        }
        PasswordValue::Simple { digest } => encode_sequence(&[encode_octet_string(digest)]),
        PasswordValue::Masked { initial_key_material, iteration_count, salt, masked } => {
            encode_sequence(&[
                encode_octet_string(initial_key_material.as_bytes()),
                encode_integer(*iteration_count),
                encode_octet_string(salt),
                encode_octet_string(masked),
            ])
        }
    })
}

fn decode_password_value(shape: PasswordShape, encoded: &[u8]) -> Result<PasswordValue, StoreError> {
    let mut reader = TlvReader::new(encoded);
    Ok(match shape {
        PasswordShape::Clear => {
            let bytes = reader.read_octet_string()?;
            reader.finish()?;
            let password = String::from_utf8(bytes.to_vec())
                .map_err(|e| StoreError::CannotRead(format!("clear password is not UTF-8: {e}")))?;
            PasswordValue::Clear(password)
        }
        PasswordShape::IteratedSalted => {
            let mut seq = reader.read_sequence()?;
            let hash = seq.read_octet_string()?.to_vec();
            let salt = seq.read_octet_string()?.to_vec();
            let iteration_count = seq.read_integer()?;
            seq.finish()?;
            reader.finish()?;
            PasswordValue::IteratedSalted { hash, salt, iteration_count }
        }
        PasswordShape::Digest => {
            let mut seq = reader.read_sequence()?;
            let username = String::from_utf8(seq.read_octet_string()?.to_vec())
                .map_err(|e| StoreError::CannotRead(e.to_string()))?;
            let realm = String::from_utf8(seq.read_octet_string()?.to_vec())
                .map_err(|e| StoreError::CannotRead(e.to_string()))?;
            let digest = seq.read_octet_string()?.to_vec();
            seq.finish()?;
            reader.finish()?;
            PasswordValue::Digest { username, realm, digest }
        }
        PasswordShape::Otp => {
            let mut seq = reader.read_sequence()?;
            let hash = seq.read_octet_string()?.to_vec();
            let seed = seq.read_octet_string()?.to_vec();
            let sequence_number = seq.read_integer()?;
            seq.finish()?;
            reader.finish()?;
            PasswordValue::Otp { hash, seed, sequence_number }
        }
        PasswordShape::Salted => {
            let mut seq = reader.read_sequence()?;
            let hash = seq.read_octet_string()?.to_vec();
            let salt = seq.read_octet_string()?.to_vec();
            seq.finish()?;
            reader.finish()?;
            PasswordValue::Salted { hash, salt }
        }
        PasswordShape::Simple => {
            let mut seq = reader.read_sequence()?;
            let digest = seq.read_octet_string()?.to_vec();
            seq.finish()?;
            reader.finish()?;
            PasswordValue::Simple { digest }
        }
        PasswordShape::Masked => {
            let mut seq = reader.read_sequence()?;
            let initial_key_material = String::from_utf8(seq.read_octet_string()?.to_vec())
                .map_err(|e| StoreError::CannotRead(e.to_string()))?;
            let iteration_count = seq.read_integer()?;
            let salt = seq.read_octet_string()?.to_vec();
            let masked = seq.read_octet_string()?.to_vec();
            seq.finish()?;
            reader.finish()?;
            PasswordValue::Masked { initial_key_material, iteration_count, salt, masked }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(credential: Credential) {
        let algorithm = credential.algorithm();
        let entry = encode_credential(&credential).expect("encode");
        let decoded =
            decode_credential(credential.credential_type(), algorithm.as_deref(), &entry)
                .expect("decode");
        assert_eq!(decoded, credential);
    }

    #[test]
    fn secret_key_roundtrips() {
        roundtrip(Credential::SecretKey(SecretKeyCredential {
            algorithm: "aes".into(),
            encoded: vec![1, 2, 3, 4],
        }));
    }

    #[test]
    fn key_pair_roundtrips() {
        roundtrip(Credential::KeyPair(KeyPairCredential {
            algorithm: "rsa".into(),
            public_spki: vec![0xAA; 32],
            private_pkcs8: vec![0xBB; 48],
        }));
    }

    #[test]
    fn x509_chain_public_roundtrips() {
        roundtrip(Credential::X509ChainPublic(X509ChainPublicCredential {
            algorithm: "rsa".into(),
            chain: vec![vec![1; 10], vec![2; 20], vec![3; 5]],
        }));
    }

    #[test]
    fn x509_chain_public_rejects_empty_chain() {
        let credential = Credential::X509ChainPublic(X509ChainPublicCredential {
            algorithm: "rsa".into(),
            chain: vec![],
        });
        assert!(encode_credential(&credential).is_err());
    }

    #[test]
    fn bearer_token_roundtrips() {
        roundtrip(Credential::BearerToken(BearerTokenCredential { token: "tok_abc123".into() }));
    }

    #[test]
    fn clear_password_roundtrips() {
        roundtrip(Credential::Password(PasswordCredential {
            algorithm: PasswordAlgorithm::Clear,
            value: PasswordValue::Clear("hunter2".into()),
        }));
    }

    #[test]
    fn bcrypt_password_roundtrips() {
        roundtrip(Credential::Password(PasswordCredential {
            algorithm: PasswordAlgorithm::Bcrypt,
            value: PasswordValue::IteratedSalted {
                hash: vec![9; 24],
                salt: vec![1; 16],
                iteration_count: 10,
            },
        }));
    }

    #[test]
    fn masked_password_roundtrips() {
        roundtrip(Credential::Password(PasswordCredential {
            algorithm: PasswordAlgorithm::Masked("masked-md5-des".into()),
            value: PasswordValue::Masked {
                initial_key_material: "secret".into(),
                iteration_count: 1000,
                salt: vec![7; 8],
                masked: vec![8; 16],
            },
        }));
    }

    #[test]
    fn unsupported_password_algorithm_fails_closed() {
        let result = decode_credential(
            CredentialType::Password,
            Some("not-a-real-algorithm"),
            &UnderlyingEntry::SecretKey { algorithm: "not-a-real-algorithm".into(), encoded: vec![] },
        );
        assert!(matches!(result, Err(StoreError::UnsupportedCredential(_))));
    }

    #[test]
    fn mismatched_entry_kind_is_invalid_entry_type() {
        let result = decode_credential(
            CredentialType::X509ChainPrivate,
            Some("rsa"),
            &UnderlyingEntry::SecretKey { algorithm: "rsa".into(), encoded: vec![] },
        );
        assert!(matches!(result, Err(StoreError::InvalidEntryType { .. })));
    }

    #[test]
    fn masked_password_without_prefix_is_rejected_at_encode() {
        let credential = Credential::Password(PasswordCredential {
            algorithm: PasswordAlgorithm::Masked("not-prefixed".into()),
            value: PasswordValue::Masked {
                initial_key_material: "secret".into(),
                iteration_count: 1000,
                salt: vec![7; 8],
                masked: vec![8; 16],
            },
        });
        assert!(matches!(
            encode_credential(&credential),
            Err(StoreError::UnsupportedCredential(_))
        ));
    }

    #[test]
    fn synthetic_blobs_are_tagged_with_the_pkcs7_data_oid() {
        let entry = encode_credential(&Credential::SecretKey(SecretKeyCredential {
            algorithm: "aes".into(),
            encoded: vec![1, 2, 3],
        }))
        .unwrap();
        match entry {
            UnderlyingEntry::SecretKey { algorithm, .. } => {
                assert_eq!(algorithm, SYNTHETIC_BLOB_OID)
            }
            other => panic!("expected a secret-key entry, got {other:?}"),
        }
    }

    #[test]
    fn algorithm_is_recovered_from_the_alias_not_the_blob() {
        let entry = encode_credential(&Credential::SecretKey(SecretKeyCredential {
            algorithm: "aes".into(),
            encoded: vec![1, 2, 3],
        }))
        .unwrap();
        let decoded = decode_credential(CredentialType::SecretKey, Some("aes"), &entry).unwrap();
        assert_eq!(
            decoded,
            Credential::SecretKey(SecretKeyCredential { algorithm: "aes".into(), encoded: vec![1, 2, 3] })
        );
    }
}
