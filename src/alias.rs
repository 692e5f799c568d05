//! `AliasCodec`: packs `(alias, credential type, algorithm?, parameters?)`
//! into the single textual alias the underlying container addresses entries
//! by, and reconstructs the tuple on load.

use std::sync::OnceLock;

use data_encoding::{Encoding, Specification};
use regex::Regex;

use crate::types::CredentialType;

/// A decoded composite alias.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedAlias {
    pub alias_lc: String,
    pub credential_type: CredentialType,
    pub algorithm_lc: Option<String>,
    pub params_der: Option<Vec<u8>>,
}

fn base32() -> &'static Encoding {
    static ENCODING: OnceLock<Encoding> = OnceLock::new();
    ENCODING.get_or_init(|| {
        let mut spec = Specification::new();
        spec.symbols.push_str("abcdefghijklmnopqrstuvwxyz234567");
        spec.padding = None;
        spec.encoding().expect("static base32 spec is valid")
    })
}

fn grammar() -> &'static Regex {
    static GRAMMAR: OnceLock<Regex> = OnceLock::new();
    GRAMMAR.get_or_init(|| {
        Regex::new(r"^(.+)/([a-z0-9_]+)/([-a-z0-9_]+)?/([2-7a-z]+)?$")
            .expect("static grammar is valid")
    })
}

/// Encode the composite underlying alias for a tuple.
///
/// `alias` and `algorithm` are lower-cased here (Unicode case folding, which
/// is locale-independent); callers do not need to pre-normalize.
pub fn encode(
    alias: &str,
    credential_type: CredentialType,
    algorithm: Option<&str>,
    params_der: Option<&[u8]>,
) -> String {
    let alias_lc = alias.to_lowercase();
    let algorithm_lc = algorithm.map(|a| a.to_lowercase()).unwrap_or_default();
    let params_b32 = params_der.map(|p| base32().encode(p)).unwrap_or_default();
    format!("{alias_lc}/{}/{algorithm_lc}/{params_b32}", credential_type.token())
}

/// Decode a composite underlying alias. Returns `None` for any string that
/// does not match the grammar — the caller (the boot scan) treats that as
/// an unrecognized entry to be skipped, not an error.
pub fn decode(underlying_alias: &str) -> Option<DecodedAlias> {
    let captures = grammar().captures(underlying_alias)?;
    let alias_lc = captures.get(1)?.as_str().to_string();
    let credential_type = CredentialType::from_token(captures.get(2)?.as_str())?;
    let algorithm_lc = captures.get(3).map(|m| m.as_str().to_string());
    let params_der = match captures.get(4) {
        Some(m) => Some(base32().decode(m.as_str().as_bytes()).ok()?),
        None => None,
    };
    Some(DecodedAlias { alias_lc, credential_type, algorithm_lc, params_der })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_without_algorithm_or_params() {
        let encoded = encode("svc1", CredentialType::BearerToken, None, None);
        assert_eq!(encoded, "svc1/bearer_token//");
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.alias_lc, "svc1");
        assert_eq!(decoded.credential_type, CredentialType::BearerToken);
        assert_eq!(decoded.algorithm_lc, None);
        assert_eq!(decoded.params_der, None);
    }

    #[test]
    fn roundtrips_with_algorithm_and_params() {
        let params = b"\x30\x03\x02\x01\x07";
        let encoded = encode("U", CredentialType::Password, Some("Bcrypt"), Some(params));
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.alias_lc, "u");
        assert_eq!(decoded.credential_type, CredentialType::Password);
        assert_eq!(decoded.algorithm_lc.as_deref(), Some("bcrypt"));
        assert_eq!(decoded.params_der.as_deref(), Some(params.as_slice()));
    }

    #[test]
    fn lower_cases_alias_and_algorithm() {
        let encoded = encode("MixedCase", CredentialType::SecretKey, Some("AES"), None);
        assert!(encoded.starts_with("mixedcase/secret_key/aes/"));
    }

    #[test]
    fn unrecognized_strings_decode_to_none() {
        assert!(decode("junk_no_slashes").is_none());
        assert!(decode("alias/Not_Lowercase_Type/algo/").is_none());
        assert!(decode("alias/secret_key/algo/NOTBASE32!!").is_none());
    }

    #[test]
    fn base32_payload_matches_documented_alphabet() {
        let encoded = encode("a", CredentialType::SecretKey, None, Some(b"\x01\x02\x03"));
        let params_segment = encoded.rsplit('/').next().unwrap();
        assert!(params_segment.chars().all(|c| "abcdefghijklmnopqrstuvwxyz234567".contains(c)));
    }
}
