//! The in-memory `alias -> type -> algorithm -> params -> underlying alias`
//! index, with weak (non-owning) relationships realized simply by the fact
//! that cascade-delete is driven top-down by this module alone — no parent
//! pointers are needed when the owner walks its own tree.

use indexmap::IndexMap;

use crate::types::{CredentialType, CredentialTypeQuery, ParamKey};

#[derive(Default)]
struct BottomEntry {
    by_params: IndexMap<ParamKey, String>,
    no_params: Option<String>,
}

impl BottomEntry {
    fn is_empty(&self) -> bool {
        self.by_params.is_empty() && self.no_params.is_none()
    }
}

struct MidEntry {
    credential_type: CredentialType,
    by_algorithm: IndexMap<String, BottomEntry>,
    no_algorithm: Option<BottomEntry>,
}

impl MidEntry {
    fn new(credential_type: CredentialType) -> Self {
        Self { credential_type, by_algorithm: IndexMap::new(), no_algorithm: None }
    }

    fn is_empty(&self) -> bool {
        self.by_algorithm.is_empty() && self.no_algorithm.is_none()
    }
}

#[derive(Default)]
struct TopEntry {
    by_type: IndexMap<CredentialType, MidEntry>,
}

/// Result of a successful lookup: enough to decode the credential and, for
/// `Password`, to recover its algorithm from the alias rather than the entry.
pub struct LookupHit {
    pub credential_type: CredentialType,
    pub algorithm_lc: Option<String>,
    pub underlying_alias: String,
}

#[derive(Default)]
pub struct Index {
    top: IndexMap<String, TopEntry>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `(alias_lc, credential_type, algorithm_lc?, params?) ->
    /// underlying_alias`, returning the underlying alias previously indexed
    /// under the identical tuple, if any (the caller deletes it from the
    /// underlying store to avoid orphaning it).
    pub fn insert(
        &mut self,
        alias_lc: String,
        credential_type: CredentialType,
        algorithm_lc: Option<String>,
        params: Option<ParamKey>,
        underlying_alias: String,
    ) -> Option<String> {
        let top = self.top.entry(alias_lc).or_default();
        let mid = top
            .by_type
            .entry(credential_type)
            .or_insert_with(|| MidEntry::new(credential_type));
        let bottom = match algorithm_lc {
            Some(alg) => mid.by_algorithm.entry(alg).or_default(),
            None => mid.no_algorithm.get_or_insert_with(BottomEntry::default),
        };
        match params {
            Some(p) => bottom.by_params.insert(p, underlying_alias),
            None => bottom.no_params.replace(underlying_alias),
        }
    }

    pub fn lookup(
        &self,
        alias_lc: &str,
        type_query: CredentialTypeQuery,
        algorithm_lc: Option<&str>,
        params: Option<&ParamKey>,
    ) -> Option<LookupHit> {
        let top = self.top.get(alias_lc)?;
        let mid = match type_query.exact() {
            Some(t) => top.by_type.get(&t)?,
            None => top.by_type.values().find(|m| type_query.matches(m.credential_type))?,
        };
        let (algorithm, bottom) = match algorithm_lc {
            Some(alg) => (Some(alg.to_string()), mid.by_algorithm.get(alg)?),
            None => match mid.by_algorithm.iter().next() {
                Some((alg, bottom)) => (Some(alg.clone()), bottom),
                None => (None, mid.no_algorithm.as_ref()?),
            },
        };
        let underlying_alias = match params {
            Some(p) => bottom.by_params.get(p)?,
            None => match bottom.by_params.values().next() {
                Some(v) => v,
                None => bottom.no_params.as_ref()?,
            },
        };
        Some(LookupHit {
            credential_type: mid.credential_type,
            algorithm_lc: algorithm,
            underlying_alias: underlying_alias.clone(),
        })
    }

    /// Remove every entry consistent with the supplied, possibly-partial
    /// tuple, pruning any `BottomEntry`/`MidEntry` left empty. A `TopEntry`
    /// is evicted only once pruning leaves its type-map empty — so removing
    /// one algorithm of a type under an alias never disturbs a sibling
    /// algorithm of the same type, or any other type under that alias.
    /// Returns the underlying aliases deleted.
    pub fn remove(
        &mut self,
        alias_lc: &str,
        type_query: CredentialTypeQuery,
        algorithm_lc: Option<&str>,
        params: Option<&ParamKey>,
    ) -> Vec<String> {
        let mut removed = Vec::new();
        let Some(top) = self.top.get_mut(alias_lc) else {
            return removed;
        };

        let matching_types: Vec<CredentialType> = match type_query.exact() {
            Some(t) if top.by_type.contains_key(&t) => vec![t],
            Some(_) => vec![],
            None => top
                .by_type
                .iter()
                .filter(|(t, _)| type_query.matches(**t))
                .map(|(t, _)| *t)
                .collect(),
        };

        for credential_type in matching_types {
            let mid_empty = {
                let mid = top.by_type.get_mut(&credential_type).expect("checked above");
                remove_from_mid(mid, algorithm_lc, params, &mut removed)
            };
            if mid_empty {
                top.by_type.shift_remove(&credential_type);
            }
        }

        if top.by_type.is_empty() {
            self.top.shift_remove(alias_lc);
        }
        removed
    }

    /// User-facing aliases currently indexed (at least one credential
    /// stored under them).
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.top.keys().map(String::as_str)
    }
}

fn remove_from_mid(
    mid: &mut MidEntry,
    algorithm_lc: Option<&str>,
    params: Option<&ParamKey>,
    removed: &mut Vec<String>,
) -> bool {
    match algorithm_lc {
        Some(alg) => {
            let empty = if let Some(bottom) = mid.by_algorithm.get_mut(alg) {
                Some(remove_from_bottom(bottom, params, removed))
            } else {
                None
            };
            if empty == Some(true) {
                mid.by_algorithm.shift_remove(alg);
            }
        }
        None => {
            let keys: Vec<String> = mid.by_algorithm.keys().cloned().collect();
            for key in keys {
                if let Some(bottom) = mid.by_algorithm.get_mut(&key) {
                    if remove_from_bottom(bottom, params, removed) {
                        mid.by_algorithm.shift_remove(&key);
                    }
                }
            }
            if let Some(bottom) = mid.no_algorithm.as_mut() {
                if remove_from_bottom(bottom, params, removed) {
                    mid.no_algorithm = None;
                }
            }
        }
    }
    mid.is_empty()
}

fn remove_from_bottom(
    bottom: &mut BottomEntry,
    params: Option<&ParamKey>,
    removed: &mut Vec<String>,
) -> bool {
    match params {
        Some(p) => {
            if let Some(alias) = bottom.by_params.shift_remove(p) {
                removed.push(alias);
            }
        }
        None => {
            removed.extend(bottom.by_params.drain(..).map(|(_, v)| v));
            if let Some(alias) = bottom.no_params.take() {
                removed.push(alias);
            }
        }
    }
    bottom.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(alg: &str) -> Option<String> {
        Some(alg.to_string())
    }

    #[test]
    fn insert_then_exact_lookup_round_trips() {
        let mut index = Index::new();
        index.insert("u".into(), CredentialType::Password, key("bcrypt"), None, "u1".into());
        let hit = index
            .lookup("u", CredentialTypeQuery::Exact(CredentialType::Password), Some("bcrypt"), None)
            .unwrap();
        assert_eq!(hit.underlying_alias, "u1");
        assert_eq!(hit.algorithm_lc.as_deref(), Some("bcrypt"));
    }

    #[test]
    fn replacing_identical_tuple_returns_old_alias() {
        let mut index = Index::new();
        let first = index.insert("u".into(), CredentialType::Password, key("bcrypt"), None, "u1".into());
        assert!(first.is_none());
        let second = index.insert("u".into(), CredentialType::Password, key("bcrypt"), None, "u2".into());
        assert_eq!(second.as_deref(), Some("u1"));
    }

    #[test]
    fn removing_one_algorithm_leaves_sibling_retrievable() {
        let mut index = Index::new();
        index.insert("u".into(), CredentialType::Password, key("bcrypt"), None, "u/password/bcrypt/".into());
        index.insert(
            "u".into(),
            CredentialType::Password,
            key("crypt-sha-512"),
            None,
            "u/password/crypt-sha-512/".into(),
        );

        let removed = index.remove(
            "u",
            CredentialTypeQuery::Exact(CredentialType::Password),
            Some("bcrypt"),
            None,
        );
        assert_eq!(removed, vec!["u/password/bcrypt/".to_string()]);

        let still_there = index
            .lookup("u", CredentialTypeQuery::Exact(CredentialType::Password), Some("crypt-sha-512"), None)
            .expect("sibling algorithm must still be retrievable");
        assert_eq!(still_there.underlying_alias, "u/password/crypt-sha-512/");
    }

    #[test]
    fn removing_whole_type_prunes_the_alias_entirely() {
        let mut index = Index::new();
        index.insert("u".into(), CredentialType::Password, key("bcrypt"), None, "u1".into());
        index.remove("u", CredentialTypeQuery::Exact(CredentialType::Password), None, None);
        assert_eq!(index.aliases().count(), 0);
    }

    #[test]
    fn removing_one_type_does_not_disturb_a_sibling_type() {
        let mut index = Index::new();
        index.insert("u".into(), CredentialType::Password, key("bcrypt"), None, "u/password".into());
        index.insert("u".into(), CredentialType::SecretKey, key("aes"), None, "u/secret".into());

        index.remove("u", CredentialTypeQuery::Exact(CredentialType::Password), None, None);

        let secret = index
            .lookup("u", CredentialTypeQuery::Exact(CredentialType::SecretKey), Some("aes"), None)
            .expect("sibling type must survive removal of another type under the same alias");
        assert_eq!(secret.underlying_alias, "u/secret");
    }

    #[test]
    fn loose_match_returns_first_inserted_subtype() {
        let mut index = Index::new();
        index.insert("u".into(), CredentialType::PublicKey, key("rsa"), None, "pub".into());
        index.insert("u".into(), CredentialType::SecretKey, key("aes"), None, "secret".into());

        let hit = index.lookup("u", CredentialTypeQuery::AnyKeyCredential, None, None).unwrap();
        assert_eq!(hit.credential_type, CredentialType::PublicKey);
    }

    #[test]
    fn missing_alias_is_a_miss_not_an_error() {
        let index = Index::new();
        assert!(index.lookup("ghost", CredentialTypeQuery::Any, None, None).is_none());
    }
}
