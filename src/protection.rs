//! `ProtectionAdapter`: translates a `ProtectionParameter` into the password
//! argument `FileEngine` seals and unseals the persisted container with.
//!
//! The source models the accepted shape as a runtime check over a
//! credential-source interface, failing closed with `InvalidProtectionParameter`
//! for anything else. Here that constraint is the type itself: `ClearPassword`
//! is the only non-absent variant `ProtectionParameter` can hold, so a caller
//! cannot construct an unsupported shape in the first place.

/// Caller-supplied secret material guarding either the backing file or a
/// single `retrieve`/`store` call. The only accepted shape is a credential
/// source producing a clear password; absence means "no password".
#[derive(Clone, Debug)]
pub enum ProtectionParameter {
    None,
    ClearPassword(String),
}

impl ProtectionParameter {
    /// The password `FileEngine::load`/`flush` should use, or `None` for an
    /// unsealed container.
    pub fn as_password(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::ClearPassword(p) => Some(p.as_str()),
        }
    }

    /// Build a clear-password protection parameter.
    pub fn clear_password(password: impl Into<String>) -> Self {
        Self::ClearPassword(password.into())
    }
}

/// Resolve a per-call override against the store's own protection
/// parameter: `None` ("use the store's own") falls back to `store_default`;
/// any other value is used as-is.
pub fn resolve<'a>(
    per_call: Option<&'a ProtectionParameter>,
    store_default: &'a ProtectionParameter,
) -> &'a ProtectionParameter {
    per_call.unwrap_or(store_default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_call_override_wins_when_present() {
        let store_default = ProtectionParameter::ClearPassword("default".into());
        let per_call = ProtectionParameter::ClearPassword("override".into());
        assert_eq!(resolve(Some(&per_call), &store_default).as_password(), Some("override"));
    }

    #[test]
    fn falls_back_to_store_default_when_absent() {
        let store_default = ProtectionParameter::ClearPassword("default".into());
        assert_eq!(resolve(None, &store_default).as_password(), Some("default"));
    }

    #[test]
    fn none_variant_has_no_password() {
        assert_eq!(ProtectionParameter::None.as_password(), None);
    }
}
