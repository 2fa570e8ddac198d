//! Router-side admission glue: resolves an incoming HELLO's realm to a
//! [`Realm`](crate::realm::Realm) (creating it on first use) and
//! produces the WELCOME/ABORT decision, tying together the realm table,
//! transport and (eventually) HTTP admission front-ends behind one
//! entry point.

use std::collections::HashMap;

use crate::common::{is_valid_strict_uri, WampDict, WampId, WampUri};
use crate::error::{WampErrc, WampError};
use crate::realm::Realm;

/// Owns every realm this router process serves.
#[derive(Default)]
pub struct Router {
    realms: HashMap<WampUri, Realm>,
    /// When false, HELLOs for realms not already configured via
    /// [`Router::add_realm`] are rejected instead of auto-created.
    auto_create_realms: bool,
}

impl Router {
    pub fn new() -> Self {
        Router { realms: HashMap::new(), auto_create_realms: true }
    }

    pub fn with_auto_create_realms(mut self, enabled: bool) -> Self {
        self.auto_create_realms = enabled;
        self
    }

    /// Pre-creates a realm so HELLOs can join it even when auto-create
    /// is disabled.
    pub fn add_realm(&mut self, name: WampUri) -> &mut Realm {
        self.realms.entry(name.clone()).or_insert_with(|| Realm::new(name))
    }

    pub fn realm(&self, name: &str) -> Option<&Realm> {
        self.realms.get(name)
    }

    pub fn realm_mut(&mut self, name: &str) -> Option<&mut Realm> {
        self.realms.get_mut(name)
    }

    /// Handles a HELLO: validates the realm URI, resolves/creates the
    /// realm, and admits a new session into it.
    pub fn handle_hello(&mut self, realm_uri: WampUri, _details: WampDict) -> Result<(WampId, &str), WampError> {
        if !is_valid_strict_uri(&realm_uri) {
            return Err(WampError::from_error_uri(WampErrc::InvalidUri.to_uri().to_string(), WampDict::new()));
        }

        if !self.realms.contains_key(&realm_uri) {
            if !self.auto_create_realms {
                return Err(WampError::from_error_uri(WampErrc::NoSuchRealm.to_uri().to_string(), WampDict::new()));
            }
            self.add_realm(realm_uri.clone());
        }

        let realm = self.realms.get_mut(&realm_uri).expect("realm was just created or already present");
        let session_id = realm.admit(None);
        Ok((session_id, realm.name()))
    }

    /// Tears down a session's membership in a realm (GOODBYE or
    /// transport loss).
    pub fn handle_leave(&mut self, realm_uri: &str, session_id: WampId) {
        if let Some(realm) = self.realms.get_mut(realm_uri) {
            realm.leave(session_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_auto_creates_realm_by_default() {
        let mut router = Router::new();
        let (session_id, name) = router.handle_hello("com.example.realm".into(), WampDict::new()).unwrap();
        assert_eq!(name, "com.example.realm");
        assert!(router.realm("com.example.realm").unwrap().session(session_id).is_some());
    }

    #[test]
    fn hello_for_unknown_realm_is_rejected_without_auto_create() {
        let mut router = Router::new().with_auto_create_realms(false);
        let err = router.handle_hello("com.example.realm".into(), WampDict::new()).unwrap_err();
        assert!(matches!(err, WampError::ServerError(WampErrc::NoSuchRealm, ..)));
    }

    #[test]
    fn hello_with_invalid_uri_is_rejected() {
        let mut router = Router::new();
        let err = router.handle_hello("Not A Valid Uri".into(), WampDict::new()).unwrap_err();
        assert!(matches!(err, WampError::ServerError(WampErrc::InvalidUri, ..)));
    }
}
