//! Router-side realm: the per-realm session/registration/subscription
//! table a [`crate::router::Router`] dispatches PUBLISH/CALL traffic
//! through once a peer's HELLO has been admitted to it.

use std::collections::HashMap;

use crate::common::{generate_id, MatchPolicy, WampId, WampUri};
use crate::pubsub::SubscriptionTable;
use crate::rpc::RegistrationTable;

/// A session that has joined this realm, identified by the WampId handed
/// out in its WELCOME.
pub struct RealmSession {
    pub session_id: WampId,
    pub authid: Option<String>,
}

/// One WAMP realm: a name plus the registration/subscription tables
/// scoped to it. A [`Router`](crate::router::Router) owns one of these
/// per realm it serves.
#[derive(Default)]
pub struct Realm {
    name: WampUri,
    sessions: HashMap<WampId, RealmSession>,
    pub registrations: RegistrationTable,
    pub subscriptions: SubscriptionTable,
}

impl Realm {
    pub fn new(name: WampUri) -> Self {
        Realm { name, sessions: HashMap::new(), registrations: RegistrationTable::new(), subscriptions: SubscriptionTable::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Admits a new session to the realm, generating a fresh, unique
    /// session id the same way request ids are generated client-side.
    pub fn admit(&mut self, authid: Option<String>) -> WampId {
        let mut id = generate_id();
        while self.sessions.contains_key(&id) {
            id = generate_id();
        }
        self.sessions.insert(id, RealmSession { session_id: id, authid });
        id
    }

    /// Removes a session and everything it registered/subscribed,
    /// returning the ids that need UNREGISTERED/UNSUBSCRIBED-equivalent
    /// cleanup pushed to any other interested party.
    pub fn leave(&mut self, session_id: WampId) {
        self.sessions.remove(&session_id);
        self.registrations.remove_session(session_id);
        self.subscriptions.remove_session(session_id);
    }

    pub fn session(&self, session_id: WampId) -> Option<&RealmSession> {
        self.sessions.get(&session_id)
    }

    pub fn resolve_procedure(&self, procedure: &str) -> Option<WampId> {
        self.registrations.resolve(procedure).map(|r| r.callee_session)
    }

    pub fn resolve_subscribers(&self, topic: &str) -> Vec<WampId> {
        self.subscriptions.matching(topic).into_iter().map(|s| s.subscriber_session).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admit_assigns_unique_session_ids() {
        let mut realm = Realm::new("realm1".into());
        let a = realm.admit(None);
        let b = realm.admit(Some("alice".into()));
        assert_ne!(a, b);
        assert!(realm.session(a).is_some());
        assert_eq!(realm.session(b).unwrap().authid.as_deref(), Some("alice"));
    }

    #[test]
    fn leave_tears_down_registrations_and_subscriptions() {
        let mut realm = Realm::new("realm1".into());
        let s = realm.admit(None);
        realm
            .registrations
            .register(1, "com.example.foo".into(), MatchPolicy::Exact, s, crate::common::InvocationPolicy::Single, false, false)
            .unwrap();
        realm.subscriptions.subscribe(2, "com.example.bar".into(), MatchPolicy::Exact, s);

        realm.leave(s);

        assert!(realm.session(s).is_none());
        assert!(realm.resolve_procedure("com.example.foo").is_none());
        assert!(realm.resolve_subscribers("com.example.bar").is_empty());
    }
}
