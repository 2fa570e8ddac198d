//! The RPC/streaming engine: router-side registration table and
//! pattern-matched dispatch, generalized to also track caller-side
//! bookkeeping (the same `HashMap<WampId, ...>` pending-table idiom
//! `core::send`/`core::recv` use, lifted here so a realm can reuse it).

pub mod cancel;
pub mod stream;
pub mod timeout;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::common::{InvocationPolicy, MatchPolicy, WampId, WampUri};

pub use cancel::CancelMode;
pub use stream::{Outcome, StreamChannel, StreamState};
pub use timeout::TimeoutRace;

/// A single registered procedure.
#[derive(Debug, Clone)]
pub struct Registration {
    pub id: WampId,
    pub procedure: WampUri,
    pub policy: MatchPolicy,
    pub callee_session: WampId,
    /// How the dealer picks one callee when several registrations share
    /// this exact URI under `policy`. Only meaningful for shared
    /// registrations; a lone registration ignores it.
    pub invocation_policy: InvocationPolicy,
    /// Whether this registration serves progressive call chunks rather
    /// than a single RESULT.
    pub is_stream: bool,
    /// Whether the callee must reply with an RSVP (or an error) before
    /// any stream chunk is allowed to flow; see
    /// [`crate::rpc::stream::StreamChannel::new`].
    pub expects_invitation: bool,
}

/// An in-flight CALL the dealer is tracking between the caller and the
/// callee it was routed to (or, client-side, between our own CALL and
/// the eventual RESULT/ERROR).
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub call_id: WampId,
    pub invocation_id: WampId,
    pub caller_session: WampId,
    pub registration_id: WampId,
    pub cancel_mode: CancelMode,
    pub receive_progress: bool,
}

/// The router-side registration table: one entry per procedure URI,
/// resolved through [`MatchPolicy::matches`] the same way subscriptions
/// are resolved in [`crate::pubsub`]. A URI may carry more than one
/// registration only when every registration sharing it opted into a
/// non-`Single` [`InvocationPolicy`] (a "shared registration"); `resolve`
/// then picks one per that policy instead of returning every match.
#[derive(Default)]
pub struct RegistrationTable {
    by_id: HashMap<WampId, Registration>,
    by_uri: HashMap<WampUri, Vec<WampId>>,
    round_robin_cursor: AtomicUsize,
}

impl RegistrationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `procedure`. Fails (returning the id of the conflicting
    /// registration) when the URI is already claimed by a registration
    /// that didn't opt into sharing, or when `invocation_policy` here is
    /// `Single` but the URI already has a registration.
    pub fn register(
        &mut self,
        id: WampId,
        procedure: WampUri,
        policy: MatchPolicy,
        callee_session: WampId,
        invocation_policy: InvocationPolicy,
        is_stream: bool,
        expects_invitation: bool,
    ) -> Result<(), WampId> {
        if let Some(existing_ids) = self.by_uri.get(&procedure) {
            let sharable = invocation_policy != InvocationPolicy::Single
                && existing_ids.iter().all(|existing| {
                    self.by_id.get(existing).map(|r| r.invocation_policy != InvocationPolicy::Single).unwrap_or(false)
                });
            if !sharable {
                return Err(existing_ids[0]);
            }
        }
        self.by_uri.entry(procedure.clone()).or_default().push(id);
        self.by_id.insert(
            id,
            Registration { id, procedure, policy, callee_session, invocation_policy, is_stream, expects_invitation },
        );
        Ok(())
    }

    pub fn unregister(&mut self, id: WampId) -> Option<Registration> {
        let reg = self.by_id.remove(&id)?;
        if let Some(ids) = self.by_uri.get_mut(&reg.procedure) {
            ids.retain(|&i| i != id);
            if ids.is_empty() {
                self.by_uri.remove(&reg.procedure);
            }
        }
        Some(reg)
    }

    pub fn get(&self, id: WampId) -> Option<&Registration> {
        self.by_id.get(&id)
    }

    /// Resolves a CALL's procedure URI to the registration that should
    /// receive the INVOCATION, preferring an exact match before falling
    /// back to pattern-based registrations, and selecting among several
    /// shared registrations per their [`InvocationPolicy`].
    pub fn resolve(&self, procedure: &str) -> Option<&Registration> {
        if let Some(ids) = self.by_uri.get(procedure) {
            return self.pick(ids);
        }

        let mut candidates: Vec<&WampId> = self
            .by_uri
            .iter()
            .filter(|(uri, ids)| {
                ids.iter().next().and_then(|id| self.by_id.get(id)).map(|r| r.policy != MatchPolicy::Exact).unwrap_or(false)
                    && self.by_id.get(ids[0]).map(|r| r.policy.matches(uri, procedure)).unwrap_or(false)
            })
            .flat_map(|(_, ids)| ids.iter())
            .collect();
        candidates.sort_unstable();
        self.pick(&candidates.into_iter().copied().collect::<Vec<_>>())
    }

    /// Picks one registration out of `ids` (all sharing one URI/pattern)
    /// per the group's [`InvocationPolicy`].
    fn pick(&self, ids: &[WampId]) -> Option<&Registration> {
        match ids {
            [] => None,
            [only] => self.by_id.get(only),
            many => {
                let policy = self.by_id.get(&many[0]).map(|r| r.invocation_policy).unwrap_or(InvocationPolicy::Single);
                let chosen = match policy {
                    InvocationPolicy::Last => many[many.len() - 1],
                    InvocationPolicy::RoundRobin => {
                        let i = self.round_robin_cursor.fetch_add(1, Ordering::Relaxed) % many.len();
                        many[i]
                    }
                    InvocationPolicy::Random => {
                        use rand::Rng;
                        many[rand::thread_rng().gen_range(0..many.len())]
                    }
                    InvocationPolicy::Single | InvocationPolicy::First => many[0],
                };
                self.by_id.get(&chosen)
            }
        }
    }

    pub fn remove_session(&mut self, session: WampId) -> Vec<Registration> {
        let ids: Vec<WampId> = self.by_id.values().filter(|r| r.callee_session == session).map(|r| r.id).collect();
        ids.into_iter().filter_map(|id| self.unregister(id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(table: &mut RegistrationTable, id: WampId, uri: &str, policy: MatchPolicy, session: WampId) -> Result<(), WampId> {
        table.register(id, uri.into(), policy, session, InvocationPolicy::Single, false, false)
    }

    #[test]
    fn exact_registration_wins_over_pattern() {
        let mut table = RegistrationTable::new();
        reg(&mut table, 1, "com.example", MatchPolicy::Prefix, 100).unwrap();
        reg(&mut table, 2, "com.example.foo", MatchPolicy::Exact, 200).unwrap();
        assert_eq!(table.resolve("com.example.foo").unwrap().id, 2);
    }

    #[test]
    fn duplicate_uri_registration_is_rejected() {
        let mut table = RegistrationTable::new();
        reg(&mut table, 1, "com.example.foo", MatchPolicy::Exact, 100).unwrap();
        assert_eq!(reg(&mut table, 2, "com.example.foo", MatchPolicy::Exact, 200), Err(1));
    }

    #[test]
    fn unregister_removes_from_both_indices() {
        let mut table = RegistrationTable::new();
        reg(&mut table, 1, "com.example.foo", MatchPolicy::Exact, 100).unwrap();
        table.unregister(1).unwrap();
        assert!(table.resolve("com.example.foo").is_none());
    }

    #[test]
    fn shared_registration_requires_invocation_policy_on_both_sides() {
        let mut table = RegistrationTable::new();
        reg(&mut table, 1, "com.example.foo", MatchPolicy::Exact, 100).unwrap();
        // second registrant asks to share, but the first was `Single` -> still rejected
        let err = table.register(2, "com.example.foo".into(), MatchPolicy::Exact, 200, InvocationPolicy::RoundRobin, false, false);
        assert_eq!(err, Err(1));
    }

    #[test]
    fn round_robin_cycles_through_shared_registrations() {
        let mut table = RegistrationTable::new();
        table.register(1, "com.example.foo".into(), MatchPolicy::Exact, 100, InvocationPolicy::RoundRobin, false, false).unwrap();
        table.register(2, "com.example.foo".into(), MatchPolicy::Exact, 200, InvocationPolicy::RoundRobin, false, false).unwrap();

        let first = table.resolve("com.example.foo").unwrap().callee_session;
        let second = table.resolve("com.example.foo").unwrap().callee_session;
        assert_ne!(first, second);
    }

    #[test]
    fn last_policy_always_picks_the_most_recent_registrant() {
        let mut table = RegistrationTable::new();
        table.register(1, "com.example.foo".into(), MatchPolicy::Exact, 100, InvocationPolicy::Last, false, false).unwrap();
        table.register(2, "com.example.foo".into(), MatchPolicy::Exact, 200, InvocationPolicy::Last, false, false).unwrap();
        assert_eq!(table.resolve("com.example.foo").unwrap().callee_session, 200);
    }
}
