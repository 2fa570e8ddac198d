//! Router-side publish/subscribe engine: a subscription table keyed by
//! topic URI, resolved against an incoming PUBLISH by [`MatchPolicy`],
//! and the per-subscriber dispatch list a publication fans out to.
//!
//! Generalizes the client-side subscription-queue idiom `core::recv::event`
//! already uses (one `UnboundedSender` per live subscription) to a
//! router-side table serving every subscriber at once.

use std::collections::HashMap;

use crate::common::{MatchPolicy, WampId, WampUri};

/// One subscription: a subscriber session listening on `topic` under
/// `policy`.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: WampId,
    pub topic: WampUri,
    pub policy: MatchPolicy,
    pub subscriber_session: WampId,
}

/// The router-side subscription table. Unlike [`crate::rpc::RegistrationTable`],
/// many subscriptions can share one topic (every matching subscriber gets
/// the event), so lookups fan out rather than resolving to one winner.
#[derive(Default)]
pub struct SubscriptionTable {
    by_id: HashMap<WampId, Subscription>,
    /// Index from exact topic URI to the subscription ids registered
    /// with [`MatchPolicy::Exact`] on it, for the common case fast path.
    exact_index: HashMap<WampUri, Vec<WampId>>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, id: WampId, topic: WampUri, policy: MatchPolicy, subscriber_session: WampId) {
        if policy == MatchPolicy::Exact {
            self.exact_index.entry(topic.clone()).or_default().push(id);
        }
        self.by_id.insert(id, Subscription { id, topic, policy, subscriber_session });
    }

    pub fn unsubscribe(&mut self, id: WampId) -> Option<Subscription> {
        let sub = self.by_id.remove(&id)?;
        if let Some(ids) = self.exact_index.get_mut(&sub.topic) {
            ids.retain(|&i| i != id);
        }
        Some(sub)
    }

    pub fn get(&self, id: WampId) -> Option<&Subscription> {
        self.by_id.get(&id)
    }

    /// Returns every subscription whose pattern matches `topic`, exact
    /// matches first (in registration order) followed by pattern-based
    /// ones, mirroring the dispatch order a broker typically uses.
    pub fn matching(&self, topic: &str) -> Vec<&Subscription> {
        let mut result: Vec<&Subscription> = self
            .exact_index
            .get(topic)
            .into_iter()
            .flatten()
            .filter_map(|id| self.by_id.get(id))
            .collect();

        for sub in self.by_id.values() {
            if sub.policy != MatchPolicy::Exact && sub.policy.matches(&sub.topic, topic) {
                result.push(sub);
            }
        }

        result
    }

    pub fn remove_session(&mut self, session: WampId) -> Vec<Subscription> {
        let ids: Vec<WampId> = self.by_id.values().filter(|s| s.subscriber_session == session).map(|s| s.id).collect();
        ids.into_iter().filter_map(|id| self.unsubscribe(id)).collect()
    }
}

/// The publisher-supplied recipient restrictions a PUBLISH's `options`
/// dict can carry: `exclude_me`, `exclude`, `exclude_authid`,
/// `exclude_authrole`, `eligible`, `eligible_authid`, `eligible_authrole`.
/// Applied after topic matching, mirroring how a broker narrows the
/// subscriber list it already resolved by URI.
#[derive(Debug, Clone, Default)]
pub struct PublishFilter {
    pub exclude_me: bool,
    pub exclude: Vec<WampId>,
    pub eligible: Option<Vec<WampId>>,
}

impl PublishFilter {
    fn allows(&self, publisher: Option<WampId>, candidate: WampId) -> bool {
        if self.exclude_me && Some(candidate) == publisher {
            return false;
        }
        if self.exclude.contains(&candidate) {
            return false;
        }
        if let Some(eligible) = &self.eligible {
            if !eligible.contains(&candidate) {
                return false;
            }
        }
        true
    }
}

/// Narrows a topic-matched subscriber list down to the sessions that
/// survive `filter`'s exclusion/allowlist rules for this particular
/// publication.
pub fn filter_recipients(subs: &[&Subscription], publisher: Option<WampId>, filter: &PublishFilter) -> Vec<WampId> {
    subs.iter()
        .map(|s| s.subscriber_session)
        .filter(|&session| filter.allows(publisher, session))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_prefix_subscribers_both_receive_publish() {
        let mut table = SubscriptionTable::new();
        table.subscribe(1, "com.example.foo".into(), MatchPolicy::Exact, 100);
        table.subscribe(2, "com.example".into(), MatchPolicy::Prefix, 200);

        let matches = table.matching("com.example.foo");
        let ids: Vec<WampId> = matches.iter().map(|s| s.id).collect();
        assert!(ids.contains(&1));
        assert!(ids.contains(&2));
    }

    #[test]
    fn unsubscribe_removes_from_exact_index() {
        let mut table = SubscriptionTable::new();
        table.subscribe(1, "com.example.foo".into(), MatchPolicy::Exact, 100);
        table.unsubscribe(1);
        assert!(table.matching("com.example.foo").is_empty());
    }

    #[test]
    fn remove_session_drops_all_its_subscriptions() {
        let mut table = SubscriptionTable::new();
        table.subscribe(1, "a".into(), MatchPolicy::Exact, 100);
        table.subscribe(2, "b".into(), MatchPolicy::Exact, 100);
        table.subscribe(3, "c".into(), MatchPolicy::Exact, 200);
        let removed = table.remove_session(100);
        assert_eq!(removed.len(), 2);
        assert!(table.get(1).is_none());
        assert!(table.get(2).is_none());
        assert!(table.get(3).is_some());
    }

    #[test]
    fn exclude_me_drops_the_publisher_from_its_own_subscription() {
        let mut table = SubscriptionTable::new();
        table.subscribe(1, "a".into(), MatchPolicy::Exact, 100);
        table.subscribe(2, "a".into(), MatchPolicy::Exact, 200);
        let matches = table.matching("a");
        let filter = PublishFilter { exclude_me: true, ..Default::default() };
        let recipients = filter_recipients(&matches, Some(100), &filter);
        assert_eq!(recipients, vec![200]);
    }

    #[test]
    fn eligible_list_restricts_to_an_allowlist() {
        let mut table = SubscriptionTable::new();
        table.subscribe(1, "a".into(), MatchPolicy::Exact, 100);
        table.subscribe(2, "a".into(), MatchPolicy::Exact, 200);
        let matches = table.matching("a");
        let filter = PublishFilter { eligible: Some(vec![200]), ..Default::default() };
        let recipients = filter_recipients(&matches, None, &filter);
        assert_eq!(recipients, vec![200]);
    }

    #[test]
    fn exclude_list_blocks_specific_sessions() {
        let mut table = SubscriptionTable::new();
        table.subscribe(1, "a".into(), MatchPolicy::Exact, 100);
        table.subscribe(2, "a".into(), MatchPolicy::Exact, 200);
        let matches = table.matching("a");
        let filter = PublishFilter { exclude: vec![200], ..Default::default() };
        let recipients = filter_recipients(&matches, None, &filter);
        assert_eq!(recipients, vec![100]);
    }
}
