//! Subscriber matcher: decides which registered browsers a notify call reaches.
//!
//! Stored identifiers are compared in their string form, since the snapshot
//! may hold them as numbers. Policy:
//! 1. With both a user and a store filter, a record must equal both.
//! 2. Otherwise a record is included when it equals whichever filter is set.
//! 3. No filter at all matches nothing; there is no broadcast mode.

use pushcast_common::types::{NotifyFilter, SubscriberRecord};

/// Stateless matcher over a registry snapshot.
pub struct SubscriberMatcher;

impl SubscriberMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Records from `records` that `filter` targets, in iteration order.
    pub fn select<I>(&self, filter: &NotifyFilter, records: I) -> Vec<SubscriberRecord>
    where
        I: IntoIterator<Item = SubscriberRecord>,
    {
        records
            .into_iter()
            .filter(|record| Self::matches(filter, record))
            .collect()
    }

    /// Whether a single record is targeted by `filter`.
    pub fn matches(filter: &NotifyFilter, record: &SubscriberRecord) -> bool {
        let saved_user_id = record.user_id.to_string();
        let saved_store_id = record.store_id.to_string();

        let user_match = filter.user_id.as_deref() == Some(saved_user_id.as_str());
        let store_match = filter.store_id.as_deref() == Some(saved_store_id.as_str());

        if filter.user_id.is_some() && filter.store_id.is_some() && !(user_match && store_match)
        {
            return false;
        }

        user_match || store_match
    }
}

impl Default for SubscriberMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushcast_common::types::Identifier;

    fn make_record(user: Identifier, store: Identifier, fp: &str) -> SubscriberRecord {
        SubscriberRecord {
            user_id: user,
            store_id: store,
            fingerprint: fp.to_string(),
            push_subscription: "{}".to_string(),
        }
    }

    fn filter(user: &str, store: &str) -> NotifyFilter {
        NotifyFilter::new(Some(user), Some(store))
    }

    #[test]
    fn test_user_only_filter_matches() {
        let rec = make_record("u1".into(), "s1".into(), "fp");
        assert!(SubscriberMatcher::matches(&filter("u1", ""), &rec));
    }

    #[test]
    fn test_store_only_filter_matches() {
        let rec = make_record("u1".into(), "s1".into(), "fp");
        assert!(SubscriberMatcher::matches(&filter("", "s1"), &rec));
        assert!(!SubscriberMatcher::matches(&filter("", "s2"), &rec));
    }

    #[test]
    fn test_both_filters_require_both() {
        let rec = make_record("u1".into(), "s1".into(), "fp");
        assert!(SubscriberMatcher::matches(&filter("u1", "s1"), &rec));
        // User agrees but store does not
        assert!(!SubscriberMatcher::matches(&filter("u1", "s2"), &rec));
        // Store agrees but user does not
        assert!(!SubscriberMatcher::matches(&filter("u2", "s1"), &rec));
    }

    #[test]
    fn test_no_filter_matches_nothing() {
        let rec = make_record("u1".into(), "s1".into(), "fp");
        assert!(!SubscriberMatcher::matches(&NotifyFilter::default(), &rec));
        assert!(!SubscriberMatcher::matches(&filter("", ""), &rec));
    }

    #[test]
    fn test_numeric_identifiers_compare_as_strings() {
        let rec = make_record(2u64.into(), 10u64.into(), "fp");
        assert!(SubscriberMatcher::matches(&filter("2", "10"), &rec));
        assert!(SubscriberMatcher::matches(&filter("", "10"), &rec));
        assert!(!SubscriberMatcher::matches(&filter("", "010"), &rec));
    }

    #[test]
    fn test_select_store_fanout_and_narrowing() {
        let records = vec![
            make_record("1".into(), "10".into(), "a"),
            make_record("2".into(), "10".into(), "b"),
            make_record("3".into(), "20".into(), "c"),
        ];
        let matcher = SubscriberMatcher::new();

        let store_wide = matcher.select(&filter("", "10"), records.clone());
        let mut fps: Vec<_> = store_wide.iter().map(|r| r.fingerprint.as_str()).collect();
        fps.sort();
        assert_eq!(fps, vec!["a", "b"]);

        let narrowed = matcher.select(&filter("2", "10"), records);
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].fingerprint, "b");
    }
}
