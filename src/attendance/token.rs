use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use tracing::debug;

use crate::attendance::error::CheckinError;
use crate::model::attendance::CheckinToken;

/// In-process store of the one live check-in token per calendar day.
///
/// State is lost on restart and is not shared between server processes, so
/// every instance behind a load balancer hands out its own token.
#[derive(Default)]
pub struct CheckinTokenRegistry {
    tokens: Mutex<BTreeMap<NaiveDate, CheckinToken>>,
}

impl CheckinTokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns today's token, creating it on first request. Tokens for earlier
    /// days are dropped first.
    pub fn get_or_create_token(&self, today: NaiveDate) -> CheckinToken {
        let mut tokens = self.lock();

        let live = tokens.split_off(&today);
        let purged = tokens.len();
        *tokens = live;
        if purged > 0 {
            debug!(purged, %today, "Purged stale check-in tokens");
        }

        tokens
            .entry(today)
            .or_insert_with(|| {
                debug!(%today, "Issued new check-in token");
                CheckinToken::generate(today)
            })
            .clone()
    }

    pub fn validate(&self, date: NaiveDate, token: &str) -> bool {
        self.verify(date, token).is_ok()
    }

    /// Like [`validate`](Self::validate), but tells a missing token apart from a wrong one.
    pub fn verify(&self, date: NaiveDate, token: &str) -> Result<(), CheckinError> {
        match self.lock().get(&date) {
            None => Err(CheckinError::NoTokenIssued),
            Some(stored) if stored.value == token => Ok(()),
            Some(_) => Err(CheckinError::TokenMismatch),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<NaiveDate, CheckinToken>> {
        // the map is never left half-written, so a poisoned lock is still usable
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn stored_dates(&self) -> Vec<NaiveDate> {
        self.lock().keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[test]
    fn same_day_requests_return_the_same_token() {
        let registry = CheckinTokenRegistry::new();
        let first = registry.get_or_create_token(day(10));
        let second = registry.get_or_create_token(day(10));
        assert_eq!(first, second);
        assert_eq!(first.for_date, day(10));
    }

    #[test]
    fn new_day_purges_earlier_tokens() {
        let registry = CheckinTokenRegistry::new();
        let old = registry.get_or_create_token(day(9));
        let old_value = old.value.clone();
        registry.get_or_create_token(day(10));

        assert_eq!(registry.stored_dates(), vec![day(10)]);
        assert!(!registry.validate(day(9), &old_value));
    }

    #[test]
    fn purge_keeps_later_dates() {
        let registry = CheckinTokenRegistry::new();
        registry.get_or_create_token(day(12));
        registry.get_or_create_token(day(10));
        assert_eq!(registry.stored_dates(), vec![day(10), day(12)]);
    }

    #[test]
    fn validate_requires_exact_match_for_that_date() {
        let registry = CheckinTokenRegistry::new();
        let token = registry.get_or_create_token(day(10));

        assert!(registry.validate(day(10), &token.value));
        assert!(!registry.validate(day(10), "not-the-token"));
        assert!(!registry.validate(day(11), &token.value));
    }

    #[test]
    fn padded_token_is_not_the_same_token() {
        let registry = CheckinTokenRegistry::new();
        let token = registry.get_or_create_token(day(10));

        assert!(!registry.validate(day(10), &format!("  {}\n", token.value)));
        assert!(!registry.validate(day(10), &token.value.to_uppercase()));
        assert_matches!(
            registry.verify(day(10), &format!("{} ", token.value)),
            Err(CheckinError::TokenMismatch)
        );
    }

    #[test]
    fn verify_distinguishes_missing_from_wrong() {
        let registry = CheckinTokenRegistry::new();
        assert_matches!(
            registry.verify(day(10), "anything"),
            Err(CheckinError::NoTokenIssued)
        );

        registry.get_or_create_token(day(10));
        assert_matches!(
            registry.verify(day(10), "anything"),
            Err(CheckinError::TokenMismatch)
        );
    }

    #[test]
    fn validation_never_creates_a_token() {
        let registry = CheckinTokenRegistry::new();
        assert!(!registry.validate(day(10), ""));
        assert!(registry.stored_dates().is_empty());
    }
}
