use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::time::Duration;

/// Short-lived bearer credential
///
/// Lives only in process memory. Installing a new one replaces the old one
/// entirely.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Credential issued at `now` that lives for `ttl`
    pub fn issued(token: impl Into<String>, now: DateTime<Utc>, ttl: Duration) -> Self {
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::new(token, expires_at)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True iff `now >= expires_at - margin`
    pub fn is_expiring_soon(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        let threshold = TimeDelta::from_std(margin)
            .ok()
            .and_then(|delta| self.expires_at.checked_sub_signed(delta))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        now >= threshold
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"[MASKED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Expiry predicate over an optional credential
///
/// Holding no credential is the most urgent case and always reports true.
pub fn is_expiring_soon(
    credential: Option<&Credential>,
    now: DateTime<Utc>,
    margin: Duration,
) -> bool {
    credential.map_or(true, |c| c.is_expiring_soon(now, margin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn base() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_absent_credential_is_expiring() {
        assert!(is_expiring_soon(None, base(), Duration::ZERO));
        assert!(is_expiring_soon(None, base(), Duration::from_secs(120)));
    }

    #[test]
    fn test_margin_boundary() {
        let cred = Credential::issued("abc", base(), Duration::from_secs(900));
        let margin = Duration::from_secs(120);

        let just_before = base() + TimeDelta::seconds(779);
        let at_threshold = base() + TimeDelta::seconds(780);
        assert!(!cred.is_expiring_soon(just_before, margin));
        assert!(cred.is_expiring_soon(at_threshold, margin));
    }

    #[test]
    fn test_debug_masks_token() {
        let cred = Credential::new("very-secret", base());
        assert!(!format!("{cred:?}").contains("very-secret"));
    }

    proptest! {
        #[test]
        fn prop_expiring_soon_matches_threshold(
            ttl_secs in 0u64..100_000,
            margin_secs in 0u64..100_000,
            elapsed_secs in 0i64..200_000,
        ) {
            let cred = Credential::issued("t", base(), Duration::from_secs(ttl_secs));
            let now = base() + TimeDelta::seconds(elapsed_secs);
            let margin = Duration::from_secs(margin_secs);

            let expected = now >= cred.expires_at() - TimeDelta::seconds(margin_secs as i64);
            prop_assert_eq!(is_expiring_soon(Some(&cred), now, margin), expected);
            prop_assert!(is_expiring_soon(None, now, margin));
        }
    }
}
