// security/src/lib.rs

use tracing::warn;

use models::{ProfileError, ProfileResult};

/// The authorization policy gating bulk/administrative operations: a single
/// static shared secret compared on every call. The policy is constructed
/// once at startup and held in the HTTP state, so handlers invoke a
/// capability instead of re-reading configuration.
///
/// No rate limiting, lockout, or per-caller tracking; that is outside this
/// service's scope.
#[derive(Clone, Debug)]
pub struct AdminKeyPolicy {
    expected: Option<String>,
}

impl AdminKeyPolicy {
    /// Builds the policy from the configured secret. `None` means the server
    /// was deployed without an admin key; the policy then denies everything
    /// and reports the misconfiguration rather than a plain denial.
    pub fn new(expected: Option<String>) -> Self {
        if expected.is_none() {
            warn!("No admin API key configured; admin endpoints will refuse all callers");
        }
        Self { expected }
    }

    /// Checks a caller-supplied secret.
    ///
    /// # Errors
    /// - `ServerMisconfigured` when no secret is configured (fails closed).
    /// - `Unauthorized` when the supplied secret is absent or not an exact
    ///   match.
    pub fn authorize(&self, supplied: Option<&str>) -> ProfileResult<()> {
        let expected = self
            .expected
            .as_deref()
            .ok_or(ProfileError::ServerMisconfigured("admin API key"))?;
        match supplied {
            Some(candidate) if candidate == expected => Ok(()),
            _ => Err(ProfileError::Unauthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AdminKeyPolicy;
    use models::ProfileError;

    #[test]
    fn should_allow_exact_match() {
        let policy = AdminKeyPolicy::new(Some("s3cret".to_string()));
        assert!(policy.authorize(Some("s3cret")).is_ok());
    }

    #[test]
    fn should_deny_wrong_key() {
        let policy = AdminKeyPolicy::new(Some("s3cret".to_string()));
        assert!(matches!(
            policy.authorize(Some("guess")),
            Err(ProfileError::Unauthorized)
        ));
    }

    #[test]
    fn should_deny_missing_key() {
        let policy = AdminKeyPolicy::new(Some("s3cret".to_string()));
        assert!(matches!(
            policy.authorize(None),
            Err(ProfileError::Unauthorized)
        ));
    }

    #[test]
    fn should_fail_closed_when_unconfigured() {
        let policy = AdminKeyPolicy::new(None);
        assert!(matches!(
            policy.authorize(Some("anything")),
            Err(ProfileError::ServerMisconfigured(_))
        ));
    }

    #[test]
    fn should_not_accept_prefix_match() {
        let policy = AdminKeyPolicy::new(Some("s3cret".to_string()));
        assert!(policy.authorize(Some("s3cret-and-more")).is_err());
    }
}
