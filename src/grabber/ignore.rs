//! Download error classification
//!
//! Decides whether a failed download is recorded on the tick's result (and the
//! handler chain still runs) or aborts the tick.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::download::DownloadError;

/// Status codes worth riding out on a flaky camera: redirects mid-reboot,
/// rate limiting, gateway and upstream failures.
pub const RECOMMENDED_IGNORED_STATUSES: [u16; 14] = [
    307, 400, 408, 409, 429, 444, 451, 499, 500, 502, 503, 504, 507, 599,
];

/// Per-condition ignore flags.
///
/// Fields missing from a settings file fall back to [`IgnorePolicy::recommended`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnorePolicy {
    /// Connect/read timeouts
    pub timeout: bool,
    /// DNS, unreachable host, refused connection and other socket errors
    pub network: bool,
    /// HTTP status codes that are ignored; any code not listed propagates
    pub status_codes: BTreeSet<u16>,
}

impl IgnorePolicy {
    /// Nothing is ignored; every download failure aborts the tick.
    pub fn strict() -> Self {
        Self {
            timeout: false,
            network: false,
            status_codes: BTreeSet::new(),
        }
    }

    /// Timeouts, network errors and the recommended status set are ignored.
    pub fn recommended() -> Self {
        Self {
            timeout: true,
            network: true,
            status_codes: RECOMMENDED_IGNORED_STATUSES.into_iter().collect(),
        }
    }

    pub fn ignores_status(&self, code: u16) -> bool {
        self.status_codes.contains(&code)
    }

    /// Set the `ignore_{code}` flag.
    pub fn set_status(&mut self, code: u16, ignore: bool) {
        if ignore {
            self.status_codes.insert(code);
        } else {
            self.status_codes.remove(&code);
        }
    }

    pub fn with_status(mut self, code: u16, ignore: bool) -> Self {
        self.set_status(code, ignore);
        self
    }
}

impl Default for IgnorePolicy {
    fn default() -> Self {
        Self::recommended()
    }
}

/// Whether `error` should be downgraded to a recorded, non-fatal failure.
pub fn should_ignore(error: &DownloadError, policy: &IgnorePolicy) -> bool {
    match error {
        DownloadError::Timeout(_) => policy.timeout,
        DownloadError::Network(_) => policy.network,
        DownloadError::HttpStatus { code, .. } => policy.ignores_status(*code),
        DownloadError::Decode(_) | DownloadError::InvalidUrl(_) | DownloadError::Other(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::DecodeError;

    fn status(code: u16) -> DownloadError {
        DownloadError::HttpStatus {
            code,
            reason: "test".to_string(),
        }
    }

    #[test]
    fn test_timeout_follows_flag() {
        let err = DownloadError::Timeout("slow".to_string());
        let mut policy = IgnorePolicy::strict();
        assert!(!should_ignore(&err, &policy));
        policy.timeout = true;
        assert!(should_ignore(&err, &policy));
    }

    #[test]
    fn test_network_follows_flag() {
        let err = DownloadError::Network("connection refused".to_string());
        let mut policy = IgnorePolicy::strict();
        assert!(!should_ignore(&err, &policy));
        policy.network = true;
        assert!(should_ignore(&err, &policy));
    }

    #[test]
    fn test_status_flag_flips_decision() {
        for code in [301u16, 404, 418, 500, 503, 599] {
            let mut policy = IgnorePolicy::strict();
            policy.set_status(code, true);
            assert!(should_ignore(&status(code), &policy), "{code} should be ignored");

            policy.set_status(code, false);
            assert!(!should_ignore(&status(code), &policy), "{code} should propagate");
        }
    }

    #[test]
    fn test_unlisted_status_propagates() {
        let policy = IgnorePolicy::recommended();
        assert!(should_ignore(&status(503), &policy));
        assert!(!should_ignore(&status(404), &policy));
        assert!(!should_ignore(&status(401), &policy));
    }

    #[test]
    fn test_other_errors_never_ignored() {
        let mut policy = IgnorePolicy::recommended();
        policy.timeout = true;
        policy.network = true;

        assert!(!should_ignore(&DownloadError::Decode(DecodeError::Empty), &policy));
        assert!(!should_ignore(&DownloadError::InvalidUrl("x".to_string()), &policy));
        assert!(!should_ignore(&DownloadError::Other("boom".to_string()), &policy));
    }

    #[test]
    fn test_recommended_set() {
        let policy = IgnorePolicy::default();
        assert!(policy.timeout);
        assert!(policy.network);
        assert_eq!(policy.status_codes.len(), RECOMMENDED_IGNORED_STATUSES.len());
        assert!(policy.ignores_status(307));
        assert!(policy.ignores_status(429));
    }
}
