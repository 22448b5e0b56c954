//! Outbound request identities.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Browser user agents used when no pool is configured.
const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
];

/// One outbound request identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Identity {
    pub user_agent: String,
    pub proxy: Option<String>,
}

/// Supplies a request identity per fetch attempt.
///
/// Selection is random over a read-mostly pool; the rotator is cheap to
/// share across workers. The user agent is never empty: an empty or
/// all-blank configured pool falls back to the built-in list, and an empty
/// proxy pool simply omits the proxy.
#[derive(Debug, Clone)]
pub struct IdentityRotator {
    user_agents: Vec<String>,
    proxies: Vec<String>,
}

impl IdentityRotator {
    /// Build a rotator from configured pools.
    pub fn new(user_agents: Vec<String>, proxies: Vec<String>) -> Self {
        let mut user_agents: Vec<String> = user_agents
            .into_iter()
            .filter(|ua| !ua.trim().is_empty())
            .collect();
        if user_agents.is_empty() {
            user_agents = DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect();
        }
        let proxies = proxies
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect();
        Self {
            user_agents,
            proxies,
        }
    }

    /// Rotator with the built-in user agents and no proxies.
    pub fn with_defaults() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Pick the identity for the next attempt.
    pub fn next_identity(&self) -> Identity {
        let mut rng = rand::thread_rng();
        let user_agent = self
            .user_agents
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| DEFAULT_USER_AGENTS[0].to_string());
        let proxy = self.proxies.choose(&mut rng).cloned();
        Identity { user_agent, proxy }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_never_empty() {
        let rotator = IdentityRotator::new(vec![], vec![]);
        for _ in 0..20 {
            assert!(!rotator.next_identity().user_agent.is_empty());
        }

        let rotator = IdentityRotator::new(vec!["  ".to_string(), String::new()], vec![]);
        assert!(!rotator.next_identity().user_agent.is_empty());
    }

    #[test]
    fn test_empty_proxy_pool_omits_proxy() {
        let rotator = IdentityRotator::new(vec!["ua-1".to_string()], vec![]);
        assert_eq!(rotator.next_identity().proxy, None);
    }

    #[test]
    fn test_configured_pools_are_used() {
        let rotator = IdentityRotator::new(
            vec!["ua-1".to_string()],
            vec!["http://proxy:8080".to_string()],
        );
        let identity = rotator.next_identity();
        assert_eq!(identity.user_agent, "ua-1");
        assert_eq!(identity.proxy.as_deref(), Some("http://proxy:8080"));
    }
}
