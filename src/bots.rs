// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Known automation signature matching.
//!
//! A positive match short-circuits the admission decision before any
//! counter is touched. The seed list is static; signatures learned at
//! runtime (user-agents implicated by attack detection) are appended to a
//! concurrent set and never removed.

use dashmap::DashSet;
use tracing::debug;

/// Seeded automation signatures, matched case-insensitively as substrings.
const SEED_SIGNATURES: &[&str] = &[
    "googlebot",
    "bingbot",
    "slurp",
    "duckduckbot",
    "baiduspider",
    "yandexbot",
    "semrushbot",
    "ahrefsbot",
    "mj12bot",
    "petalbot",
    "crawler",
    "spider",
    "scraper",
    "curl/",
    "wget/",
    "python-requests",
    "python-urllib",
    "go-http-client",
    "okhttp",
    "headlesschrome",
    "phantomjs",
    "selenium",
    "puppeteer",
];

/// Seeded plus runtime-learned bot signatures.
pub struct BotSignatures {
    learned: DashSet<String>,
}

impl BotSignatures {
    /// Create a signature set holding only the seeds.
    pub fn new() -> Self {
        Self {
            learned: DashSet::new(),
        }
    }

    /// Test a user-agent against seeded and learned signatures.
    pub fn matches(&self, user_agent: &str) -> bool {
        if user_agent.is_empty() {
            return false;
        }
        let ua = user_agent.to_lowercase();
        if SEED_SIGNATURES.iter().any(|sig| ua.contains(sig)) {
            return true;
        }
        self.learned.iter().any(|sig| ua.contains(sig.key().as_str()))
    }

    /// Record a user-agent implicated by attack detection. Append-only;
    /// agents already covered by a signature are not re-learned.
    pub fn learn(&self, user_agent: &str) {
        let ua = user_agent.trim().to_lowercase();
        if ua.is_empty() || self.matches(&ua) {
            return;
        }
        debug!(signature = %ua, "Learned bot signature");
        self.learned.insert(ua);
    }

    /// Total signature count (seeds + learned).
    pub fn len(&self) -> usize {
        SEED_SIGNATURES.len() + self.learned.len()
    }

    pub fn is_empty(&self) -> bool {
        false // seeds are always present
    }
}

impl Default for BotSignatures {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_match_is_case_insensitive() {
        let signatures = BotSignatures::new();
        assert!(signatures.matches("GoogleBot/2.1 (+http://www.google.com/bot.html)"));
        assert!(signatures.matches("Mozilla/5.0 (compatible; bingbot/2.0)"));
        assert!(signatures.matches("curl/8.4.0"));
    }

    #[test]
    fn test_browser_agent_passes() {
        let signatures = BotSignatures::new();
        assert!(!signatures.matches(
            "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0"
        ));
    }

    #[test]
    fn test_empty_agent_is_not_a_bot() {
        // Fail open: an absent user-agent alone is not proof of automation
        let signatures = BotSignatures::new();
        assert!(!signatures.matches(""));
    }

    #[test]
    fn test_learned_signature_matches_afterwards() {
        let signatures = BotSignatures::new();
        let agent = "FlashSaleSniper/0.3";
        assert!(!signatures.matches(agent));

        signatures.learn(agent);
        assert!(signatures.matches(agent));
        assert_eq!(signatures.len(), SEED_SIGNATURES.len() + 1);
    }

    #[test]
    fn test_covered_agent_not_relearned() {
        let signatures = BotSignatures::new();
        signatures.learn("Googlebot/2.1");
        assert_eq!(signatures.len(), SEED_SIGNATURES.len());
    }
}
