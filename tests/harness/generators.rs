// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for attack simulation.

use ingress_guard::RequestContext;

/// Generate identities, each in its own /24 subnet.
pub fn generate_identities(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("203.{}.{}.25", (i >> 8) & 0xFF, i & 0xFF))
        .collect()
}

/// Generate identities inside one /24 subnet.
pub fn generate_subnet_identities(count: usize, prefix: &str) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}.{}", i % 256)).collect()
}

/// Browser-shaped user agents.
pub fn browser_agents() -> Vec<&'static str> {
    vec![
        "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0.0.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 Safari/17.2",
        "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0",
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) Mobile/15E148",
    ]
}

/// User agents that should trip the seeded signature set.
pub fn bot_agents() -> Vec<&'static str> {
    vec![
        "GoogleBot/2.1 (+http://www.google.com/bot.html)",
        "Mozilla/5.0 (compatible; bingbot/2.0; +http://www.bing.com/bingbot.htm)",
        "curl/8.4.0",
        "Wget/1.21.4",
        "python-requests/2.31.0",
        "Mozilla/5.0 (compatible; SemrushBot/7~bl; +http://www.semrush.com/bot.html)",
        "Mozilla/5.0 (compatible; AhrefsBot/7.0; +http://ahrefs.com/robot/)",
    ]
}

/// Catalog paths a content site would serve.
pub fn content_paths() -> Vec<&'static str> {
    vec![
        "/tours",
        "/tours/rome-colosseum",
        "/tours/paris-louvre",
        "/reviews",
        "/search",
    ]
}

/// Build a browser-shaped request context for an identity.
pub fn browser_context(identity: &str, path: &str, agent: &str) -> RequestContext {
    let mut ctx = RequestContext::new("GET", path);
    ctx.remote_addr = Some(identity.to_string());
    ctx.user_agent = Some(agent.to_string());
    ctx.accept = Some("text/html,application/xhtml+xml".to_string());
    ctx.accept_language = Some("en-GB,en;q=0.8".to_string());
    ctx.accept_encoding = Some("gzip, deflate, br".to_string());
    ctx.connection = Some("keep-alive".to_string());
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_identities_are_unique() {
        let identities = generate_identities(300);
        let unique: std::collections::HashSet<_> = identities.iter().collect();
        assert_eq!(unique.len(), 300);
    }

    #[test]
    fn test_subnet_identities_share_prefix() {
        let identities = generate_subnet_identities(20, "198.51.100");
        assert!(identities.iter().all(|ip| ip.starts_with("198.51.100.")));
    }
}
