// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Canonical client identity resolution.
//!
//! Extracts the best available client address from prioritized proxy
//! headers, validating literal IP syntax at each step:
//!
//! 1. `CF-Connecting-IP` (CDN-trusted), if a valid IP
//! 2. `X-Real-IP`, if a valid IP
//! 3. First valid, non-private entry of `X-Forwarded-For`
//! 4. Raw transport address
//! 5. `"unknown"`
//!
//! Resolution never fails; an unattributable request simply shares the
//! `"unknown"` identity. Private and reserved addresses are skipped during
//! the forwarded-for scan (a proxy's own hop, not the client) but are still
//! acceptable as the raw-address fallback.

use crate::context::RequestContext;
use std::net::IpAddr;

/// Resolve the canonical client address for a request.
pub fn resolve_identity(ctx: &RequestContext) -> String {
    if let Some(ip) = ctx.cf_connecting_ip.as_deref().map(str::trim) {
        if parse_ip(ip).is_some() {
            return ip.to_string();
        }
    }

    if let Some(ip) = ctx.real_ip.as_deref().map(str::trim) {
        if parse_ip(ip).is_some() {
            return ip.to_string();
        }
    }

    if let Some(chain) = ctx.forwarded_for.as_deref() {
        for hop in chain.split(',') {
            let hop = hop.trim();
            match parse_ip(hop) {
                Some(ip) if !is_private(ip) => return hop.to_string(),
                _ => continue,
            }
        }
    }

    if let Some(addr) = ctx.remote_addr.as_deref().map(str::trim) {
        if !addr.is_empty() {
            // Strip a port if the transport layer handed us host:port
            let host = strip_port(addr);
            if !host.is_empty() {
                return host.to_string();
            }
        }
    }

    "unknown".to_string()
}

/// Parse a literal IPv4 or IPv6 address.
fn parse_ip(value: &str) -> Option<IpAddr> {
    value.parse::<IpAddr>().ok()
}

/// Addresses that can never be an internet client: RFC 1918, loopback,
/// link-local, unspecified, broadcast; IPv6 unique-local and link-local.
fn is_private(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
        }
        IpAddr::V6(v6) => {
            let segments = v6.segments();
            v6.is_loopback()
                || v6.is_unspecified()
                || (segments[0] & 0xfe00) == 0xfc00 // fc00::/7 unique-local
                || (segments[0] & 0xffc0) == 0xfe80 // fe80::/10 link-local
        }
    }
}

/// Drop a trailing `:port` from an IPv4 `host:port` or bracketed IPv6
/// `[host]:port` transport address. Bare addresses pass through.
fn strip_port(addr: &str) -> &str {
    if addr.parse::<IpAddr>().is_ok() {
        return addr;
    }
    if let Some(rest) = addr.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            return &rest[..end];
        }
    }
    if let Some((host, port)) = addr.rsplit_once(':') {
        if port.chars().all(|c| c.is_ascii_digit()) && host.parse::<IpAddr>().is_ok() {
            return host;
        }
    }
    addr
}
