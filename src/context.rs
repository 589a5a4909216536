// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Framework-independent request context.
//!
//! The admission check consumes exactly these fields and nothing else, so
//! the core has no dependency on any particular HTTP framework. The HTTP
//! layer (or an external caller of `/check`) builds one per request.

use std::collections::HashMap;

/// The slice of an inbound request the admission check looks at.
///
/// Missing headers are `None` and degrade to empty values downstream;
/// a missing or empty path degrades to `"unknown"`. Nothing here can make
/// the check fail.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Raw transport-level peer address, if known
    pub remote_addr: Option<String>,
    /// Request path (or full URL; normalized before keying)
    pub path: String,
    /// Request method
    pub method: String,
    /// CDN-provided client address (`CF-Connecting-IP`)
    pub cf_connecting_ip: Option<String>,
    /// Reverse-proxy client address (`X-Real-IP`)
    pub real_ip: Option<String>,
    /// Forwarded chain (`X-Forwarded-For`), comma-separated
    pub forwarded_for: Option<String>,
    /// `User-Agent`
    pub user_agent: Option<String>,
    /// `Accept`
    pub accept: Option<String>,
    /// `Accept-Language`
    pub accept_language: Option<String>,
    /// `Accept-Encoding`
    pub accept_encoding: Option<String>,
    /// `Connection`
    pub connection: Option<String>,
}

impl RequestContext {
    /// Create a context with just method and path set.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Build a context from a plain header map (keys matched
    /// case-insensitively) plus transport address, method, and path.
    pub fn from_header_map(
        remote_addr: Option<String>,
        method: impl Into<String>,
        path: impl Into<String>,
        headers: &HashMap<String, String>,
    ) -> Self {
        let lower: HashMap<String, &str> = headers
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.as_str()))
            .collect();
        let get = |name: &str| lower.get(name).map(|v| v.to_string());

        Self {
            remote_addr,
            method: method.into(),
            path: path.into(),
            cf_connecting_ip: get("cf-connecting-ip"),
            real_ip: get("x-real-ip"),
            forwarded_for: get("x-forwarded-for"),
            user_agent: get("user-agent"),
            accept: get("accept"),
            accept_language: get("accept-language"),
            accept_encoding: get("accept-encoding"),
            connection: get("connection"),
        }
    }

    /// Normalized request path used in the composite key.
    ///
    /// Accepts either a bare path or a full URL; query and fragment are
    /// dropped. An empty or unparseable value degrades to `"unknown"`.
    pub fn normalized_path(&self) -> String {
        let raw = self.path.trim();
        if raw.is_empty() {
            return "unknown".to_string();
        }

        if let Ok(parsed) = url::Url::parse(raw) {
            return parsed.path().to_string();
        }

        let without_fragment = raw.split('#').next().unwrap_or(raw);
        let without_query = without_fragment.split('?').next().unwrap_or(raw);
        if without_query.is_empty() {
            "unknown".to_string()
        } else {
            without_query.to_string()
        }
    }
}
