// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Client fingerprinting from header shape.
//!
//! Hashes the method plus a fixed ordered list of header values into a
//! stable digest. Requests with identical header shapes from different
//! addresses collapse to the same fingerprint on purpose: the quota
//! calculator uses that collision to spot one client rotating through
//! many addresses.

use crate::context::RequestContext;
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Hex length of a fingerprint (first 16 digest bytes).
pub const FINGERPRINT_LEN: usize = 32;

/// Derive the fingerprint for a request.
///
/// Input order is fixed: method, user-agent, accept, accept-language,
/// accept-encoding, connection, pipe-joined with missing headers as empty
/// strings.
pub fn fingerprint(ctx: &RequestContext) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ctx.method.as_bytes());
    for value in [
        &ctx.user_agent,
        &ctx.accept,
        &ctx.accept_language,
        &ctx.accept_encoding,
        &ctx.connection,
    ] {
        hasher.update(b"|");
        hasher.update(value.as_deref().unwrap_or("").as_bytes());
    }

    let digest = hasher.finalize();
    let mut out = String::with_capacity(FINGERPRINT_LEN);
    for byte in &digest[..FINGERPRINT_LEN / 2] {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
