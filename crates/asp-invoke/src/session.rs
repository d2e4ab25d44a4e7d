// SPDX-License-Identifier: MIT OR Apache-2.0
//! Session records.
//!
//! Run sessions spanning multiple turns carry a stable external id. The id
//! hashes into a record path under `$ASP_HOME/sessions/`, and the record
//! remembers which harness owns the session — reuse under a different
//! harness is a hard error, because harness session state is not portable.

use asp_core::HarnessId;
use asp_store::AspHome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

use crate::InvokeError;

/// Persisted per-session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// The caller-supplied stable id.
    pub external_session_id: String,
    /// The harness this session is bound to.
    pub harness: HarnessId,
    /// The harness's own session id, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harness_session_id: Option<String>,
    /// Model used by the session, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Record path for an external session id:
/// `$ASP_HOME/sessions/<sha256(id)>.json`.
#[must_use]
pub fn session_record_path(home: &AspHome, external_id: &str) -> PathBuf {
    let digest = format!("{:x}", Sha256::digest(external_id.as_bytes()));
    home.sessions().join(format!("{digest}.json"))
}

/// Load the session record for `external_id`, creating it bound to
/// `harness` when absent.
///
/// # Errors
///
/// [`InvokeError::SessionHarnessMismatch`] when the record exists under a
/// different harness; [`InvokeError::SessionRecord`] on unreadable records.
pub fn load_or_create_session(
    home: &AspHome,
    external_id: &str,
    harness: HarnessId,
) -> Result<SessionRecord, InvokeError> {
    let path = session_record_path(home, external_id);
    if path.is_file() {
        let text = std::fs::read_to_string(&path).map_err(|e| InvokeError::SessionRecord {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let record: SessionRecord =
            serde_json::from_str(&text).map_err(|e| InvokeError::SessionRecord {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        if record.harness != harness {
            return Err(InvokeError::SessionHarnessMismatch {
                external_id: external_id.to_owned(),
                recorded: record.harness.to_string(),
                requested: harness.to_string(),
            });
        }
        return Ok(record);
    }

    let now = Utc::now();
    let record = SessionRecord {
        external_session_id: external_id.to_owned(),
        harness,
        harness_session_id: None,
        model: None,
        created_at: now,
        updated_at: now,
    };
    asp_store::write_json_pretty(&path, &record, false)?;
    Ok(record)
}

/// Persist an updated record, refreshing `updated_at`.
///
/// # Errors
///
/// Returns [`InvokeError::Store`] on write failure.
pub fn touch_session(home: &AspHome, mut record: SessionRecord) -> Result<SessionRecord, InvokeError> {
    record.updated_at = Utc::now();
    let path = session_record_path(home, &record.external_session_id);
    asp_store::write_json_pretty(&path, &record, false)?;
    Ok(record)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
