//! Advisory status JSON, written once per processed frame so an operator or
//! manager process can poll liveness without parsing GOOSE itself. Ground
//! truth is `sub_core.c`'s `write_status_json` (subscriber) and the
//! gateway-side per-frame logging spec.md §6 describes for the bump-in-the-
//! wire process; both write the same shape of document, just with different
//! fields populated.

use std::fs;
use std::path::PathBuf;

/// One status document. `serde(skip_serializing_if = "Option::is_none")`
/// keeps absent fields out of the file rather than writing `null`, matching
/// the original's conditional `json_object_object_add` calls.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StatusRecord {
    pub pid: u32,
    #[serde(rename = "stNum")]
    pub st_num: u32,
    #[serde(rename = "sqNum")]
    pub sq_num: u32,
    #[serde(skip_serializing_if = "Option::is_none", rename = "ttl_ms")]
    pub ttl_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "lastRecvMs")]
    pub last_recv_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "lastPublishMs")]
    pub last_publish_ms: Option<u64>,
    #[serde(rename = "lastUpdate")]
    pub last_update: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "trip_reason")]
    pub trip_reason: Option<String>,
}

/// Builds the path a status writer should use for `prefix` ("goose_sub" or
/// "goose_pub"), matching `/tmp/<prefix>_status_<pid>.json`.
pub fn status_path(prefix: &str, pid: u32) -> PathBuf {
    PathBuf::from(format!("/tmp/{prefix}_status_{pid}.json"))
}

/// Writes `record` to `path` as plain (non-pretty) JSON, matching
/// `JSON_C_TO_STRING_PLAIN`. Write failures are logged, not fatal: status
/// reporting is advisory and must never interrupt the processing loop.
pub fn write_status(path: &std::path::Path, record: &StatusRecord) {
    match serde_json::to_string(record) {
        Ok(text) => {
            if let Err(e) = fs::write(path, text) {
                log::warn!("failed to write status file {}: {e}", path.display());
            }
        }
        Err(e) => log::warn!("failed to serialize status record: {e}"),
    }
}

/// Removes the status file on clean shutdown, matching `sub_core.c`'s
/// `unlink` call at the end of `subscriber_run`. Best-effort: a missing file
/// is not an error.
pub fn remove_status(path: &std::path::Path) {
    let _ = fs::remove_file(path);
}
