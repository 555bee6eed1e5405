//! Per-stream sliding-window freshness check. Ground truth is
//! `freshness.c`'s `freshness_check`; this crate carries one
//! `FreshnessWindow` per policy entry instead of a single static, so a
//! gateway process can guard more than one stream. `freshness.c` also
//! declares a standalone `ttl_check`, but `bitw_engine.c` never calls it
//! (only `freshness_check`, whose own `ttl_ms` parameter it ignores), so
//! it is not ported here.

use crate::error::VerifyError;
use crate::types::FreshnessWindow;

/// Validates `(st, sq)` against the stream's last-seen state and advances
/// the window on success. `now_ms` is the caller's current monotonic-ish
/// wall clock reading in milliseconds.
pub fn check(
    window: &mut FreshnessWindow,
    st: u32,
    sq: u32,
    max_sq_gap: u32,
    max_age_ms: u64,
    now_ms: u64,
) -> Result<(), VerifyError> {
    if !window.initialized {
        window.last_st = st;
        window.last_sq = sq;
        window.last_seen_ms = now_ms;
        window.initialized = true;
        return Ok(());
    }

    if st < window.last_st {
        return Err(VerifyError::FreshnessStNumRegression);
    }
    if st == window.last_st {
        if sq <= window.last_sq {
            return Err(VerifyError::FreshnessSqNumRegression);
        }
        if sq - window.last_sq > max_sq_gap {
            return Err(VerifyError::FreshnessSqGapExceeded);
        }
    } else if sq > max_sq_gap {
        // A new state resets sqNum; still bound it against the same gap.
        return Err(VerifyError::FreshnessSqGapExceeded);
    }

    if now_ms.saturating_sub(window.last_seen_ms) > max_age_ms {
        return Err(VerifyError::FreshnessStale);
    }

    window.last_st = st;
    window.last_sq = sq;
    window.last_seen_ms = now_ms;
    Ok(())
}
