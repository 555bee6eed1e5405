//! Subscriber trip-rule evaluation and the `Idle -> ArmCand -> Tripped ->
//! ResetPend` finite state machine. Ground truth is `sub_core.c`:
//! `trip_logic_eval_rules_anyall`, `trip_logic_eval_trip`,
//! `trip_logic_eval_normal`, and the per-frame `subscriber_listener`
//! callback plus its `reset_requested`/baseline-relearn handling in
//! `subscriber_run`'s main loop.

use crate::types::{RuleFieldType, RuleLogic, TripLogic, TripRule, TripRuntime, TripState};

/// One dataset entry, already reduced to the two types a trip rule can
/// match against. The subscriber's typed GOOSE decode produces these.
#[derive(Debug, Clone, Copy)]
pub enum DatasetValue {
    Bool(bool),
    Int(i64),
    /// A decoded dataset entry with no rule-evaluable type (string, array,
    /// structure, ...). Kept as a placeholder so later indices still line
    /// up with the dataset position the subscriber observed on the wire.
    Other,
}

/// What the subscriber observed on one incoming, already-verified frame.
pub struct FrameObservation<'a> {
    pub st_num: u32,
    pub sq_num: u32,
    pub valid: bool,
    pub now_ms: u64,
    pub values: &'a [DatasetValue],
}

/// The result of folding one `FrameObservation` into a `TripRuntime`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripOutcome {
    /// Mirrors the status file's `trip` field: true once latched, for
    /// every frame from then on, matching the original's unconditional
    /// final `write_status_json` call.
    pub trip: bool,
    pub trip_reason: Option<String>,
    /// Set only on the frame that performs the `ArmCand -> Tripped`
    /// transition, carrying the specific rule label that fired. Useful for
    /// an operator log line; the persisted status file does not keep it.
    pub newly_tripped_reason: Option<String>,
}

fn rule_hits(rule: &TripRule, values: &[DatasetValue]) -> bool {
    let Some(value) = values.get(rule.index) else {
        return false;
    };
    match (rule.rule_type, value) {
        (RuleFieldType::Bool, DatasetValue::Bool(b)) => rule.equals.as_bool() == Some(*b),
        (RuleFieldType::Int, DatasetValue::Int(v)) => rule.equals.as_i64() == Some(*v),
        _ => false,
    }
}

/// Evaluates a rule set in "any" mode: true if at least one rule hits, with
/// the first hitting rule's non-empty label as the reason.
fn eval_rules_any(rules: &[TripRule], values: &[DatasetValue]) -> (bool, String) {
    let mut hit_any = false;
    let mut reason = String::new();
    for rule in rules {
        if rule_hits(rule, values) {
            hit_any = true;
            if reason.is_empty() && !rule.label.is_empty() {
                reason = rule.label.clone();
            }
        }
    }
    (hit_any, reason)
}

fn eval_trip(tl: &TripLogic, values: &[DatasetValue]) -> (bool, String) {
    if tl.rules.is_empty() {
        return (false, String::new());
    }
    let (any_hit, reason) = eval_rules_any(&tl.rules, values);
    match tl.logic {
        RuleLogic::Any => (any_hit, reason),
        RuleLogic::All => {
            let hits = tl.rules.iter().filter(|r| rule_hits(r, values)).count();
            if hits == tl.rules.len() {
                let reason = if reason.is_empty() {
                    tl.rules[0].label.clone()
                } else {
                    reason
                };
                (true, reason)
            } else {
                (false, String::new())
            }
        }
    }
}

/// Whether the dataset looks "normal" enough to start the reset-eligibility
/// countdown. `reset.normal_required == false` makes this trivially true;
/// otherwise every configured `normal_rules` entry must match.
fn eval_normal(tl: &TripLogic, values: &[DatasetValue]) -> bool {
    if !tl.reset.normal_required {
        return true;
    }
    if tl.reset.normal_rules.is_empty() {
        return false;
    }
    tl.reset.normal_rules.iter().all(|r| rule_hits(r, values))
}

/// Folds one observed frame into the runtime state, returning the status
/// this frame should be reported with.
pub fn on_frame(rt: &mut TripRuntime, tl: &TripLogic, obs: &FrameObservation) -> TripOutcome {
    let iat = rt.last_arrival_ms.map(|last| obs.now_ms.saturating_sub(last));
    rt.last_arrival_ms = Some(obs.now_ms);

    if !obs.valid {
        return TripOutcome {
            trip: rt.latched,
            trip_reason: rt.latched.then(|| "latched".to_string()),
            newly_tripped_reason: None,
        };
    }

    let st_changed = obs.st_num != rt.last_st_num.unwrap_or(0);
    let mut newly_tripped_reason = None;

    match rt.state {
        TripState::Idle => {
            if st_changed {
                rt.state = TripState::ArmCand;
                rt.st_change_ms = Some(obs.now_ms);
                rt.burst_count = 0;
                rt.in_burst_window = true;
                rt.sq_seen_in_state = 0;
                rt.state_sq_base = Some(obs.sq_num);
            }
        }
        TripState::ArmCand => {
            let since = obs.now_ms.saturating_sub(rt.st_change_ms.unwrap_or(obs.now_ms));
            let window = if tl.require_burst { tl.burst_window_ms } else { 0 };
            if since <= window {
                if tl.require_burst {
                    if let Some(iat) = iat {
                        if iat <= tl.burst_interval_max_ms {
                            rt.burst_count += 1;
                        }
                    }
                }
            } else {
                rt.in_burst_window = false;
            }

            let (rules_hit, reason) = eval_trip(tl, obs.values);
            let burst_ok = !tl.require_burst || rt.burst_count >= tl.burst_min_frames;

            if rules_hit && burst_ok {
                rt.state = TripState::Tripped;
                rt.latched = true;
                newly_tripped_reason = Some(if reason.is_empty() { "trip".to_string() } else { reason });
            } else if !rt.in_burst_window {
                rt.state = TripState::Idle;
            }
        }
        TripState::Tripped => {
            if st_changed && eval_normal(tl, obs.values) {
                rt.state = TripState::ResetPend;
                rt.normal_start_ms = Some(obs.now_ms);
                rt.last_burst_like_ms = Some(obs.now_ms);
                rt.sq_seen_in_state = 0;
                rt.state_sq_base = Some(obs.sq_num);
            }
        }
        TripState::ResetPend => {
            if obs.sq_num >= rt.state_sq_base.unwrap_or(0) {
                rt.sq_seen_in_state += 1;
            }
            if tl.require_burst {
                if let Some(iat) = iat {
                    if iat <= tl.burst_interval_max_ms {
                        rt.last_burst_like_ms = Some(obs.now_ms);
                    }
                }
            }
        }
    }

    rt.last_st_num = Some(obs.st_num);

    TripOutcome {
        trip: rt.latched,
        trip_reason: rt.latched.then(|| "latched".to_string()),
        newly_tripped_reason,
    }
}

/// Operator-requested manual reset (SIGUSR1). Only meaningful when
/// `manual_reset_required` is true, since that's the only case where a
/// latch never clears on its own; callers still call this unconditionally,
/// matching the original's unconditional `reset_requested` handling.
pub fn manual_reset(rt: &mut TripRuntime) {
    rt.latched = false;
    rt.state = TripState::Idle;
    rt.st_change_ms = None;
    rt.burst_count = 0;
    rt.in_burst_window = false;
    rt.sq_seen_in_state = 0;
}

/// Forgets the last-seen `stNum` once a stream has been silent for
/// `baseline_relearn_ms`, so the next frame's `stNum` is treated as a fresh
/// baseline instead of a suspicious jump.
pub fn maybe_relearn_baseline(rt: &mut TripRuntime, baseline_relearn_ms: u64, now_ms: u64) {
    if let Some(last) = rt.last_arrival_ms {
        if now_ms.saturating_sub(last) >= baseline_relearn_ms {
            rt.last_st_num = None;
        }
    }
}
