use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};

/// Merges `new_condition` into `conditions`, keyed by its type.
///
/// An existing condition takes over status, reason, message and observed
/// generation of the new one; its `lastTransitionTime` only moves when the
/// status changed. A condition of an unseen type is appended with the current
/// time. Returns whether anything changed.
pub fn set_status_condition(conditions: &mut Vec<Condition>, new_condition: Condition) -> bool {
    let Some(existing) = conditions.iter_mut().find(|c| c.type_ == new_condition.type_) else {
        conditions.push(Condition {
            last_transition_time: Time(Utc::now()),
            ..new_condition
        });
        return true;
    };

    let mut changed = false;
    if existing.status != new_condition.status {
        existing.status = new_condition.status;
        existing.last_transition_time = Time(Utc::now());
        changed = true;
    }
    if existing.reason != new_condition.reason {
        existing.reason = new_condition.reason;
        changed = true;
    }
    if existing.message != new_condition.message {
        existing.message = new_condition.message;
        changed = true;
    }
    if existing.observed_generation != new_condition.observed_generation {
        existing.observed_generation = new_condition.observed_generation;
        changed = true;
    }
    changed
}

pub fn find_status_condition<'a>(conditions: &'a [Condition], condition_type: &str) -> Option<&'a Condition> {
    conditions.iter().find(|condition| condition.type_ == condition_type)
}

/// Returns true when the condition_type is present and set to `True`
pub fn is_status_condition_true(conditions: &[Condition], condition_type: &str) -> bool {
    find_status_condition(conditions, condition_type).is_some_and(|condition| condition.status == "True")
}
