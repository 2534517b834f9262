/// Alert activity detection.
///
/// The NWS feed includes alerts that are scheduled but not yet in effect,
/// alerts that have lapsed but not been cancelled, and test or exercise
/// messages. The dashboard separates "matched" from "active right now"
/// using the check below.
///
/// # Clock injection
/// Functions take a `now: DateTime<Utc>` parameter rather than calling
/// `Utc::now()` internally, so activity is deterministic in tests.

use chrono::{DateTime, Utc};

use crate::model::{AlertRecord, AlertStatus};

// ---------------------------------------------------------------------------
// Activity check
// ---------------------------------------------------------------------------

/// Returns `true` if the alert is an actual (non-test) message in effect at
/// `now`.
///
/// The window is inclusive on both ends:
///   effective <= now <= expires  →  active
///
/// When either bound is missing the alert is treated as active as long as
/// its status is `Actual`; a live alert with incomplete timing should still
/// show up on the dashboard.
pub fn is_active_at(alert: &AlertRecord, now: DateTime<Utc>) -> bool {
    if alert.status != AlertStatus::Actual {
        return false;
    }

    match (alert.effective, alert.expires) {
        (Some(effective), Some(expires)) => effective <= now && now <= expires,
        _ => true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
