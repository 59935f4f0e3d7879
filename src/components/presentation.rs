// Foreground presentation decision
//
// Decided per payload rather than held as process-wide state, so concurrent
// deliveries cannot apply one notification's priority to another.

use serde::{Deserialize, Serialize};

use super::payload::NotificationPayload;

/// How the OS should present a notification that arrives while the app is
/// foregrounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForegroundPresentation {
    /// Show a visible alert banner.
    pub alert: bool,
    /// Play the notification sound.
    pub sound: bool,
    /// Update the app badge.
    pub badge: bool,
}

impl ForegroundPresentation {
    /// Compute the presentation for a single payload: a sender priority of
    /// `high` or `max` raises the alert banner; any other value, or no
    /// priority at all, suppresses the alert while leaving sound on.
    pub fn for_payload(payload: &NotificationPayload) -> Self {
        let alert = payload
            .priority()
            .is_some_and(|priority| priority.wants_alert());
        Self {
            alert,
            sound: true,
            badge: false,
        }
    }

    /// Presentation with nothing shown; what a host passes to the OS when it
    /// wants the delivery fully silent.
    pub fn silent() -> Self {
        Self {
            alert: false,
            sound: false,
            badge: false,
        }
    }
}

impl Default for ForegroundPresentation {
    fn default() -> Self {
        Self {
            alert: false,
            sound: true,
            badge: false,
        }
    }
}
