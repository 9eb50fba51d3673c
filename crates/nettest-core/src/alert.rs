//! Per-address alert state machine
//!
//! Given what was persisted for an address last run and what the probe
//! reported this run, [`transition`] produces the status to persist and
//! the message (if any) the operator must receive now.
//!
//! ```text
//!               unreachable                unreachable, wait elapsed
//!   ┌────┐ ─────────────────▶ ┌───────────┐ ──────────────────────┐
//!   │ OK │                    │ NEW_ALERT │                       ▼
//!   └────┘ ◀───────────────── └───────────┘            ┌──────────────────┐
//!     ▲          reachable          │                  │ CONTINUING_ALERT │
//!     │                             └─────────────────▶│ (notify/suppress)│
//!     │                                                └──────────────────┘
//!     │  next run   ┌───────────┐        reachable              │
//!     └──────────── │ RECOVERED │ ◀─────────────────────────────┘
//!                   └───────────┘
//! ```
//!
//! The function is pure: the same inputs always give the same output.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::model::{AddressStatus, Message, MessageKind, ProbeOutcome};

/// Classification of one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertState {
    /// Reachable and was not in alert
    Ok,
    /// Unreachable after being reachable (or never seen)
    NewAlert,
    /// Still unreachable; `notified` tells whether the repeat wait elapsed
    ContinuingAlert {
        /// A repeat notification fires this run
        notified: bool,
    },
    /// Reachable again after an alert
    Recovered,
}

impl AlertState {
    /// Whether the address is in alert after this evaluation
    pub fn is_alert(&self) -> bool {
        matches!(self, Self::NewAlert | Self::ContinuingAlert { .. })
    }
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("ok"),
            Self::NewAlert => f.write_str("new_alert"),
            Self::ContinuingAlert { notified: true } => f.write_str("continuing_alert(notify)"),
            Self::ContinuingAlert { notified: false } => {
                f.write_str("continuing_alert(suppress)")
            }
            Self::Recovered => f.write_str("recovered"),
        }
    }
}

/// Result of evaluating one address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// How the evaluation was classified
    pub state: AlertState,
    /// Status to persist for the address
    pub status: AddressStatus,
    /// Message that must be dispatched now
    pub message: Option<Message>,
}

/// Text of the message sent when an alert starts
pub fn new_alert_text(detail: &str) -> String {
    format!("New alert: {detail}")
}

/// Text of the message sent when an alert is repeated
pub fn repeat_alert_text(detail: &str) -> String {
    format!("Repeat alert: {detail}")
}

/// Text of the message sent on recovery
pub const RECOVERED_TEXT: &str = "Connection reestablished.";

/// Evaluate one address.
///
/// # Parameters
///
/// - `address`: The address being evaluated (used for the message)
/// - `previous`: Its status from the last run, if any
/// - `outcome`: This run's probe result
/// - `now`: Evaluation time, stamped into the new status
/// - `repeat_wait`: Minimum time between notifications for one ongoing alert
pub fn transition(
    address: &str,
    previous: Option<&AddressStatus>,
    outcome: &ProbeOutcome,
    now: DateTime<Utc>,
    repeat_wait: chrono::Duration,
) -> Transition {
    let was_in_alert = previous.is_some_and(|p| p.in_alert);

    if outcome.reachable {
        let status = AddressStatus {
            in_alert: false,
            alert_start: None,
            alert_description: None,
            last_notified: None,
            last_checked: now,
        };

        if was_in_alert {
            return Transition {
                state: AlertState::Recovered,
                status,
                message: Some(Message::new(address, MessageKind::Recovered, RECOVERED_TEXT)),
            };
        }
        return Transition {
            state: AlertState::Ok,
            status,
            message: None,
        };
    }

    let detail = outcome
        .detail
        .clone()
        .unwrap_or_else(|| "unreachable host".to_string());

    let Some(previous) = previous.filter(|p| p.in_alert) else {
        return Transition {
            state: AlertState::NewAlert,
            status: AddressStatus {
                in_alert: true,
                alert_start: Some(now),
                alert_description: Some(detail.clone()),
                last_notified: Some(now),
                last_checked: now,
            },
            message: Some(Message::new(
                address,
                MessageKind::NewAlert,
                new_alert_text(&detail),
            )),
        };
    };

    // A missing last_notified means we cannot prove the operator was told
    let due = previous
        .last_notified
        .is_none_or(|last| now.signed_duration_since(last) > repeat_wait);
    // The alert began no later than the first time anyone was told about it
    let alert_start = [previous.alert_start, previous.last_notified]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(now);

    if due {
        Transition {
            state: AlertState::ContinuingAlert { notified: true },
            status: AddressStatus {
                in_alert: true,
                alert_start: Some(alert_start.min(now)),
                alert_description: Some(detail.clone()),
                last_notified: Some(now),
                last_checked: now,
            },
            message: Some(Message::new(
                address,
                MessageKind::RepeatAlert,
                repeat_alert_text(&detail),
            )),
        }
    } else {
        Transition {
            state: AlertState::ContinuingAlert { notified: false },
            status: AddressStatus {
                in_alert: true,
                alert_start: Some(alert_start),
                alert_description: Some(detail),
                last_notified: previous.last_notified,
                last_checked: now,
            },
            message: None,
        }
    }
}
