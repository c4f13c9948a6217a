// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentAction, AppointmentError, AppointmentStatus};

/// The appointment state machine: `pending -> scheduled -> cancelled`, with
/// re-scheduling allowed and `cancelled` terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn initial_status(&self) -> AppointmentStatus {
        AppointmentStatus::Pending
    }

    /// Validate that `action` may be applied and return the status it leads to.
    pub fn validate_transition(
        &self,
        current_status: AppointmentStatus,
        action: AppointmentAction,
    ) -> Result<AppointmentStatus, AppointmentError> {
        debug!("Validating {} on a {} appointment", action, current_status);

        if !self.allowed_actions(current_status).contains(&action) {
            warn!("Invalid transition attempted: {} on {}", action, current_status);
            return Err(AppointmentError::InvalidTransition {
                from: current_status,
                action,
            });
        }

        Ok(Self::target_status(action))
    }

    /// Actions that can be applied to an existing appointment in `current_status`.
    pub fn allowed_actions(&self, current_status: AppointmentStatus) -> Vec<AppointmentAction> {
        match current_status {
            AppointmentStatus::Pending | AppointmentStatus::Scheduled => {
                vec![AppointmentAction::Schedule, AppointmentAction::Cancel]
            }
            // Terminal state - no transitions allowed
            AppointmentStatus::Cancelled => vec![],
        }
    }

    /// Get all valid next statuses for a given current status
    pub fn valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        self.allowed_actions(current_status)
            .into_iter()
            .map(Self::target_status)
            .collect()
    }

    fn target_status(action: AppointmentAction) -> AppointmentStatus {
        match action {
            AppointmentAction::Create => AppointmentStatus::Pending,
            AppointmentAction::Schedule => AppointmentStatus::Scheduled,
            AppointmentAction::Cancel => AppointmentStatus::Cancelled,
        }
    }
}
