//! Scheduler configuration errors
//!
//! Every variant describes a defect in the task table that was handed to the
//! scheduler at startup. None of them can occur once registration is done.

use core::fmt;

/// Errors from task registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// The registry has no free slot left
    RegistryFull,
    /// A task without a readiness predicate was given a zero period
    ZeroPeriodWithoutCheck {
        /// Offending task
        name: &'static str,
    },
    /// The realtime task was registered without a period
    RealtimeWithoutPeriod {
        /// Offending task
        name: &'static str,
    },
    /// A second task claimed the realtime priority
    DuplicateRealtime {
        /// Task that tried to register as realtime
        name: &'static str,
    },
    /// A task with the same name and sub-name is already registered
    DuplicateName {
        /// Duplicated task name
        name: &'static str,
    },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::RegistryFull => write!(f, "task registry full"),
            SchedulerError::ZeroPeriodWithoutCheck { name } => {
                write!(f, "task '{}' has a zero period and no check function", name)
            }
            SchedulerError::RealtimeWithoutPeriod { name } => {
                write!(f, "realtime task '{}' needs a nonzero period", name)
            }
            SchedulerError::DuplicateRealtime { name } => {
                write!(f, "task '{}' cannot be realtime: realtime task already registered", name)
            }
            SchedulerError::DuplicateName { name } => {
                write!(f, "task '{}' registered twice", name)
            }
        }
    }
}
