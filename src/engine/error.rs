use ulid::Ulid;

use crate::model::AppointmentStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    NotFound(Ulid),
    /// Slot taken; carries the id of the blocking appointment.
    Conflict(Ulid),
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    Unauthorized(Ulid),
    Validation(&'static str),
}

impl std::fmt::Display for BookingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingError::NotFound(id) => write!(f, "not found: {id}"),
            BookingError::Conflict(id) => write!(f, "slot conflicts with appointment: {id}"),
            BookingError::InvalidTransition { from, to } => {
                write!(f, "invalid transition: {from} -> {to}")
            }
            BookingError::Unauthorized(user_id) => write!(f, "not authorized: {user_id}"),
            BookingError::Validation(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for BookingError {}
