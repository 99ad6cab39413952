use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::BookingError;

/// First existing appointment whose range overlaps `candidate`. Callers
/// feed only occupying appointments (pending/confirmed, on the target day).
pub(crate) fn first_conflict<'a, I>(occupied: I, candidate: &TimeRange) -> Option<Ulid>
where
    I: IntoIterator<Item = &'a Appointment>,
{
    occupied
        .into_iter()
        .find(|a| a.range.overlaps(candidate))
        .map(|a| a.id)
}

/// Build the appointment range from a start time and a service duration,
/// validating both against the day.
pub(crate) fn appointment_range(start: Minutes, duration: Minutes) -> Result<TimeRange, BookingError> {
    if duration <= 0 {
        return Err(BookingError::Validation("service duration must be positive"));
    }
    if start < 0 || start >= MINUTES_PER_DAY {
        return Err(BookingError::Validation("start time outside the day"));
    }
    if start + duration > MINUTES_PER_DAY {
        return Err(BookingError::Validation("appointment must end within the day"));
    }
    Ok(TimeRange::new(start, start + duration))
}

pub(crate) fn validate_rating(rating: u8) -> Result<(), BookingError> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(BookingError::Validation("rating must be between 1 and 5"));
    }
    Ok(())
}

pub(crate) fn validate_len(s: &str, max: usize, msg: &'static str) -> Result<(), BookingError> {
    if s.len() > max {
        return Err(BookingError::Validation(msg));
    }
    Ok(())
}

/// Working hours may be degenerate (they just produce no slots) but must
/// stay within the day.
pub(crate) fn validate_hours(hours: &WorkingHours) -> Result<(), BookingError> {
    if hours.start < 0 || hours.end > MINUTES_PER_DAY {
        return Err(BookingError::Validation("working hours outside the day"));
    }
    Ok(())
}
