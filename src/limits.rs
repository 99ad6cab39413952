use crate::model::Minutes;

/// Upper bound (exclusive) for a time-of-day start; a range end may equal it.
pub const MINUTES_PER_DAY: Minutes = 1440;

/// Slot granularity used by availability queries.
pub const DEFAULT_SLOT_MINUTES: Minutes = 30;

/// Default working hours: 09:00–18:00.
pub const DEFAULT_OPEN: Minutes = 9 * 60;
pub const DEFAULT_CLOSE: Minutes = 18 * 60;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

pub const MAX_NAME_LEN: usize = 256;
pub const MAX_TEXT_LEN: usize = 1024;
pub const MAX_REVIEW_LEN: usize = 2048;
