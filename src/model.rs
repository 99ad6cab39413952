use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Minutes since midnight — the only time-of-day type.
pub type Minutes = i64;

/// Parse `"HH:MM"` into minutes since midnight.
pub fn parse_hhmm(s: &str) -> Option<Minutes> {
    let (h, m) = s.split_once(':')?;
    let h: Minutes = h.parse().ok()?;
    let m: Minutes = m.parse().ok()?;
    if h > 23 || m > 59 || h < 0 || m < 0 {
        return None;
    }
    Some(h * 60 + m)
}

/// Format minutes since midnight as `"HH:MM"`.
pub fn format_hhmm(t: Minutes) -> String {
    format!("{:02}:{:02}", t / 60, t % 60)
}

/// Half-open interval `[start, end)` within a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Minutes,
    pub end: Minutes,
}

impl TimeRange {
    pub fn new(start: Minutes, end: Minutes) -> Self {
        debug_assert!(start < end, "TimeRange start must be before end");
        Self { start, end }
    }

    pub fn duration_min(&self) -> Minutes {
        self.end - self.start
    }

    /// The one overlap predicate: two half-open intervals overlap iff each
    /// starts before the other ends. Ranges that merely touch do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Minutes) -> bool {
        self.start <= t && t < self.end
    }
}

/// A barber's daily opening window. `start >= end` is storable and simply
/// yields no slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: Minutes,
    pub end: Minutes,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: crate::limits::DEFAULT_OPEN,
            end: crate::limits::DEFAULT_CLOSE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Only pending and confirmed appointments block a slot.
    pub fn occupies_slot(self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    /// pending → confirmed | cancelled; confirmed → completed | cancelled.
    /// No transition leaves a terminal state.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Completed) | (Confirmed, Cancelled)
        )
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A booked visit. The range is frozen at booking time from the service's
/// duration; client contact rides along because the user store lives outside
/// this crate and the notification sender needs an address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Ulid,
    pub client_id: Ulid,
    pub client_name: String,
    pub client_email: String,
    pub barber_id: Ulid,
    pub service_id: Ulid,
    pub date: NaiveDate,
    pub range: TimeRange,
    pub status: AppointmentStatus,
    pub rating: Option<u8>,
    pub review: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: Ulid,
    pub name: String,
    pub description: String,
    pub duration_min: Minutes,
    pub price: f64,
    pub available: bool,
}

/// Barber profile. `rating` and `ratings_count` are derived values,
/// recomputed in full from the barber's rated appointments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Barber {
    pub id: Ulid,
    pub user_id: Ulid,
    pub specialty: String,
    pub description: String,
    pub working_hours: WorkingHours,
    pub available: bool,
    pub rating: f64,
    pub ratings_count: u32,
}

impl Barber {
    pub fn new(id: Ulid, user_id: Ulid) -> Self {
        Self {
            id,
            user_id,
            specialty: "Haircuts".into(),
            description: "New barber".into(),
            working_hours: WorkingHours::default(),
            available: true,
            rating: 0.0,
            ratings_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Barber,
    Admin,
}

/// Caller identity, supplied per request by the embedding transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Ulid,
    pub role: Role,
}

impl Actor {
    pub fn client(user_id: Ulid) -> Self {
        Self { user_id, role: Role::Client }
    }

    pub fn barber(user_id: Ulid) -> Self {
        Self { user_id, role: Role::Barber }
    }

    pub fn admin(user_id: Ulid) -> Self {
        Self { user_id, role: Role::Admin }
    }
}

// ── Request types ────────────────────────────────────────────────

/// Client booking request. The client is the acting user; name and e-mail
/// come from the caller's identity context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub barber_id: Ulid,
    pub service_id: Ulid,
    pub date: NaiveDate,
    pub start: Minutes,
    pub client_name: String,
    pub client_email: String,
    pub notes: Option<String>,
}

/// Partial appointment update. A patch that only carries `status` (and/or
/// `notes`) skips the conflict check; any scheduling field re-runs it
/// against the target barber and day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentPatch {
    pub barber_id: Option<Ulid>,
    pub service_id: Option<Ulid>,
    pub date: Option<NaiveDate>,
    pub start: Option<Minutes>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

impl AppointmentPatch {
    pub fn reschedules(&self) -> bool {
        self.barber_id.is_some() || self.service_id.is_some() || self.date.is_some() || self.start.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BarberPatch {
    pub specialty: Option<String>,
    pub description: Option<String>,
    pub working_hours: Option<WorkingHours>,
    pub available: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration_min: Option<Minutes>,
    pub price: Option<f64>,
    pub available: Option<bool>,
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarberStats {
    pub today_appointments: usize,
    pub completed_appointments: usize,
    pub active_clients: usize,
    pub repeat_clients: usize,
    pub satisfaction_rate: String,
    pub total_earnings: f64,
    pub rating: f64,
    pub ratings_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopBarber {
    pub barber_id: Ulid,
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminStats {
    pub total_confirmed: usize,
    pub total_completed: usize,
    pub total_revenue: f64,
    pub today_appointments: usize,
    pub top_barber: Option<TopBarber>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientStats {
    pub upcoming_appointments: usize,
    pub completed_appointments: usize,
    pub barbers_visited: usize,
    pub average_rating: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hhmm_roundtrip() {
        assert_eq!(parse_hhmm("09:00"), Some(540));
        assert_eq!(parse_hhmm("17:30"), Some(1050));
        assert_eq!(parse_hhmm("24:00"), None);
        assert_eq!(parse_hhmm("09:60"), None);
        assert_eq!(parse_hhmm("0900"), None);
        assert_eq!(format_hhmm(540), "09:00");
        assert_eq!(format_hhmm(1050), "17:30");
    }

    #[test]
    fn range_basics() {
        let r = TimeRange::new(540, 570);
        assert_eq!(r.duration_min(), 30);
        assert!(r.contains_instant(540));
        assert!(r.contains_instant(569));
        assert!(!r.contains_instant(570)); // half-open
    }

    #[test]
    fn overlap_half_open() {
        let a = TimeRange::new(540, 570); // [9:00, 9:30)
        let b = TimeRange::new(570, 600); // [9:30, 10:00)
        assert!(!a.overlaps(&b)); // back-to-back is legal
        assert!(!b.overlaps(&a));

        let c = TimeRange::new(540, 571); // [9:00, 9:31)
        assert!(c.overlaps(&b));
        assert!(b.overlaps(&c)); // symmetric
    }

    #[test]
    fn overlap_nested_and_spanning() {
        let outer = TimeRange::new(540, 720);
        let inner = TimeRange::new(600, 630);
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn status_transitions() {
        use AppointmentStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Confirmed.can_transition_to(Pending));
    }

    #[test]
    fn status_slot_occupancy() {
        use AppointmentStatus::*;
        assert!(Pending.occupies_slot());
        assert!(Confirmed.occupies_slot());
        assert!(!Completed.occupies_slot());
        assert!(!Cancelled.occupies_slot());
        assert!(Completed.is_terminal());
        assert!(Cancelled.is_terminal());
    }

    #[test]
    fn default_working_hours() {
        let wh = WorkingHours::default();
        assert_eq!(wh.start, parse_hhmm("09:00").unwrap());
        assert_eq!(wh.end, parse_hhmm("18:00").unwrap());
    }
}
