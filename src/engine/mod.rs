mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;

pub use availability::slot_starts;
pub use error::BookingError;

use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::*;
use crate::notify::{Email, LogMailer, Mailer};

pub type SharedBook = Arc<RwLock<BarberBook>>;

/// Per-barber appointment book: the profile plus every appointment ever
/// booked with that barber, sorted by `(date, range.start)`.
///
/// `profile` goes to `None` when the barber is demoted; the appointment
/// history stays behind so completed visits and their ratings survive.
pub struct BarberBook {
    pub profile: Option<Barber>,
    pub appointments: Vec<Appointment>,
}

impl BarberBook {
    fn new(profile: Barber) -> Self {
        Self {
            profile: Some(profile),
            appointments: Vec::new(),
        }
    }

    /// Insert maintaining sort order by `(date, range.start)`.
    pub fn insert(&mut self, appt: Appointment) {
        let key = (appt.date, appt.range.start);
        let pos = self
            .appointments
            .partition_point(|a| (a.date, a.range.start) < key);
        self.appointments.insert(pos, appt);
    }

    pub fn get(&self, id: Ulid) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == id)
    }

    pub fn get_mut(&mut self, id: Ulid) -> Option<&mut Appointment> {
        self.appointments.iter_mut().find(|a| a.id == id)
    }

    pub fn remove(&mut self, id: Ulid) -> Option<Appointment> {
        let pos = self.appointments.iter().position(|a| a.id == id)?;
        Some(self.appointments.remove(pos))
    }

    /// All appointments on `date`, via binary search over the sorted vec.
    pub fn day(&self, date: NaiveDate) -> &[Appointment] {
        let lo = self.appointments.partition_point(|a| a.date < date);
        let hi = self.appointments.partition_point(|a| a.date <= date);
        &self.appointments[lo..hi]
    }

    /// Appointments occupying a slot on `date` (pending or confirmed),
    /// excluding `exclude` when re-validating an update against itself.
    pub fn occupied_on(
        &self,
        date: NaiveDate,
        exclude: Option<Ulid>,
    ) -> impl Iterator<Item = &Appointment> {
        self.day(date)
            .iter()
            .filter(move |a| a.status.occupies_slot() && exclude != Some(a.id))
    }

    fn barber_user_id(&self) -> Option<Ulid> {
        self.profile.as_ref().map(|b| b.user_id)
    }
}

pub struct Engine {
    /// Barber id → appointment book.
    books: DashMap<Ulid, SharedBook>,
    services: DashMap<Ulid, Service>,
    /// Reverse lookups: user id → barber id, appointment id → barber id.
    user_to_barber: DashMap<Ulid, Ulid>,
    appt_to_barber: DashMap<Ulid, Ulid>,
    mailer: Arc<dyn Mailer>,
}

impl Engine {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self {
            books: DashMap::new(),
            services: DashMap::new(),
            user_to_barber: DashMap::new(),
            appt_to_barber: DashMap::new(),
            mailer,
        }
    }

    /// Engine whose notifications only hit the log.
    pub fn with_log_mailer() -> Self {
        Self::new(Arc::new(LogMailer))
    }

    pub(super) fn book_for(&self, barber_id: &Ulid) -> Option<SharedBook> {
        self.books.get(barber_id).map(|e| e.value().clone())
    }

    pub fn barber_id_for_user(&self, user_id: &Ulid) -> Option<Ulid> {
        self.user_to_barber.get(user_id).map(|e| *e.value())
    }

    pub fn barber_id_for_appointment(&self, appt_id: &Ulid) -> Option<Ulid> {
        self.appt_to_barber.get(appt_id).map(|e| *e.value())
    }

    /// Lookup appointment → barber, get the book, acquire the write lock.
    pub(super) async fn resolve_appointment_write(
        &self,
        appt_id: &Ulid,
    ) -> Result<(Ulid, tokio::sync::OwnedRwLockWriteGuard<BarberBook>), BookingError> {
        let barber_id = self
            .barber_id_for_appointment(appt_id)
            .ok_or(BookingError::NotFound(*appt_id))?;
        let book = self
            .book_for(&barber_id)
            .ok_or(BookingError::NotFound(barber_id))?;
        let guard = book.write_owned().await;
        Ok((barber_id, guard))
    }

    pub(super) fn service(&self, id: &Ulid) -> Result<Service, BookingError> {
        self.services
            .get(id)
            .map(|e| e.value().clone())
            .ok_or(BookingError::NotFound(*id))
    }

    /// Snapshot the book Arcs so no DashMap shard lock is held across awaits.
    pub(super) fn all_books(&self) -> Vec<SharedBook> {
        self.books.iter().map(|e| e.value().clone()).collect()
    }

    /// Best-effort delivery after the state change committed. Failures are
    /// logged and counted, never propagated.
    pub(super) async fn send_mail(&self, email: Email) {
        if let Err(e) = self.mailer.send(email).await {
            metrics::counter!(crate::observability::EMAIL_FAILURES_TOTAL).increment(1);
            tracing::warn!("notification dropped: {e}");
        }
    }
}
