use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use tokio::sync::RwLock;
use tracing::info;
use ulid::Ulid;

use crate::auth;
use crate::limits::*;
use crate::model::*;
use crate::notify::{booking_cancelled, booking_confirmation};
use crate::observability;

use super::conflict::{appointment_range, first_conflict, validate_hours, validate_len, validate_rating};
use super::{BarberBook, BookingError, Engine};

fn transition(a: &mut Appointment, next: AppointmentStatus) -> Result<(), BookingError> {
    if !a.status.can_transition_to(next) {
        return Err(BookingError::InvalidTransition { from: a.status, to: next });
    }
    a.status = next;
    Ok(())
}

impl Engine {
    // ── Catalog ──────────────────────────────────────────────────

    pub fn add_service(
        &self,
        actor: &Actor,
        name: String,
        description: String,
        duration_min: Minutes,
        price: f64,
    ) -> Result<Service, BookingError> {
        if !auth::can_manage_catalog(actor) {
            return Err(BookingError::Unauthorized(actor.user_id));
        }
        if name.is_empty() {
            return Err(BookingError::Validation("service name must not be empty"));
        }
        validate_len(&name, MAX_NAME_LEN, "service name too long")?;
        validate_len(&description, MAX_TEXT_LEN, "service description too long")?;
        if duration_min <= 0 || duration_min > MINUTES_PER_DAY {
            return Err(BookingError::Validation("service duration must fit within a day"));
        }
        if !price.is_finite() || price < 0.0 {
            return Err(BookingError::Validation("price must not be negative"));
        }

        let svc = Service {
            id: Ulid::new(),
            name,
            description,
            duration_min,
            price,
            available: true,
        };
        self.services.insert(svc.id, svc.clone());
        info!(service = %svc.id, "service added");
        Ok(svc)
    }

    /// Edits never resize existing appointments: their ranges were frozen
    /// from the duration at booking time.
    pub fn update_service(&self, actor: &Actor, id: Ulid, patch: ServicePatch) -> Result<Service, BookingError> {
        if !auth::can_manage_catalog(actor) {
            return Err(BookingError::Unauthorized(actor.user_id));
        }
        if let Some(ref name) = patch.name {
            if name.is_empty() {
                return Err(BookingError::Validation("service name must not be empty"));
            }
            validate_len(name, MAX_NAME_LEN, "service name too long")?;
        }
        if let Some(ref d) = patch.description {
            validate_len(d, MAX_TEXT_LEN, "service description too long")?;
        }
        if let Some(d) = patch.duration_min
            && (d <= 0 || d > MINUTES_PER_DAY)
        {
            return Err(BookingError::Validation("service duration must fit within a day"));
        }
        if let Some(p) = patch.price
            && (!p.is_finite() || p < 0.0)
        {
            return Err(BookingError::Validation("price must not be negative"));
        }

        let mut entry = self.services.get_mut(&id).ok_or(BookingError::NotFound(id))?;
        let svc = entry.value_mut();
        if let Some(name) = patch.name {
            svc.name = name;
        }
        if let Some(description) = patch.description {
            svc.description = description;
        }
        if let Some(d) = patch.duration_min {
            svc.duration_min = d;
        }
        if let Some(p) = patch.price {
            svc.price = p;
        }
        if let Some(a) = patch.available {
            svc.available = a;
        }
        Ok(svc.clone())
    }

    // ── Barber lifecycle ─────────────────────────────────────────

    /// Create a barber profile (and empty book) for a user. Admin only;
    /// the role change itself lives with the external user store.
    pub fn promote_to_barber(&self, actor: &Actor, user_id: Ulid) -> Result<Barber, BookingError> {
        if !auth::can_manage_catalog(actor) {
            return Err(BookingError::Unauthorized(actor.user_id));
        }
        match self.user_to_barber.entry(user_id) {
            Entry::Occupied(_) => Err(BookingError::Validation("user already has a barber profile")),
            Entry::Vacant(e) => {
                let barber = Barber::new(Ulid::new(), user_id);
                self.books
                    .insert(barber.id, Arc::new(RwLock::new(BarberBook::new(barber.clone()))));
                e.insert(barber.id);
                info!(barber = %barber.id, user = %user_id, "barber promoted");
                Ok(barber)
            }
        }
    }

    /// Cancel every pending/confirmed appointment in bulk and delete the
    /// profile. Completed and cancelled appointments (and their ratings)
    /// stay behind. Returns how many appointments were cancelled.
    pub async fn demote_barber(&self, actor: &Actor, barber_id: Ulid) -> Result<usize, BookingError> {
        if !auth::can_manage_catalog(actor) {
            return Err(BookingError::Unauthorized(actor.user_id));
        }
        let book = self.book_for(&barber_id).ok_or(BookingError::NotFound(barber_id))?;
        let mut guard = book.write_owned().await;
        let profile = guard.profile.take().ok_or(BookingError::NotFound(barber_id))?;

        let mut cancelled = 0usize;
        for a in guard.appointments.iter_mut() {
            if a.status.occupies_slot() {
                a.status = AppointmentStatus::Cancelled;
                cancelled += 1;
            }
        }
        self.user_to_barber.remove(&profile.user_id);
        metrics::counter!(observability::CASCADE_CANCELLATIONS_TOTAL).increment(cancelled as u64);
        info!(barber = %barber_id, cancelled, "barber demoted");
        Ok(cancelled)
    }

    pub async fn update_barber(&self, actor: &Actor, barber_id: Ulid, patch: BarberPatch) -> Result<Barber, BookingError> {
        if let Some(ref s) = patch.specialty {
            validate_len(s, MAX_NAME_LEN, "specialty too long")?;
        }
        if let Some(ref d) = patch.description {
            validate_len(d, MAX_TEXT_LEN, "description too long")?;
        }
        if let Some(ref h) = patch.working_hours {
            validate_hours(h)?;
        }

        let book = self.book_for(&barber_id).ok_or(BookingError::NotFound(barber_id))?;
        let mut guard = book.write().await;
        let profile = guard.profile.as_mut().ok_or(BookingError::NotFound(barber_id))?;
        if !auth::can_edit_barber(actor, profile.user_id) {
            return Err(BookingError::Unauthorized(actor.user_id));
        }
        if let Some(s) = patch.specialty {
            profile.specialty = s;
        }
        if let Some(d) = patch.description {
            profile.description = d;
        }
        if let Some(h) = patch.working_hours {
            profile.working_hours = h;
        }
        if let Some(a) = patch.available {
            profile.available = a;
        }
        Ok(profile.clone())
    }

    // ── Appointment lifecycle ────────────────────────────────────

    /// Book an appointment for the acting user. The conflict check and the
    /// insert run under the barber book's write lock, so two concurrent
    /// requests for overlapping ranges cannot both succeed.
    pub async fn book(&self, actor: &Actor, req: BookingRequest) -> Result<Appointment, BookingError> {
        let svc = self.service(&req.service_id)?;
        let range = appointment_range(req.start, svc.duration_min)?;
        validate_len(&req.client_name, MAX_NAME_LEN, "client name too long")?;
        if let Some(ref n) = req.notes {
            validate_len(n, MAX_TEXT_LEN, "notes too long")?;
        }

        let book = self.book_for(&req.barber_id).ok_or(BookingError::NotFound(req.barber_id))?;
        let mut guard = book.write_owned().await;
        if guard.profile.is_none() {
            return Err(BookingError::NotFound(req.barber_id));
        }

        let started = Instant::now();
        if let Some(blocking) = first_conflict(guard.occupied_on(req.date, None), &range) {
            metrics::counter!(observability::BOOKING_CONFLICTS_TOTAL).increment(1);
            return Err(BookingError::Conflict(blocking));
        }

        let appt = Appointment {
            id: Ulid::new(),
            client_id: actor.user_id,
            client_name: req.client_name,
            client_email: req.client_email,
            barber_id: req.barber_id,
            service_id: req.service_id,
            date: req.date,
            range,
            status: AppointmentStatus::Pending,
            rating: None,
            review: None,
            notes: req.notes,
        };
        guard.insert(appt.clone());
        self.appt_to_barber.insert(appt.id, req.barber_id);
        metrics::histogram!(observability::BOOKING_WRITE_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        metrics::counter!(observability::BOOKINGS_TOTAL).increment(1);
        drop(guard);

        info!(appointment = %appt.id, barber = %appt.barber_id, date = %appt.date, "appointment booked");
        self.send_mail(booking_confirmation(
            &appt.client_email,
            &appt.client_name,
            appt.date,
            appt.range.start,
            &svc.name,
        ))
        .await;
        Ok(appt)
    }

    /// Pure status change: never touches the conflict check.
    pub async fn set_status(&self, actor: &Actor, id: Ulid, next: AppointmentStatus) -> Result<Appointment, BookingError> {
        let (_barber_id, mut guard) = self.resolve_appointment_write(&id).await?;
        let barber_user = guard.barber_user_id();
        let a = guard.get_mut(id).ok_or(BookingError::NotFound(id))?;
        if !auth::can_touch_appointment(actor, a, barber_user) {
            return Err(BookingError::Unauthorized(actor.user_id));
        }
        transition(a, next)?;
        let updated = a.clone();
        drop(guard);

        info!(appointment = %id, status = %next, "status updated");
        if next == AppointmentStatus::Cancelled {
            metrics::counter!(observability::CANCELLATIONS_TOTAL).increment(1);
            self.send_mail(booking_cancelled(
                &updated.client_email,
                &updated.client_name,
                updated.date,
                updated.range.start,
            ))
            .await;
        }
        Ok(updated)
    }

    /// Cancelling releases the slot permanently; the record stays.
    pub async fn cancel(&self, actor: &Actor, id: Ulid) -> Result<Appointment, BookingError> {
        self.set_status(actor, id, AppointmentStatus::Cancelled).await
    }

    /// Partial update. Status/notes-only patches skip the conflict check;
    /// changing barber, service, date, or start re-runs it against the new
    /// target, excluding the appointment itself.
    pub async fn update_appointment(&self, actor: &Actor, id: Ulid, patch: AppointmentPatch) -> Result<Appointment, BookingError> {
        if let Some(ref n) = patch.notes {
            validate_len(n, MAX_TEXT_LEN, "notes too long")?;
        }

        if !patch.reschedules() {
            let (_barber_id, mut guard) = self.resolve_appointment_write(&id).await?;
            let barber_user = guard.barber_user_id();
            let a = guard.get_mut(id).ok_or(BookingError::NotFound(id))?;
            if !auth::can_touch_appointment(actor, a, barber_user) {
                return Err(BookingError::Unauthorized(actor.user_id));
            }
            let mut entered_cancelled = false;
            if let Some(next) = patch.status {
                transition(a, next)?;
                entered_cancelled = next == AppointmentStatus::Cancelled;
            }
            if let Some(notes) = patch.notes {
                a.notes = Some(notes);
            }
            let updated = a.clone();
            drop(guard);
            if entered_cancelled {
                metrics::counter!(observability::CANCELLATIONS_TOTAL).increment(1);
                self.send_mail(booking_cancelled(
                    &updated.client_email,
                    &updated.client_name,
                    updated.date,
                    updated.range.start,
                ))
                .await;
            }
            return Ok(updated);
        }

        // Reschedule. When the barber changes, both books are locked in id
        // order so two movers can never deadlock.
        let cur_barber = self.barber_id_for_appointment(&id).ok_or(BookingError::NotFound(id))?;
        let target_barber = patch.barber_id.unwrap_or(cur_barber);
        let src = self.book_for(&cur_barber).ok_or(BookingError::NotFound(cur_barber))?;
        let (mut src_guard, mut dst_guard) = if target_barber == cur_barber {
            (src.write_owned().await, None)
        } else {
            let dst = self.book_for(&target_barber).ok_or(BookingError::NotFound(target_barber))?;
            if target_barber < cur_barber {
                let d = dst.write_owned().await;
                let s = src.write_owned().await;
                (s, Some(d))
            } else {
                let s = src.write_owned().await;
                let d = dst.write_owned().await;
                (s, Some(d))
            }
        };
        if let Some(ref d) = dst_guard
            && d.profile.is_none()
        {
            return Err(BookingError::NotFound(target_barber));
        }

        let cur = src_guard.get(id).cloned().ok_or(BookingError::NotFound(id))?;
        if !auth::can_touch_appointment(actor, &cur, src_guard.barber_user_id()) {
            return Err(BookingError::Unauthorized(actor.user_id));
        }
        if cur.status.is_terminal() {
            return Err(BookingError::InvalidTransition {
                from: cur.status,
                to: patch.status.unwrap_or(cur.status),
            });
        }
        if let Some(next) = patch.status
            && !cur.status.can_transition_to(next)
        {
            return Err(BookingError::InvalidTransition { from: cur.status, to: next });
        }

        let service_id = patch.service_id.unwrap_or(cur.service_id);
        let svc = self.service(&service_id)?;
        let date = patch.date.unwrap_or(cur.date);
        let start = patch.start.unwrap_or(cur.range.start);
        let range = appointment_range(start, svc.duration_min)?;

        let check_book: &BarberBook = dst_guard.as_deref().unwrap_or(&src_guard);
        if let Some(blocking) = first_conflict(check_book.occupied_on(date, Some(id)), &range) {
            metrics::counter!(observability::BOOKING_CONFLICTS_TOTAL).increment(1);
            return Err(BookingError::Conflict(blocking));
        }

        // All checks passed: pull the booking out, rewrite it, reinsert at the target.
        let mut appt = src_guard.remove(id).ok_or(BookingError::NotFound(id))?;
        appt.barber_id = target_barber;
        appt.service_id = service_id;
        appt.date = date;
        appt.range = range;
        if let Some(next) = patch.status {
            appt.status = next;
        }
        if let Some(notes) = patch.notes {
            appt.notes = Some(notes);
        }
        match dst_guard {
            Some(ref mut d) => d.insert(appt.clone()),
            None => src_guard.insert(appt.clone()),
        }
        self.appt_to_barber.insert(id, target_barber);
        drop(dst_guard);
        drop(src_guard);

        info!(appointment = %id, barber = %target_barber, date = %date, "appointment rescheduled");
        if appt.status == AppointmentStatus::Cancelled {
            metrics::counter!(observability::CANCELLATIONS_TOTAL).increment(1);
            self.send_mail(booking_cancelled(
                &appt.client_email,
                &appt.client_name,
                appt.date,
                appt.range.start,
            ))
            .await;
        }
        Ok(appt)
    }

    /// Attach (or overwrite) a rating on a completed appointment, then
    /// recompute the barber's aggregates in full from the rated set.
    /// Incremental updates would drift once a rating can change.
    pub async fn rate(&self, actor: &Actor, id: Ulid, rating: u8, review: Option<String>) -> Result<(), BookingError> {
        validate_rating(rating)?;
        if let Some(ref r) = review {
            validate_len(r, MAX_REVIEW_LEN, "review too long")?;
        }

        let (_barber_id, mut guard) = self.resolve_appointment_write(&id).await?;
        let book = &mut *guard;
        let a = book
            .appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(BookingError::NotFound(id))?;
        if a.client_id != actor.user_id {
            return Err(BookingError::Unauthorized(actor.user_id));
        }
        if a.status != AppointmentStatus::Completed {
            return Err(BookingError::InvalidTransition {
                from: a.status,
                to: AppointmentStatus::Completed,
            });
        }
        a.rating = Some(rating);
        a.review = review;

        let rated: Vec<u8> = book.appointments.iter().filter_map(|a| a.rating).collect();
        if let Some(profile) = book.profile.as_mut() {
            let mean = rated.iter().map(|&r| r as f64).sum::<f64>() / rated.len() as f64;
            profile.rating = (mean * 10.0).round() / 10.0;
            profile.ratings_count = rated.len() as u32;
        }
        metrics::counter!(observability::RATINGS_TOTAL).increment(1);
        info!(appointment = %id, rating, "appointment rated");
        Ok(())
    }
}
