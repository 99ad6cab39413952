use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use ulid::Ulid;

use crate::auth;
use crate::limits::*;
use crate::model::*;

use super::availability::slot_starts;
use super::conflict::first_conflict;
use super::{BookingError, Engine};

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl Engine {
    /// Free slot start times for a barber on a day, at the default
    /// granularity. Ascending, finite, a pure function of the stored state.
    pub async fn available_slots(&self, barber_id: Ulid, date: NaiveDate) -> Result<Vec<Minutes>, BookingError> {
        let book = self.book_for(&barber_id).ok_or(BookingError::NotFound(barber_id))?;
        let guard = book.read().await;
        let profile = guard.profile.as_ref().ok_or(BookingError::NotFound(barber_id))?;
        let occupied: Vec<TimeRange> = guard.occupied_on(date, None).map(|a| a.range).collect();
        Ok(slot_starts(&profile.working_hours, DEFAULT_SLOT_MINUTES, &occupied))
    }

    /// Pre-flight conflict check. `book` and `update_appointment` repeat it
    /// under the write lock before inserting, so a `true` here is advisory,
    /// not a reservation.
    pub async fn can_book(
        &self,
        barber_id: Ulid,
        date: NaiveDate,
        candidate: &TimeRange,
        exclude: Option<Ulid>,
    ) -> Result<bool, BookingError> {
        if candidate.start >= candidate.end {
            return Err(BookingError::Validation("range must end after it starts"));
        }
        let book = self.book_for(&barber_id).ok_or(BookingError::NotFound(barber_id))?;
        let guard = book.read().await;
        if guard.profile.is_none() {
            return Err(BookingError::NotFound(barber_id));
        }
        Ok(first_conflict(guard.occupied_on(date, exclude), candidate).is_none())
    }

    pub async fn get_appointment(&self, actor: &Actor, id: Ulid) -> Result<Appointment, BookingError> {
        let barber_id = self.barber_id_for_appointment(&id).ok_or(BookingError::NotFound(id))?;
        let book = self.book_for(&barber_id).ok_or(BookingError::NotFound(barber_id))?;
        let guard = book.read().await;
        let a = guard.get(id).ok_or(BookingError::NotFound(id))?;
        if !auth::can_touch_appointment(actor, a, guard.barber_user_id()) {
            return Err(BookingError::Unauthorized(actor.user_id));
        }
        Ok(a.clone())
    }

    /// A client's own history, newest first.
    pub async fn appointments_for_client(&self, client_id: Ulid) -> Vec<Appointment> {
        let mut out = Vec::new();
        for book in self.all_books() {
            let guard = book.read().await;
            out.extend(guard.appointments.iter().filter(|a| a.client_id == client_id).cloned());
        }
        out.sort_by(|a, b| (b.date, b.range.start).cmp(&(a.date, a.range.start)));
        out
    }

    /// A barber's full book, newest first. The barber themselves or an admin.
    pub async fn appointments_for_barber(&self, actor: &Actor, barber_id: Ulid) -> Result<Vec<Appointment>, BookingError> {
        let book = self.book_for(&barber_id).ok_or(BookingError::NotFound(barber_id))?;
        let guard = book.read().await;
        let allowed = auth::is_admin(actor) || guard.barber_user_id() == Some(actor.user_id);
        if !allowed {
            return Err(BookingError::Unauthorized(actor.user_id));
        }
        let mut out: Vec<Appointment> = guard.appointments.to_vec();
        out.sort_by(|a, b| (b.date, b.range.start).cmp(&(a.date, a.range.start)));
        Ok(out)
    }

    /// One day's appointments, scoped by role: admins see everything,
    /// barbers their own book, clients their own bookings. Sorted by start.
    pub async fn appointments_on(&self, actor: &Actor, date: NaiveDate) -> Vec<Appointment> {
        let own_barber = self.barber_id_for_user(&actor.user_id);
        let mut out = Vec::new();
        for book in self.all_books() {
            let guard = book.read().await;
            let day = guard.day(date);
            match actor.role {
                Role::Admin => out.extend(day.iter().cloned()),
                Role::Barber => {
                    if own_barber.is_some() && guard.profile.as_ref().map(|b| b.id) == own_barber {
                        out.extend(day.iter().cloned());
                    }
                }
                Role::Client => {
                    out.extend(day.iter().filter(|a| a.client_id == actor.user_id).cloned());
                }
            }
        }
        out.sort_by_key(|a| a.range.start);
        out
    }

    pub async fn get_barber(&self, barber_id: Ulid) -> Result<Barber, BookingError> {
        let book = self.book_for(&barber_id).ok_or(BookingError::NotFound(barber_id))?;
        let guard = book.read().await;
        guard.profile.clone().ok_or(BookingError::NotFound(barber_id))
    }

    /// Barbers currently taking bookings.
    pub async fn list_barbers(&self) -> Vec<Barber> {
        let mut out = Vec::new();
        for book in self.all_books() {
            let guard = book.read().await;
            if let Some(b) = guard.profile.as_ref()
                && b.available
            {
                out.push(b.clone());
            }
        }
        out
    }

    pub fn get_service(&self, id: Ulid) -> Result<Service, BookingError> {
        self.service(&id)
    }

    pub fn list_services(&self) -> Vec<Service> {
        self.services
            .iter()
            .map(|e| e.value().clone())
            .filter(|s| s.available)
            .collect()
    }

    // ── Statistics (recomputed on demand, never stored) ──────────

    pub async fn barber_stats(&self, barber_id: Ulid, today: NaiveDate) -> Result<BarberStats, BookingError> {
        let book = self.book_for(&barber_id).ok_or(BookingError::NotFound(barber_id))?;
        let guard = book.read().await;
        let profile = guard.profile.as_ref().ok_or(BookingError::NotFound(barber_id))?;

        let today_appointments = guard.day(today).len();
        let completed: Vec<&Appointment> = guard
            .appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Completed)
            .collect();

        let active_clients: HashSet<Ulid> = guard
            .appointments
            .iter()
            .filter(|a| matches!(a.status, AppointmentStatus::Completed | AppointmentStatus::Confirmed))
            .map(|a| a.client_id)
            .collect();

        let mut completed_per_client: HashMap<Ulid, usize> = HashMap::new();
        for a in &completed {
            *completed_per_client.entry(a.client_id).or_default() += 1;
        }
        let repeat_clients = completed_per_client.values().filter(|&&n| n > 1).count();

        let total_earnings = round2(
            completed
                .iter()
                .map(|a| self.services.get(&a.service_id).map(|s| s.price).unwrap_or(0.0))
                .sum(),
        );

        // Satisfaction expresses the mean rating as a share of the maximum,
        // defaulting to 100% when nothing has been rated yet.
        let rated: Vec<u8> = guard.appointments.iter().filter_map(|a| a.rating).collect();
        let satisfaction_rate = if rated.is_empty() {
            "100%".to_string()
        } else {
            let mean = rated.iter().map(|&r| r as f64).sum::<f64>() / rated.len() as f64;
            format!("{}%", ((mean / 5.0) * 100.0).round() as i64)
        };

        Ok(BarberStats {
            today_appointments,
            completed_appointments: completed.len(),
            active_clients: active_clients.len(),
            repeat_clients,
            satisfaction_rate,
            total_earnings,
            rating: profile.rating,
            ratings_count: profile.ratings_count,
        })
    }

    pub async fn admin_stats(&self, actor: &Actor, today: NaiveDate) -> Result<AdminStats, BookingError> {
        if !auth::is_admin(actor) {
            return Err(BookingError::Unauthorized(actor.user_id));
        }
        let mut total_confirmed = 0;
        let mut total_completed = 0;
        let mut total_revenue = 0.0;
        let mut today_appointments = 0;
        let mut top_barber: Option<TopBarber> = None;

        for book in self.all_books() {
            let guard = book.read().await;
            today_appointments += guard.day(today).len();
            for a in &guard.appointments {
                match a.status {
                    AppointmentStatus::Confirmed => total_confirmed += 1,
                    AppointmentStatus::Completed => {
                        total_completed += 1;
                        total_revenue += self.services.get(&a.service_id).map(|s| s.price).unwrap_or(0.0);
                    }
                    _ => {}
                }
            }
            if let Some(b) = guard.profile.as_ref()
                && b.rating > 0.0
                && top_barber.as_ref().is_none_or(|t| b.rating > t.rating)
            {
                top_barber = Some(TopBarber { barber_id: b.id, rating: b.rating });
            }
        }

        Ok(AdminStats {
            total_confirmed,
            total_completed,
            total_revenue: round2(total_revenue),
            today_appointments,
            top_barber,
        })
    }

    pub async fn client_stats(&self, client_id: Ulid, today: NaiveDate) -> ClientStats {
        let mut upcoming = 0;
        let mut completed = 0;
        let mut barbers: HashSet<Ulid> = HashSet::new();
        let mut ratings: Vec<u8> = Vec::new();

        for book in self.all_books() {
            let guard = book.read().await;
            for a in guard.appointments.iter().filter(|a| a.client_id == client_id) {
                barbers.insert(a.barber_id);
                if a.status == AppointmentStatus::Completed {
                    completed += 1;
                } else if !a.status.is_terminal() && a.date >= today {
                    upcoming += 1;
                }
                if let Some(r) = a.rating {
                    ratings.push(r);
                }
            }
        }

        let average_rating = if ratings.is_empty() {
            0.0
        } else {
            let mean = ratings.iter().map(|&r| r as f64).sum::<f64>() / ratings.len() as f64;
            (mean * 10.0).round() / 10.0
        };

        ClientStats {
            upcoming_appointments: upcoming,
            completed_appointments: completed,
            barbers_visited: barbers.len(),
            average_rating,
        }
    }
}
