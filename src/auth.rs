//! Authorization predicates. The session mechanism lives in the embedding
//! transport layer; the core only decides whether a given actor may perform
//! a given mutation or read.

use ulid::Ulid;

use crate::model::{Actor, Appointment, Role};

pub fn is_admin(actor: &Actor) -> bool {
    actor.role == Role::Admin
}

/// Owner client, the assigned barber's user, or an admin. `barber_user_id`
/// is `None` once the barber profile has been deleted.
pub fn can_touch_appointment(actor: &Actor, appt: &Appointment, barber_user_id: Option<Ulid>) -> bool {
    actor.user_id == appt.client_id
        || barber_user_id.is_some_and(|uid| uid == actor.user_id)
        || is_admin(actor)
}

/// Role management and service catalog changes are admin-only.
pub fn can_manage_catalog(actor: &Actor) -> bool {
    is_admin(actor)
}

/// A barber may edit their own profile; admins may edit any.
pub fn can_edit_barber(actor: &Actor, barber_user_id: Ulid) -> bool {
    actor.user_id == barber_user_id || is_admin(actor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AppointmentStatus, TimeRange};
    use chrono::NaiveDate;

    fn appt(client_id: Ulid, barber_id: Ulid) -> Appointment {
        Appointment {
            id: Ulid::new(),
            client_id,
            client_name: "Ana".into(),
            client_email: "ana@example.com".into(),
            barber_id,
            service_id: Ulid::new(),
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            range: TimeRange::new(540, 570),
            status: AppointmentStatus::Pending,
            rating: None,
            review: None,
            notes: None,
        }
    }

    #[test]
    fn owner_barber_and_admin_may_touch() {
        let client = Ulid::new();
        let barber_user = Ulid::new();
        let a = appt(client, Ulid::new());

        assert!(can_touch_appointment(&Actor::client(client), &a, Some(barber_user)));
        assert!(can_touch_appointment(&Actor::barber(barber_user), &a, Some(barber_user)));
        assert!(can_touch_appointment(&Actor::admin(Ulid::new()), &a, Some(barber_user)));
        assert!(!can_touch_appointment(&Actor::client(Ulid::new()), &a, Some(barber_user)));
    }

    #[test]
    fn deleted_barber_profile_blocks_barber_access() {
        let a = appt(Ulid::new(), Ulid::new());
        let stranger = Actor::barber(Ulid::new());
        assert!(!can_touch_appointment(&stranger, &a, None));
    }

    #[test]
    fn catalog_is_admin_only() {
        assert!(can_manage_catalog(&Actor::admin(Ulid::new())));
        assert!(!can_manage_catalog(&Actor::barber(Ulid::new())));
        assert!(!can_manage_catalog(&Actor::client(Ulid::new())));
    }

    #[test]
    fn barber_edits_own_profile_only() {
        let uid = Ulid::new();
        assert!(can_edit_barber(&Actor::barber(uid), uid));
        assert!(!can_edit_barber(&Actor::barber(Ulid::new()), uid));
        assert!(can_edit_barber(&Actor::admin(Ulid::new()), uid));
    }
}
