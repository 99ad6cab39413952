//! Booking and scheduling core for a barbershop. Clients book fixed-duration
//! slots with barbers; barbers manage their hours; admins run the catalog
//! and the barber roster. The crate is transport-agnostic: embed it behind
//! whatever wire layer the surrounding system uses, pass an [`model::Actor`]
//! per call, and plug a [`notify::Mailer`] for outbound notifications.

pub mod auth;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;

pub use engine::{BookingError, Engine};
