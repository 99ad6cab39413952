use async_trait::async_trait;

use crate::model::{format_hhmm, Minutes};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Debug)]
pub struct SendError(pub String);

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "send failed: {}", self.0)
    }
}

impl std::error::Error for SendError {}

/// Outbound notification sender. Implementations live in the embedding
/// service (SMTP, queue, …); the engine never lets a send failure roll back
/// a committed state change.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), SendError>;
}

/// Default mailer: logs the message instead of delivering it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), SendError> {
        tracing::info!(to = %email.to, subject = %email.subject, "email (log only)");
        Ok(())
    }
}

// ── Templates ────────────────────────────────────────────────────

pub fn booking_confirmation(
    to: &str,
    client_name: &str,
    date: chrono::NaiveDate,
    start: Minutes,
    service_name: &str,
) -> Email {
    let time = format_hhmm(start);
    Email {
        to: to.to_string(),
        subject: "Appointment confirmation".into(),
        text: format!(
            "Hi {client_name}, your appointment for {service_name} is booked for {date} at {time}."
        ),
        html: format!(
            "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\
             <h2>Appointment confirmation</h2>\
             <p>Hi <strong>{client_name}</strong>,</p>\
             <p>Your appointment is booked:</p>\
             <div style=\"background: #f9f9f9; padding: 15px; border-radius: 5px;\">\
             <p><strong>Date:</strong> {date}</p>\
             <p><strong>Time:</strong> {time}</p>\
             <p><strong>Service:</strong> {service_name}</p>\
             </div>\
             <p>See you at the shop!</p>\
             </div>"
        ),
    }
}

pub fn booking_cancelled(to: &str, client_name: &str, date: chrono::NaiveDate, start: Minutes) -> Email {
    let time = format_hhmm(start);
    Email {
        to: to.to_string(),
        subject: "Appointment cancelled".into(),
        text: format!("Hi {client_name}, your appointment on {date} at {time} has been cancelled."),
        html: format!(
            "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\
             <h2>Appointment cancelled</h2>\
             <p>Hi <strong>{client_name}</strong>,</p>\
             <p>Your appointment on <strong>{date}</strong> at <strong>{time}</strong> has been cancelled.</p>\
             <p>You can book a new slot any time.</p>\
             </div>"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn log_mailer_never_fails() {
        let mailer = LogMailer;
        let email = booking_confirmation(
            "ana@example.com",
            "Ana",
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            540,
            "Classic cut",
        );
        assert_ok!(mailer.send(email).await);
    }

    #[test]
    fn templates_carry_formatted_time() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let email = booking_confirmation("a@b.c", "Ana", date, 570, "Fade");
        assert_eq!(email.to, "a@b.c");
        assert!(email.text.contains("09:30"));
        assert!(email.html.contains("Fade"));

        let email = booking_cancelled("a@b.c", "Ana", date, 1050);
        assert!(email.text.contains("17:30"));
        assert!(email.html.contains("2025-06-02"));
    }
}
