//! Outbound email: what we send, how it is delivered, and the queue that
//! keeps delivery off the request path.

pub mod mailer;
pub mod queue;

use chrono::{DateTime, Utc};

use crate::database::models::ApplicationStatus;

pub use mailer::{mailer_from_config, LogMailer, MailError, Mailer, SmtpMailer};
pub use queue::{NotificationError, NotificationQueue};

/// A rendered, ready-to-send plain text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub enum Notification {
    Welcome {
        to: String,
        name: String,
    },
    PasswordReset {
        to: String,
        name: String,
        reset_url: String,
        expires_in_minutes: i64,
    },
    ApplicationSubmitted {
        to: String,
        name: String,
        program_title: String,
        project_title: String,
    },
    ApplicationReviewed {
        to: String,
        name: String,
        program_title: String,
        status: ApplicationStatus,
        review_notes: String,
    },
    ChallengeRegistered {
        to: String,
        name: String,
        challenge_title: String,
        end_date: DateTime<Utc>,
    },
    EventRegistered {
        to: String,
        name: String,
        event_title: String,
        start_time: DateTime<Utc>,
        meeting_url: Option<String>,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Welcome { .. } => "welcome",
            Notification::PasswordReset { .. } => "password_reset",
            Notification::ApplicationSubmitted { .. } => "application_submitted",
            Notification::ApplicationReviewed { .. } => "application_reviewed",
            Notification::ChallengeRegistered { .. } => "challenge_registered",
            Notification::EventRegistered { .. } => "event_registered",
        }
    }

    pub fn render(&self) -> Email {
        match self {
            Notification::Welcome { to, name } => Email {
                to: to.clone(),
                subject: "Welcome to SheBuilds!".to_string(),
                body: format!(
                    "Hi {name},\n\nWelcome to SheBuilds! Create your first project, share your progress \
                     and join a challenge to get started.\n\nHappy building,\nThe SheBuilds team"
                ),
            },
            Notification::PasswordReset { to, name, reset_url, expires_in_minutes } => Email {
                to: to.clone(),
                subject: "Reset your SheBuilds password".to_string(),
                body: format!(
                    "Hi {name},\n\nWe received a request to reset your password. Use the link below \
                     within {expires_in_minutes} minutes:\n\n{reset_url}\n\nIf you did not ask for this, \
                     you can ignore this email."
                ),
            },
            Notification::ApplicationSubmitted { to, name, program_title, project_title } => Email {
                to: to.clone(),
                subject: format!("Application received: {program_title}"),
                body: format!(
                    "Hi {name},\n\nYour application for \"{project_title}\" to {program_title} has been \
                     submitted. We will let you know once it has been reviewed.\n\nThe SheBuilds team"
                ),
            },
            Notification::ApplicationReviewed { to, name, program_title, status, review_notes } => {
                let outcome = match status {
                    ApplicationStatus::Approved => "Congratulations! Your application has been approved.",
                    ApplicationStatus::Rejected => "Unfortunately your application was not selected this time.",
                    _ => "Your application status has been updated.",
                };
                let notes = if review_notes.trim().is_empty() {
                    String::new()
                } else {
                    format!("\n\nReviewer notes:\n{review_notes}")
                };
                Email {
                    to: to.clone(),
                    subject: format!("Application update: {program_title}"),
                    body: format!("Hi {name},\n\n{outcome}{notes}\n\nThe SheBuilds team"),
                }
            }
            Notification::ChallengeRegistered { to, name, challenge_title, end_date } => Email {
                to: to.clone(),
                subject: format!("You're registered: {challenge_title}"),
                body: format!(
                    "Hi {name},\n\nYou are registered for the \"{challenge_title}\" challenge. \
                     Submissions close {}.\n\nGood luck!",
                    end_date.format("%B %-d, %Y")
                ),
            },
            Notification::EventRegistered { to, name, event_title, start_time, meeting_url } => {
                let join = meeting_url
                    .as_deref()
                    .map(|url| format!("\n\nJoin here: {url}"))
                    .unwrap_or_default();
                Email {
                    to: to.clone(),
                    subject: format!("Registration confirmed: {event_title}"),
                    body: format!(
                        "Hi {name},\n\nYou're registered for \"{event_title}\" on {}.{join}\n\nSee you there!",
                        start_time.format("%B %-d, %Y at %H:%M UTC")
                    ),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn review_email_mentions_outcome_and_notes() {
        let email = Notification::ApplicationReviewed {
            to: "ada@example.com".into(),
            name: "Ada".into(),
            program_title: "Builders Fund".into(),
            status: ApplicationStatus::Approved,
            review_notes: "Strong roadmap".into(),
        }
        .render();
        assert_eq!(email.to, "ada@example.com");
        assert_eq!(email.subject, "Application update: Builders Fund");
        assert!(email.body.contains("approved"));
        assert!(email.body.contains("Strong roadmap"));
    }

    #[test]
    fn empty_review_notes_are_omitted() {
        let email = Notification::ApplicationReviewed {
            to: "a@b.c".into(),
            name: "A".into(),
            program_title: "P".into(),
            status: ApplicationStatus::Rejected,
            review_notes: String::new(),
        }
        .render();
        assert!(!email.body.contains("Reviewer notes"));
    }

    #[test]
    fn event_email_formats_start_time() {
        let email = Notification::EventRegistered {
            to: "a@b.c".into(),
            name: "A".into(),
            event_title: "Rust Meetup".into(),
            start_time: Utc.with_ymd_and_hms(2025, 3, 8, 18, 30, 0).unwrap(),
            meeting_url: Some("https://meet.example.com/x".into()),
        }
        .render();
        assert!(email.body.contains("March 8, 2025 at 18:30 UTC"));
        assert!(email.body.contains("https://meet.example.com/x"));
    }

    #[test]
    fn reset_email_carries_link() {
        let email = Notification::PasswordReset {
            to: "a@b.c".into(),
            name: "A".into(),
            reset_url: "https://shebuilds.dev/reset-password/abc".into(),
            expires_in_minutes: 60,
        }
        .render();
        assert!(email.body.contains("https://shebuilds.dev/reset-password/abc"));
        assert!(email.body.contains("60 minutes"));
    }
}
