use crate::config::AppConfig;
use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Notice
///
/// Every outbound notification the platform can produce, as structured data.
/// Rendering to subject/body happens in one place so the templates stay
/// consistent across delivery paths, and mock implementations can assert on
/// the variant instead of string-matching rendered prose.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Account verification link (volunteer or organizer signup).
    VerifyEmail { token: Uuid },
    /// Password reset link.
    ResetPassword { token: Uuid },
    /// Organizer moderation outcomes.
    OrganizerApproved,
    OrganizerRejected { reason: String },
    OrganizerSuspended,
    OrganizerDeactivated,
    /// Account soft-deletion, volunteer or organizer.
    AccountDeleted { reason: String },
    /// Sent to the moderation inbox when a rejected organizer resubmits.
    ResubmissionReceived {
        organizer_name: String,
        organizer_email: String,
    },
    /// Admin removed someone else's content.
    ContentRemoved { title: String, reason: String },
    /// The event a volunteer registered for was deleted. Carries the
    /// admin-supplied reason when one was given.
    EventCancelled {
        event_title: String,
        reason: Option<String>,
    },
    /// Post-completion thank-you to each participant.
    EventThankYou { event_title: String },
    /// Heads-up to the organizer when a volunteer registers.
    NewRegistration {
        event_title: String,
        volunteer_name: String,
    },
    /// Heads-up to the organizer when a volunteer frees their slot.
    RegistrationCancelled {
        event_title: String,
        volunteer_name: String,
    },
    /// Public contact form, relayed to the moderation inbox.
    ContactMessage {
        sender_email: String,
        subject: String,
        body: String,
    },
    /// Free-form admin mail (direct or broadcast).
    Direct { subject: String, body: String },
}

impl Notice {
    /// Rendered subject line.
    pub fn subject(&self) -> String {
        match self {
            Notice::VerifyEmail { .. } => "Verify your email address".to_string(),
            Notice::ResetPassword { .. } => "Reset your password".to_string(),
            Notice::OrganizerApproved => "Your organizer account has been approved".to_string(),
            Notice::OrganizerRejected { .. } => {
                "Your organizer application was rejected".to_string()
            }
            Notice::OrganizerSuspended => "Your organizer account has been suspended".to_string(),
            Notice::OrganizerDeactivated => {
                "Your organizer account has been deactivated".to_string()
            }
            Notice::AccountDeleted { .. } => "Your account has been removed".to_string(),
            Notice::ResubmissionReceived { organizer_name, .. } => {
                format!("Organizer resubmission: {organizer_name}")
            }
            Notice::ContentRemoved { title, .. } => format!("Your content was removed: {title}"),
            Notice::EventCancelled { event_title, .. } => {
                format!("Event cancelled: {event_title}")
            }
            Notice::EventThankYou { event_title } => {
                format!("Thank you for joining {event_title}")
            }
            Notice::NewRegistration { event_title, .. } => {
                format!("New registration for {event_title}")
            }
            Notice::RegistrationCancelled { event_title, .. } => {
                format!("Registration cancelled for {event_title}")
            }
            Notice::ContactMessage { subject, .. } => format!("[Contact] {subject}"),
            Notice::Direct { subject, .. } => subject.clone(),
        }
    }

    /// Rendered plain-text body.
    pub fn body(&self) -> String {
        match self {
            Notice::VerifyEmail { token } => format!(
                "Welcome! Please verify your email address using this token: {token}\n\
                 The link expires in one hour."
            ),
            Notice::ResetPassword { token } => format!(
                "A password reset was requested for your account. Token: {token}\n\
                 The link expires in ten minutes. If you did not request this, ignore this message."
            ),
            Notice::OrganizerApproved => {
                "Congratulations, your organizer account has been approved. \
                 You can now publish events."
                    .to_string()
            }
            Notice::OrganizerRejected { reason } => format!(
                "Unfortunately your organizer application was rejected.\nReason: {reason}\n\
                 You may update your profile to resubmit for review."
            ),
            Notice::OrganizerSuspended => {
                "Your organizer account has been suspended by an administrator.".to_string()
            }
            Notice::OrganizerDeactivated => {
                "Your organizer account has been deactivated.".to_string()
            }
            Notice::AccountDeleted { reason } => {
                format!("Your account has been removed.\nReason: {reason}")
            }
            Notice::ResubmissionReceived {
                organizer_name,
                organizer_email,
            } => format!(
                "Organizer {organizer_name} ({organizer_email}) updated their profile and is \
                 pending review again."
            ),
            Notice::ContentRemoved { title, reason } => {
                format!("An administrator removed \"{title}\".\nReason: {reason}")
            }
            Notice::EventCancelled { event_title, reason } => {
                let mut text = format!(
                    "We are sorry: the event \"{event_title}\" you registered for has been cancelled."
                );
                if let Some(reason) = reason {
                    text.push_str(&format!("\nReason: {reason}"));
                }
                text
            }
            Notice::EventThankYou { event_title } => format!(
                "Thank you for participating in \"{event_title}\". We hope to see you again!"
            ),
            Notice::NewRegistration {
                event_title,
                volunteer_name,
            } => format!("{volunteer_name} just registered for your event \"{event_title}\"."),
            Notice::RegistrationCancelled {
                event_title,
                volunteer_name,
            } => format!(
                "{volunteer_name} cancelled their registration for your event \"{event_title}\"."
            ),
            Notice::ContactMessage {
                sender_email, body, ..
            } => format!("From: {sender_email}\n\n{body}"),
            Notice::Direct { body, .. } => body.clone(),
        }
    }
}

/// Notifier Trait
///
/// Outbound mail seam. Whether a failed send is fatal is the *caller's*
/// decision: lifecycle side-channel notices log-and-continue, while the
/// verification email and the contact-form relay propagate the failure.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, notice: Notice) -> Result<(), String>;
}

/// NotifierState
///
/// The shared handle stored in the app state.
pub type NotifierState = Arc<dyn Notifier>;

/// HttpNotifier
///
/// Posts rendered messages to the configured mail gateway as JSON.
pub struct HttpNotifier {
    client: reqwest::Client,
    gateway_url: String,
    api_key: String,
    sender: String,
}

impl HttpNotifier {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            gateway_url: config.mail_gateway_url.clone(),
            api_key: config.mail_api_key.clone(),
            sender: config.mail_sender.clone(),
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, recipient: &str, notice: Notice) -> Result<(), String> {
        let payload = json!({
            "from": self.sender,
            "to": recipient,
            "subject": notice.subject(),
            "body": notice.body(),
        });

        let response = self
            .client
            .post(format!("{}/send", self.gateway_url))
            .header("x-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| format!("mail gateway unreachable: {e}"))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("mail gateway returned {}", response.status()))
        }
    }
}

/// RecordingNotifier
///
/// Test double: records every (recipient, notice) pair and optionally fails
/// every send, so both delivery fan-out and failure handling are assertable.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, Notice)>>,
    pub fail_sends: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_sends: true,
        }
    }

    /// Snapshot of everything sent so far.
    pub fn recorded(&self) -> Vec<(String, Notice)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: &str, notice: Notice) -> Result<(), String> {
        if self.fail_sends {
            return Err("simulated delivery failure".to_string());
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), notice));
        Ok(())
    }
}
