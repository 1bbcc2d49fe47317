//! E-mail notices for a request
//!
//! Delivery itself belongs to an external collaborator behind
//! [`EmailSender`]; this module parses recipient input, fills in the
//! message templates and summarizes the outcome for the operator.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::NoticeConfig;
use crate::error::StoreResult;
use crate::model::Request;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid e-mail regex"));

static SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[;,]+").expect("valid separator regex"));

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{(title|deadline|instructions|link)\}\}").expect("valid placeholder regex")
});

/// Body used when a request has no custom e-mail body
pub const DEFAULT_EMAIL_BODY: &str = "Hi team,\n\
\n\
A new data request is ready for you. Please submit your input using the link below.\n\
Request: {{title}}\n\
Deadline: {{deadline}}\n\
Instructions: {{instructions}}\n\
Link: {{link}}\n\
\n\
Thanks,\n\
Data Office";

/// Outcome reported by the e-mail collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: bool,
    /// Why nothing was delivered, when known
    pub reason: Option<String>,
}

impl Delivery {
    pub fn delivered() -> Self {
        Self {
            delivered: true,
            reason: None,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            delivered: false,
            reason: Some(reason.into()),
        }
    }
}

/// Sends one message to a list of recipients
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, recipients: &[String], subject: &str, body: &str)
        -> StoreResult<Delivery>;
}

/// Whether `email` looks like `local@domain.tld`
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

/// Split free-form input on commas and semicolons into trimmed entries
pub fn split_recipients(input: &str) -> Vec<String> {
    SEPARATOR_RE
        .split(input)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Add entries from `input` to `list`, skipping ones already present
///
/// With `emails_only`, entries that are not valid e-mail addresses are
/// dropped. Returns how many entries were added.
pub fn add_recipients(list: &mut Vec<String>, input: &str, emails_only: bool) -> usize {
    let before = list.len();
    for entry in split_recipients(input) {
        if emails_only && !is_valid_email(&entry) {
            tracing::debug!(entry = %entry, "dropping invalid e-mail address");
            continue;
        }
        if !list.contains(&entry) {
            list.push(entry);
        }
    }
    list.len() - before
}

/// Link recipients open to fill in the grid
pub fn request_link(base_url: &str, id: &str) -> String {
    format!("{}/request/{}", base_url.trim_end_matches('/'), id)
}

/// Substitute `{{title}}`, `{{deadline}}`, `{{instructions}}` and
/// `{{link}}` placeholders
///
/// Substituted values are never scanned again, so a title containing
/// `{{link}}` stays as written.
pub fn hydrate_template(template: &str, request: &Request, link: &str) -> String {
    let title = non_blank(&request.title).unwrap_or("Data request");
    let deadline = request
        .deadline
        .as_deref()
        .and_then(non_blank)
        .unwrap_or("Not specified");
    let instructions = non_blank(&request.instructions).unwrap_or("See request for details");

    PLACEHOLDER_RE
        .replace_all(template, |caps: &regex::Captures<'_>| match &caps[1] {
            "title" => title,
            "deadline" => deadline,
            "instructions" => instructions,
            _ => link,
        })
        .into_owned()
}

/// A rendered notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl Notice {
    /// The invitation sent when a request is created
    pub fn for_request(request: &Request, config: &NoticeConfig) -> Self {
        let link = request_link(&config.app_base_url, &request.id);
        let subject = match request.email_subject.as_deref().and_then(non_blank) {
            Some(template) => hydrate_template(template, request, &link),
            None => format!("Data request: {}", request.title),
        };
        let body_template = request
            .email_body
            .as_deref()
            .and_then(non_blank)
            .unwrap_or(DEFAULT_EMAIL_BODY);

        Self {
            recipients: request.emails.clone(),
            subject,
            body: hydrate_template(body_template, request, &link),
        }
    }

    /// A reminder that the request is still open
    pub fn reminder(request: &Request, next_reminder: &str) -> Self {
        Self {
            recipients: request.emails.clone(),
            subject: format!("Reminder: {}", request.title),
            body: format!(
                "Friendly reminder: next reminder is scheduled on {}.",
                next_reminder
            ),
        }
    }

    /// Send through `sender`; a notice without recipients is not sent
    pub async fn send(&self, sender: &dyn EmailSender) -> StoreResult<Delivery> {
        if self.recipients.is_empty() {
            return Ok(Delivery::skipped("no-recipients"));
        }
        let delivery = sender
            .send_email(&self.recipients, &self.subject, &self.body)
            .await?;
        tracing::info!(
            recipients = self.recipients.len(),
            delivered = delivery.delivered,
            "request notice sent"
        );
        Ok(delivery)
    }
}

/// Message shown to the operator after creating a request and sending
/// its notice
pub fn delivery_summary(recipient_count: usize, outcome: &StoreResult<Delivery>) -> String {
    match outcome {
        _ if recipient_count == 0 => "Request created. No recipients provided.".to_string(),
        Ok(delivery) if delivery.delivered => {
            format!("Request sent to {} recipient(s).", recipient_count)
        }
        Ok(_) => "Request created, but email delivery uncertain.".to_string(),
        Err(_) => "Request created, but email sending failed.".to_string(),
    }
}

fn non_blank(s: &str) -> Option<&str> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
