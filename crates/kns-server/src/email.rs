//! Email rendering and delivery.
//!
//! Real delivery belongs to an external service; the server renders HTML
//! messages and hands them to a [`Mailer`]. The default mailer is a file
//! outbox under `.kns/outbox/` so a deployment can relay messages with
//! whatever transport it has.

use kns_core::group::Group;
use kns_core::profile::Profile;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

pub trait Mailer: Send + Sync {
    fn send(&self, message: &EmailMessage) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// FileOutbox
// ---------------------------------------------------------------------------

/// Writes each message as an HTML file under the outbox directory.
pub struct FileOutbox {
    dir: PathBuf,
    seq: AtomicU64,
}

impl FileOutbox {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            seq: AtomicU64::new(0),
        }
    }
}

impl Mailer for FileOutbox {
    fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%f");
        let path = self.dir.join(format!("{stamp}-{seq}.html"));
        let content = format!(
            "<!-- To: {} -->\n<!-- Subject: {} -->\n{}",
            message.to, message.subject, message.html
        );
        kns_core::io::atomic_write(&path, content.as_bytes())?;
        tracing::info!(to = %message.to, subject = %message.subject, "email written to outbox");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingMailer
// ---------------------------------------------------------------------------

/// Test double that captures messages instead of delivering them.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
}

impl Mailer for RecordingMailer {
    fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        self.sent.lock().expect("mailer lock").push(message.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Escape text for interpolation into HTML. Names and group titles are
/// user-entered and must never reach a page or email body raw.
pub(crate) fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// The approval-request email sent to the consumer-group leader, carrying
/// the signed approve/reject confirmation links.
pub fn approval_request_email(
    member: &Profile,
    requester_name: &str,
    consumer: &Profile,
    group: &Group,
    approve_url: &str,
    reject_url: &str,
) -> EmailMessage {
    let subject = format!(
        "Approval request to make {} a leader",
        member.full_name()
    );
    let html = format!(
        concat!(
            "<html><body style=\"font-family:sans-serif\">",
            "<p>Hello {consumer},</p>",
            "<p>{requester} has requested that <strong>{member}</strong> ",
            "of the group <strong>{group}</strong> be promoted to a leader role.</p>",
            "<p><a href=\"{approve}\">Approve this request</a> &middot; ",
            "<a href=\"{reject}\">Reject this request</a></p>",
            "<p>This request expires if not handled in time. ",
            "If you were not expecting it you can ignore this email.</p>",
            "</body></html>",
        ),
        consumer = escape_html(&consumer.full_name()),
        requester = escape_html(requester_name),
        member = escape_html(&member.full_name()),
        group = escape_html(&group.name),
        approve = approve_url,
        reject = reject_url,
    );
    EmailMessage {
        to: consumer.email.clone(),
        subject,
        html,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
