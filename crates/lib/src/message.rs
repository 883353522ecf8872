//! Inbound mail notification as posted by the Apps Script forwarder.

use serde::Deserialize;

/// Webhook JSON body. Every field is optional; `null` and missing are the same.
///
/// ```json
/// {
///   "from": "Alice <alice@example.com>",
///   "to": "notes@yourdomain",
///   "subject": "docs/hello.md",
///   "body_plain": "Hello",
///   "body_html": "<p>Hello</p>",
///   "message_id": "<abcd@mail.gmail.com>",
///   "branch": "main"
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundPayload {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body_plain: Option<String>,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

/// Normalized message, built once per request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body_plain: String,
    pub body_html: String,
    pub message_id: String,
    /// Target branch; `None` means the configured default.
    pub branch: Option<String>,
}

fn trimmed(value: Option<String>) -> String {
    value.as_deref().unwrap_or("").trim().to_string()
}

impl From<InboundPayload> for InboundMessage {
    fn from(p: InboundPayload) -> Self {
        Self {
            sender: trimmed(p.from),
            recipient: trimmed(p.to),
            subject: trimmed(p.subject),
            body_plain: p.body_plain.as_deref().unwrap_or("").trim_end().to_string(),
            body_html: trimmed(p.body_html),
            message_id: trimmed(p.message_id),
            branch: Some(trimmed(p.branch)).filter(|b| !b.is_empty()),
        }
    }
}

impl InboundMessage {
    /// Parse and normalize a webhook body.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let payload: InboundPayload = serde_json::from_slice(body)?;
        Ok(payload.into())
    }

    /// The branch to commit to.
    pub fn branch_or<'a>(&'a self, default_branch: &'a str) -> &'a str {
        self.branch.as_deref().unwrap_or(default_branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_payload_is_normalized() {
        let m = InboundMessage::from_json(
            br#"{
                "from": "  Alice <alice@example.com> ",
                "to": "notes@example.org",
                "subject": " docs/hello.md ",
                "body_plain": "  Hello\n\n",
                "body_html": " <p>Hello</p> ",
                "message_id": "<abcd@mail.gmail.com>",
                "branch": " inbox "
            }"#,
        )
        .unwrap();
        assert_eq!(m.sender, "Alice <alice@example.com>");
        assert_eq!(m.subject, "docs/hello.md");
        assert_eq!(m.body_plain, "  Hello");
        assert_eq!(m.body_html, "<p>Hello</p>");
        assert_eq!(m.branch.as_deref(), Some("inbox"));
        assert_eq!(m.branch_or("main"), "inbox");
    }

    #[test]
    fn missing_and_null_fields_are_empty() {
        let m = InboundMessage::from_json(br#"{"from": null, "branch": "  "}"#).unwrap();
        assert_eq!(m, InboundMessage::default());
        assert_eq!(m.branch_or("main"), "main");
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(InboundMessage::from_json(b"{not json").is_err());
        assert!(InboundMessage::from_json(b"[1, 2]").is_err());
        assert!(InboundMessage::from_json(br#"{"subject": 5}"#).is_err());
    }
}
