use std::fs;
use std::path::Path;

use lettre::address::Envelope;
use lettre::message::header::{ContentTransferEncoding, ContentType, Header, HeaderName, HeaderValue};
use lettre::message::{Attachment, Body, Mailbox, MultiPart, SinglePart};
use lettre::{Address, Message};
use log::debug;

use crate::app::{AppError, AppResult};

pub const ATTACHMENT_CONTENT_TYPE: &str = "application/octet-stream";

/// Informational `fromaddr` header carrying the sender address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FromAddr(pub String);

impl Header for FromAddr {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("fromaddr")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(FromAddr(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub filename: String,
    pub data: Vec<u8>,
}

impl EmailAttachment {
    fn to_part(&self) -> AppResult<SinglePart> {
        let content_type =
            ContentType::parse(ATTACHMENT_CONTENT_TYPE).map_err(|e| AppError::Message(e.to_string()))?;
        // Base64 can carry any byte sequence, so this never falls through.
        let body = Body::new_with_encoding(self.data.clone(), ContentTransferEncoding::Base64)
            .unwrap_or_else(Body::new);

        Ok(Attachment::new(self.filename.clone()).body(body, content_type))
    }
}

/// A single message on its way to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub from_address: String,
    pub to_address: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<EmailAttachment>,
}

impl OutboundMessage {
    pub fn build(from: &str, to: &str, subject: &str, body: &str) -> Self {
        Self {
            from_address: from.to_string(),
            to_address: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            attachment: None,
        }
    }

    /// Read `path` and carry it as the message's attachment, named after the
    /// file's base name.
    pub fn attach(mut self, path: &Path) -> AppResult<Self> {
        let data = fs::read(path).map_err(|e| AppError::io(path, e))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());

        debug!("Attaching {} ({} bytes)", filename, data.len());

        self.attachment = Some(EmailAttachment { filename, data });
        Ok(self)
    }

    /// SMTP envelope from `sender` to the single recipient.
    pub fn envelope(&self, sender: &str) -> AppResult<Envelope> {
        let from = parse_address(sender)?;
        let to = parse_address(&self.to_address)?;
        Envelope::new(Some(from), vec![to]).map_err(|e| AppError::Address(e.to_string()))
    }

    /// Render as a `multipart/mixed` MIME message.
    pub fn to_message(&self) -> AppResult<Message> {
        let from = parse_mailbox(&self.from_address)?;
        let to = parse_mailbox(&self.to_address)?;

        let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(self.body.clone()));
        if let Some(attachment) = &self.attachment {
            parts = parts.singlepart(attachment.to_part()?);
        }

        Message::builder()
            .header(FromAddr(self.from_address.clone()))
            .from(from)
            .to(to)
            .subject(self.subject.clone())
            .multipart(parts)
            .map_err(|e| AppError::Message(e.to_string()))
    }

    /// Wire form of the message, ready for `DATA`.
    pub fn formatted(&self) -> AppResult<Vec<u8>> {
        Ok(self.to_message()?.formatted())
    }
}

fn parse_address(address: &str) -> AppResult<Address> {
    address
        .trim()
        .parse::<Address>()
        .map_err(|e| AppError::Address(format!("'{}': {}", address, e)))
}

fn parse_mailbox(address: &str) -> AppResult<Mailbox> {
    Ok(Mailbox::new(None, parse_address(address)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mail_parser::MimeHeaders;
    use std::io::Write;

    fn sample() -> OutboundMessage {
        OutboundMessage::build("me@example.com", "x@example.com", "Hi", "Hello")
    }

    #[test]
    fn test_build_sets_fields_without_attachment() {
        let message = sample();

        assert_eq!(message.from_address, "me@example.com");
        assert_eq!(message.to_address, "x@example.com");
        assert_eq!(message.subject, "Hi");
        assert_eq!(message.body, "Hello");
        assert!(message.attachment.is_none());
    }

    #[test]
    fn test_rendered_headers_and_body() {
        let raw = sample().formatted().unwrap();
        let text = String::from_utf8_lossy(&raw);

        assert!(text.contains("fromaddr: me@example.com"));
        assert!(text.contains("To: x@example.com"));
        assert!(text.contains("Subject: Hi"));
        assert!(text.contains("multipart/mixed"));

        let parsed = mail_parser::Message::parse(&raw).unwrap();
        assert_eq!(parsed.subject(), Some("Hi"));
        assert_eq!(parsed.body_text(0).unwrap().trim_end(), "Hello");
        assert_eq!(parsed.attachment_count(), 0);
    }

    #[test]
    fn test_attachment_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.bin");
        let bytes: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        std::fs::File::create(&path).unwrap().write_all(&bytes).unwrap();

        let message = sample().attach(&path).unwrap();
        let attachment = message.attachment.as_ref().unwrap();
        assert_eq!(attachment.filename, "report.bin");
        assert_eq!(attachment.data, bytes);

        let raw = message.formatted().unwrap();
        let text = String::from_utf8_lossy(&raw);
        assert!(text.contains("Content-Disposition: attachment"));
        assert!(text.contains("Content-Type: application/octet-stream"));
        assert!(text.contains("Content-Transfer-Encoding: base64"));

        let parsed = mail_parser::Message::parse(&raw).unwrap();
        assert_eq!(parsed.attachment_count(), 1);
        let part = parsed.attachment(0).unwrap();
        assert_eq!(part.attachment_name(), Some("report.bin"));
        assert_eq!(part.contents(), bytes.as_slice());
    }

    #[test]
    fn test_plain_text_attachment_still_base64() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"plain ascii notes\n").unwrap();

        let raw = sample().attach(&path).unwrap().formatted().unwrap();
        let text = String::from_utf8_lossy(&raw);

        assert!(text.contains("Content-Transfer-Encoding: base64"));
        assert!(!text.contains("plain ascii notes"));
    }

    #[test]
    fn test_attach_missing_file_is_io_error() {
        let err = sample().attach(Path::new("/no/such/file.bin")).unwrap_err();
        assert!(matches!(err, AppError::Io { .. }));
        assert!(!err.is_domain());
    }

    #[test]
    fn test_invalid_recipient_rejected_at_render() {
        let message = OutboundMessage::build("me@example.com", "not-an-address", "Hi", "Hello");

        assert!(matches!(message.to_message(), Err(AppError::Address(_))));
        assert!(matches!(message.envelope("me@example.com"), Err(AppError::Address(_))));
    }

    #[test]
    fn test_envelope_is_sender_to_recipient() {
        let envelope = sample().envelope("me@example.com").unwrap();

        assert_eq!(envelope.from().map(|a| a.to_string()), Some("me@example.com".to_string()));
        let to: Vec<String> = envelope.to().iter().map(|a| a.to_string()).collect();
        assert_eq!(to, vec!["x@example.com".to_string()]);
    }
}
