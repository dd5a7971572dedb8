use lettre::address::Envelope;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::transport::smtp::Error as SmtpError;
use lettre::{SmtpTransport, Transport};
use log::{debug, warn};

use crate::app::{AppError, AppResult, CredentialError};
use crate::config::{RelayConfig, SmtpSecurity};
use crate::credentials::CredentialRecord;
use crate::email::OutboundMessage;

/// Somewhere a rendered message can be submitted.
pub trait Relay {
    fn submit(&self, record: &CredentialRecord, envelope: &Envelope, raw: &[u8]) -> AppResult<()>;
}

/// One blocking SMTP session per submission: EHLO, STARTTLS, AUTH, MAIL,
/// RCPT, DATA, QUIT.
#[derive(Debug, Clone)]
pub struct SmtpRelay {
    config: RelayConfig,
}

impl SmtpRelay {
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    fn transport(&self, record: &CredentialRecord) -> AppResult<SmtpTransport> {
        let creds = Credentials::new(record.from_address.clone(), record.secret.clone());

        let tls = match self.config.smtp_security {
            SmtpSecurity::StartTls => {
                let tls_params = TlsParameters::new(self.config.smtp_server.clone())
                    .map_err(|e| AppError::Smtp(e.to_string()))?;
                Tls::Required(tls_params)
            }
        };

        Ok(SmtpTransport::relay(&self.config.smtp_server)
            .map_err(|e| AppError::Smtp(e.to_string()))?
            .credentials(creds)
            .port(self.config.smtp_port)
            .tls(tls)
            .build())
    }
}

impl Relay for SmtpRelay {
    fn submit(&self, record: &CredentialRecord, envelope: &Envelope, raw: &[u8]) -> AppResult<()> {
        debug!("Connecting to {}", self.config);
        let mailer = self.transport(record)?;
        deliver(&mailer, envelope, raw)
    }
}

fn deliver(mailer: &SmtpTransport, envelope: &Envelope, raw: &[u8]) -> AppResult<()> {
    mailer.send_raw(envelope, raw).map_err(classify_error)?;
    Ok(())
}

/// Reply codes a relay uses to refuse a login.
pub fn is_auth_rejection(code: &str) -> bool {
    matches!(code, "530" | "534" | "535")
}

fn classify_error(err: SmtpError) -> AppError {
    match err.status() {
        Some(code) if is_auth_rejection(&code.to_string()) => {
            warn!("Relay rejected login: {}", err);
            CredentialError::InvalidLogin.into()
        }
        _ => AppError::Smtp(err.to_string()),
    }
}

/// Render `message` and submit it through `relay` as `record.from_address`.
pub fn send<R: Relay>(record: &CredentialRecord, message: &OutboundMessage, relay: &R) -> AppResult<()> {
    let envelope = message.envelope(&record.from_address)?;
    let raw = message.formatted()?;

    debug!("Submitting {} bytes to {}", raw.len(), message.to_address);
    relay.submit(record, &envelope, &raw)
}
