use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;

use crate::credentials::{self, CredentialSource, Prompter};
use crate::email::OutboundMessage;
use crate::mailer::{self, Relay};

/// Failures the user is expected to fix: bad credentials file or a login
/// the relay refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Error validating credentials")]
    Validation,

    #[error("Invalid log in details")]
    InvalidLogin,
}

impl CredentialError {
    pub fn kind(&self) -> &'static str {
        match self {
            CredentialError::Validation => "validation",
            CredentialError::InvalidLogin => "authentication",
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Credential(#[from] CredentialError),

    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed credentials file: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Prompt error: {0}")]
    Prompt(#[source] std::io::Error),

    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Message error: {0}")]
    Message(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

impl AppError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Stable tag naming the failure category.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Credential(e) => e.kind(),
            AppError::Io { .. } => "io",
            AppError::Format(_) => "format",
            AppError::Prompt(_) => "prompt",
            AppError::Address(_) => "address",
            AppError::Message(_) => "message",
            AppError::Smtp(_) => "smtp",
        }
    }

    /// Whether this failure belongs to the credential taxonomy (exit code 1,
    /// message on stdout) rather than an unexpected fault.
    pub fn is_domain(&self) -> bool {
        matches!(self, AppError::Credential(_))
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;

/// What the user asked for on the command line.
#[derive(Debug, Clone, Default)]
pub struct SendRequest {
    pub to_address: String,
    pub credentials_file: Option<String>,
    pub subject: String,
    pub body: String,
    pub file_path: Option<String>,
}

/// Attachment path to use, if one was given and it names an existing file.
pub fn attachment_path(file_path: Option<&str>) -> Option<PathBuf> {
    let raw = file_path.filter(|p| !p.is_empty())?;
    let path = PathBuf::from(shellexpand::tilde(raw).into_owned());
    if path.is_file() {
        Some(path)
    } else {
        debug!("Attachment path {} is not a file; sending without attachment", path.display());
        None
    }
}

/// Load credentials, build the message and hand it to the relay.
pub fn run<P: Prompter, R: Relay>(request: &SendRequest, prompter: &mut P, relay: &R) -> AppResult<()> {
    let source = CredentialSource::resolve(request.credentials_file.as_deref());
    let record = credentials::load(&source, prompter)?;

    let mut message = OutboundMessage::build(
        &record.from_address,
        &request.to_address,
        &request.subject,
        &request.body,
    );

    if let Some(path) = attachment_path(request.file_path.as_deref()) {
        message = message.attach(&path)?;
    }

    mailer::send(&record, &message, relay)?;

    info!("Email sent to {}", request.to_address);
    Ok(())
}
