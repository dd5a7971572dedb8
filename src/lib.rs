pub mod app;
pub mod config;
pub mod credentials;
pub mod email;
pub mod mailer;
pub mod schema;

// Re-export commonly used types
pub use app::{run, AppError, AppResult, CredentialError, SendRequest};
pub use config::RelayConfig;
pub use credentials::{CredentialRecord, CredentialSource, Prompter, TerminalPrompter};
pub use email::{EmailAttachment, OutboundMessage};
pub use mailer::{Relay, SmtpRelay};
