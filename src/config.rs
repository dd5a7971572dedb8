use std::fmt;

/// Transport security used when talking to the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Plain connection upgraded with STARTTLS before authentication.
    StartTls,
}

impl fmt::Display for SmtpSecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmtpSecurity::StartTls => write!(f, "STARTTLS"),
        }
    }
}

/// Relay endpoint mail is submitted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_security: SmtpSecurity,
}

pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            smtp_server: DEFAULT_SMTP_SERVER.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_security: SmtpSecurity::StartTls,
        }
    }
}

impl fmt::Display for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.smtp_server, self.smtp_port, self.smtp_security)
    }
}
