use std::fmt;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use log::debug;
use serde::Deserialize;
use serde_json::Value;

use crate::app::{AppError, AppResult, CredentialError};
use crate::schema::CREDENTIAL_SCHEMA;

pub const EMAIL_PROMPT: &str = "Enter your email";
pub const PASSWORD_PROMPT: &str = "Enter email password";

/// Sender address and secret used to log in to the relay.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub from_address: String,
    pub secret: String,
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("from_address", &self.from_address)
            .field("secret", &"********")
            .finish()
    }
}

/// On-disk layout, only deserialized after schema validation passed.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CredentialFile {
    fromaddr: String,
    password: String,
}

/// Where the credentials for this run come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    File(PathBuf),
    Interactive,
}

impl CredentialSource {
    /// Pick the file if `path` names an existing file, otherwise fall back
    /// to prompting.
    pub fn resolve(path: Option<&str>) -> Self {
        let raw = match path {
            Some(p) if !p.is_empty() => p,
            _ => return Self::Interactive,
        };

        let path = PathBuf::from(shellexpand::tilde(raw).into_owned());
        if path.is_file() {
            debug!("Using credentials file {}", path.display());
            Self::File(path)
        } else {
            debug!("No credentials file at {}, prompting instead", path.display());
            Self::Interactive
        }
    }
}

/// Source of interactive answers.
pub trait Prompter {
    /// Ask a question and return the echoed answer.
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;

    /// Ask a question without echoing the answer.
    fn read_secret(&mut self, prompt: &str) -> io::Result<String>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        println!("{}", prompt);
        io::stdout().flush()?;
        read_stdin_line()
    }

    fn read_secret(&mut self, prompt: &str) -> io::Result<String> {
        println!("{}", prompt);
        io::stdout().flush()?;
        rpassword::read_password()
    }
}

fn read_stdin_line() -> io::Result<String> {
    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    if read == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "standard input closed"));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Obtain the credential record from `source`.
pub fn load<P: Prompter>(source: &CredentialSource, prompter: &mut P) -> AppResult<CredentialRecord> {
    match source {
        CredentialSource::File(path) => {
            let content = fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
            parse_credentials(&content)
        }
        CredentialSource::Interactive => prompt_credentials(prompter),
    }
}

/// Parse and validate the contents of a credentials file.
pub fn parse_credentials(content: &str) -> AppResult<CredentialRecord> {
    let value: Value = serde_json::from_str(content)?;

    if let Err(violations) = CREDENTIAL_SCHEMA.validate(&value) {
        for violation in &violations {
            debug!("Credentials file rejected: {}", violation);
        }
        return Err(CredentialError::Validation.into());
    }

    let file: CredentialFile =
        serde_json::from_value(value).map_err(|_| AppError::from(CredentialError::Validation))?;

    Ok(CredentialRecord {
        from_address: file.fromaddr,
        secret: file.password,
    })
}

fn prompt_credentials<P: Prompter>(prompter: &mut P) -> AppResult<CredentialRecord> {
    let from_address = prompter
        .read_line(EMAIL_PROMPT)
        .map_err(AppError::Prompt)?
        .trim()
        .to_string();
    let secret = prompter.read_secret(PASSWORD_PROMPT).map_err(AppError::Prompt)?;

    Ok(CredentialRecord { from_address, secret })
}
