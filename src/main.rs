use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;

use terminal_email::{run, RelayConfig, SendRequest, SmtpRelay, TerminalPrompter};

/// Send an email, optionally with one attachment, from the terminal
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Recipient address
    toaddr: String,

    /// JSON file holding "fromaddr" and "password"; prompts when absent
    #[clap(short = 'c', long = "credentials_file", alias = "credentials-file", default_value = "")]
    credentials_file: String,

    /// Subject of email
    #[clap(short, long, default_value = "")]
    subject: String,

    /// Body of email
    #[clap(short, long, default_value = "")]
    body: String,

    /// File to send
    #[clap(short = 'f', long = "file_path", alias = "file-path", default_value = "")]
    file_path: String,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.debug { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .init();

    let request = SendRequest {
        to_address: args.toaddr,
        credentials_file: Some(args.credentials_file),
        subject: args.subject,
        body: args.body,
        file_path: Some(args.file_path),
    };

    let relay = SmtpRelay::new(RelayConfig::default());

    match run(&request, &mut TerminalPrompter, &relay) {
        Ok(()) => Ok(()),
        Err(e) if e.is_domain() => {
            debug!("{} failure: {}", e.kind(), e);
            println!("{}", e);
            process::exit(1);
        }
        Err(e) => {
            debug!("{} failure: {}", e.kind(), e);
            Err(e).context(format!("Failed to send email to {}", request.to_address))
        }
    }
}
