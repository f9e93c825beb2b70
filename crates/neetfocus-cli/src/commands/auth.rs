use std::io::BufRead;

use clap::Subcommand;
use neetfocus_core::storage::credentials::{self, TokenSource, TOKEN_ENV};

use crate::common::CliResult;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store the API token in the OS keyring
    Login {
        /// API token; read from stdin if omitted
        #[arg(long)]
        token: Option<String>,
    },
    /// Remove the stored token
    Logout,
    /// Check whether a token is available
    Status,
}

pub fn run(action: AuthAction) -> CliResult {
    match action {
        AuthAction::Login { token } => {
            let token = match token {
                Some(token) => token,
                None => {
                    let mut line = String::new();
                    std::io::stdin().lock().read_line(&mut line)?;
                    line
                }
            };
            let token = token.trim();
            if token.is_empty() {
                return Err("token is empty".into());
            }
            credentials::save_token(token)?;
            println!("token saved");
        }
        AuthAction::Logout => {
            if credentials::delete_token()? {
                println!("token removed");
            } else {
                println!("no token stored");
            }
            if std::env::var_os(TOKEN_ENV).is_some() {
                println!("note: {TOKEN_ENV} is still set in this environment");
            }
        }
        AuthAction::Status => match credentials::load_token()? {
            Some((_, TokenSource::Env)) => println!("authenticated (from {TOKEN_ENV})"),
            Some((_, TokenSource::Keyring)) => println!("authenticated (keyring)"),
            None => println!("not authenticated"),
        },
    }
    Ok(())
}
