use todosync_core::auth::TOKEN_ENV_VAR;

use crate::auth::{redact_token, KeychainTokenProvider, TokenSource, TokenStore};
use crate::cli::AuthCommands;
use crate::commands::common::read_piped_stdin;
use crate::error::CliError;

pub fn run_auth(command: AuthCommands) -> Result<(), CliError> {
    let store = TokenStore::default();
    match command {
        AuthCommands::Login { token } => {
            let token = match token.and_then(|token| normalize_token(&token)) {
                Some(token) => token,
                None => read_piped_stdin()?
                    .and_then(|token| normalize_token(&token))
                    .ok_or_else(|| {
                        CliError::Auth("Provide a token with --token or on stdin".to_string())
                    })?,
            };
            store.save(&token)?;
            println!("Stored GitHub token {}", redact_token(&token));
            Ok(())
        }
        AuthCommands::Status => {
            match KeychainTokenProvider::new(store).resolve()? {
                Some((token, TokenSource::Environment)) => {
                    println!("Using {} from {TOKEN_ENV_VAR}", redact_token(&token));
                }
                Some((token, TokenSource::Keychain)) => {
                    println!("Using {} from the system keychain", redact_token(&token));
                }
                None => println!("Not signed in."),
            }
            Ok(())
        }
        AuthCommands::Logout => {
            store.clear()?;
            println!("Removed stored GitHub token");
            Ok(())
        }
    }
}

/// Trim a token and reject anything with inner whitespace.
pub fn normalize_token(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        None
    } else {
        Some(trimmed.to_string())
    }
}
