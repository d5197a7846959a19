use chrono::DateTime;
use taskmaster_core::config::CoreConfig;
use taskmaster_core::util::normalize_text_option;
use taskmaster_core::AuthSession;

use crate::cli::AuthCommands;
use crate::commands::common::session_store;
use crate::error::CliError;

pub fn run_auth(command: AuthCommands, config: &CoreConfig) -> Result<(), CliError> {
    let store = session_store(config);
    match command {
        AuthCommands::Login {
            user_id,
            token,
            email,
            expires_at,
        } => {
            let user_id = normalize_text_option(Some(user_id))
                .ok_or_else(|| CliError::Auth("user id cannot be empty".to_string()))?;
            let token = normalize_text_option(Some(token))
                .ok_or_else(|| CliError::Auth("token cannot be empty".to_string()))?;

            let mut session = AuthSession::new(user_id, token);
            if let Some(email) = normalize_text_option(email) {
                session = session.with_email(email);
            }
            if let Some(expires_at) = expires_at {
                session = session.with_expires_at(expires_at);
            }
            if session.is_expired() {
                return Err(CliError::Auth("token is already expired".to_string()));
            }

            store.save(&session)?;
            println!("Signed in as {}", session_label(&session));
        }
        AuthCommands::Status => match store.load()? {
            Some(session) => {
                let expiry = session
                    .expires_at
                    .and_then(|timestamp| DateTime::from_timestamp(timestamp, 0))
                    .map_or_else(String::new, |at| {
                        format!(" (expires {})", at.format("%Y-%m-%d %H:%M:%S UTC"))
                    });
                let state = if session.is_expired() { ", expired" } else { "" };
                println!("Signed in as {}{expiry}{state}", session_label(&session));
            }
            None => println!("Not signed in."),
        },
        AuthCommands::Logout => {
            store.clear()?;
            println!("Signed out");
        }
    }
    Ok(())
}

fn session_label(session: &AuthSession) -> String {
    session.email.as_deref().map_or_else(
        || session.user_id.clone(),
        |email| format!("{email} ({})", session.user_id),
    )
}
