use marketplace_core::auth::AuthStatusObserver;

use crate::auth::clear_stored_session;
use crate::cli::AuthCommands;
use crate::commands::common::{auth_error, connect};
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        AuthCommands::Login { email, password } => {
            let connection = connect(global_profile).await?;
            let session = connection
                .auth
                .sign_in(&email, &password)
                .await
                .map_err(auth_error)?;
            let email_label = session.user.email.as_deref().unwrap_or("(no email)");
            println!(
                "Signed in profile '{}' as {email_label}",
                connection.profile_name
            );
            Ok(())
        }
        AuthCommands::Signup { email, password } => {
            let connection = connect(global_profile).await?;
            let session = connection
                .auth
                .sign_up(&email, &password)
                .await
                .map_err(auth_error)?;
            let email_label = session.user.email.as_deref().unwrap_or("(no email)");
            println!(
                "Created account {email_label} and signed in profile '{}'",
                connection.profile_name
            );
            Ok(())
        }
        AuthCommands::Status => {
            let connection = connect(global_profile).await?;
            let mut observer = AuthStatusObserver::subscribe(connection.backend.session());
            let status = observer.checked().await;

            match (&connection.auth_session, status.logged_in) {
                (Some(session), true) => {
                    let email_label = session.user.email.as_deref().unwrap_or("(no email)");
                    println!(
                        "Profile '{}' is signed in as {} (expires_at={})",
                        connection.profile_name, email_label, session.expires_at
                    );
                }
                _ => println!("Profile '{}' is not signed in.", connection.profile_name),
            }
            Ok(())
        }
        AuthCommands::Logout => {
            match connect(global_profile).await {
                Ok(connection) => {
                    connection.auth.sign_out().map_err(auth_error)?;
                    println!("Signed out profile '{}'", connection.profile_name);
                }
                Err(CliError::NotConfigured | CliError::Config(_)) => {
                    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
                    let profile_name = config.resolve_profile_name(global_profile);
                    clear_stored_session(&profile_name).map_err(auth_error)?;
                    println!("Signed out profile '{profile_name}'");
                }
                Err(error) => return Err(error),
            }
            Ok(())
        }
    }
}
