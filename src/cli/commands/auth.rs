use clap::Subcommand;
use serde_json::json;

use crate::cli::client::ApiClient;
use crate::cli::config::*;
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Register new user")]
    Register {
        #[arg(help = "Username")]
        username: String,
        #[arg(long, help = "Password (read from stdin if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Login and store the access token")]
    Login {
        #[arg(help = "Username")]
        username: String,
        #[arg(long, help = "Password (read from stdin if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Forget the stored access token")]
    Logout,

    #[command(about = "Show current authentication status")]
    Status,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Register { username, password } => {
            let password = resolve_password(password)?;
            let response = ApiClient::anonymous()?
                .post_json("/api/auth/register", &json!({ "username": username, "password": password }))
                .await?;

            let message = response["message"].as_str().unwrap_or("User created successfully");
            output_success(&output_format, message, Some(json!({ "username": username })))
        }
        AuthCommands::Login { username, password } => {
            let password = resolve_password(password)?;
            let response = ApiClient::anonymous()?
                .post_json("/api/auth/login", &json!({ "username": username, "password": password }))
                .await?;

            let token = response["access_token"]
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("Server response did not include an access token"))?
                .to_string();
            let is_test_mode = response["is_test_mode"].as_bool().unwrap_or(false);

            let mut env_config = load_environment_config()?;
            env_config.set_session(&username, token, is_test_mode);
            save_environment_config(&env_config)?;

            let message = if is_test_mode {
                format!("Logged in as '{}' (demo mode)", username)
            } else {
                format!("Logged in as '{}'", username)
            };
            output_success(
                &output_format,
                &message,
                Some(json!({ "username": username, "is_test_mode": is_test_mode })),
            )
        }
        AuthCommands::Logout => {
            let mut env_config = load_environment_config()?;
            env_config.clear_session();
            save_environment_config(&env_config)?;
            output_success(&output_format, "Logged out", None)
        }
        AuthCommands::Status => {
            let env_config = load_environment_config()?;
            if env_config.token.is_none() {
                return match output_format {
                    OutputFormat::Json => output_json(&json!({ "authenticated": false })),
                    OutputFormat::Text => {
                        println!("Not logged in");
                        Ok(())
                    }
                };
            }

            let me = ApiClient::authenticated()?.get_json("/api/auth/me", &[]).await?;
            match output_format {
                OutputFormat::Json => output_json(&json!({ "authenticated": true, "session": me })),
                OutputFormat::Text => {
                    println!("Server:   {}", env_config.server_url());
                    println!("Username: {}", me["username"].as_str().unwrap_or("?"));
                    println!("User ID:  {}", me["user_id"]);
                    if me["is_test_mode"].as_bool().unwrap_or(false) {
                        println!("Mode:     demo");
                    }
                    Ok(())
                }
            }
        }
    }
}
