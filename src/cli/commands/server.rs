use clap::Subcommand;
use serde_json::json;

use crate::cli::client::ApiClient;
use crate::cli::config::*;
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Point the CLI at a server (clears any stored login)")]
    Set {
        #[arg(help = "Server base URL, e.g. http://localhost:8000")]
        url: String,
    },

    #[command(about = "Show the configured server")]
    Show,

    #[command(about = "Health check the configured server")]
    Ping,

    #[command(about = "Show server information from the API root endpoint")]
    Info,
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Set { url } => {
            // validates the URL before it is stored
            ApiClient::new(&url, None)?;

            let mut env_config = load_environment_config()?;
            let url = url.trim_end_matches('/').to_string();
            if env_config.server_url.as_deref() != Some(url.as_str()) {
                env_config.clear_session();
            }
            env_config.server_url = Some(url.clone());
            env_config.server_status = ServerStatus::Unknown;
            save_environment_config(&env_config)?;

            output_success(
                &output_format,
                &format!("Server set to {}", url),
                Some(json!({ "server_url": url })),
            )
        }
        ServerCommands::Show => {
            let env_config = load_environment_config()?;
            match output_format {
                OutputFormat::Json => output_json(&json!({
                    "server_url": env_config.server_url(),
                    "status": env_config.server_status,
                    "last_ping": env_config.last_ping,
                })),
                OutputFormat::Text => {
                    println!("Server: {}", env_config.server_url());
                    println!("Status: {:?}", env_config.server_status);
                    if let Some(last_ping) = env_config.last_ping {
                        println!("Last ping: {}", last_ping.format("%Y-%m-%d %H:%M:%S"));
                    }
                    Ok(())
                }
            }
        }
        ServerCommands::Ping => {
            let mut env_config = load_environment_config()?;
            let url = env_config.server_url().to_string();
            let status = ping_server(&url).await;
            env_config.update_ping(status);
            save_environment_config(&env_config)?;

            match status {
                ServerStatus::Up => output_success(
                    &output_format,
                    &format!("{} is up", url),
                    Some(json!({ "server_url": url, "status": status })),
                ),
                _ => Err(anyhow::anyhow!("{} is not responding", url)),
            }
        }
        ServerCommands::Info => {
            let info = ApiClient::anonymous()?.get_json("/", &[]).await?;
            match output_format {
                OutputFormat::Json => output_json(&info),
                OutputFormat::Text => {
                    println!(
                        "{} {}",
                        info["name"].as_str().unwrap_or("Asset Vault"),
                        info["version"].as_str().unwrap_or("")
                    );
                    if let Some(description) = info["description"].as_str() {
                        println!("{}", description);
                    }
                    Ok(())
                }
            }
        }
    }
}
