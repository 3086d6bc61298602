use std::path::PathBuf;

use clap::{Args, Subcommand};
use reqwest::{multipart, Method};
use serde_json::{json, Value};

use crate::cli::client::ApiClient;
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum AssetCommands {
    #[command(about = "List your assets")]
    List {
        #[arg(long, help = "Only this category, e.g. \"3D Model\"")]
        category: Option<String>,
        #[arg(long, help = "Comma-separated tags; matches assets carrying any of them")]
        tags: Option<String>,
    },

    #[command(about = "Show one asset")]
    Get {
        #[arg(help = "Asset ID")]
        id: i64,
    },

    #[command(about = "Create an asset")]
    Create(AssetArgs),

    #[command(about = "Replace every field of an asset")]
    Update {
        #[arg(help = "Asset ID")]
        id: i64,
        #[command(flatten)]
        fields: AssetArgs,
    },

    #[command(about = "Delete an asset and its file")]
    Delete {
        #[arg(help = "Asset ID")]
        id: i64,
    },

    #[command(about = "Download an asset's file")]
    Download {
        #[arg(help = "Asset ID")]
        id: i64,
        #[arg(long, short, help = "Output path (defaults to the uploaded filename)")]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct AssetArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub category: String,
    #[arg(long = "license")]
    pub license_type: String,
    #[arg(long)]
    pub source_url: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, help = "Comma-separated tags")]
    pub tags: Option<String>,
    #[arg(long, help = "File to attach")]
    pub file: Option<PathBuf>,
}

impl AssetArgs {
    async fn into_form(self) -> anyhow::Result<multipart::Form> {
        let mut form = multipart::Form::new()
            .text("name", self.name)
            .text("category", self.category)
            .text("license_type", self.license_type)
            .text("source_url", self.source_url);

        if let Some(description) = self.description {
            form = form.text("description", description);
        }
        if let Some(tags) = self.tags {
            form = form.text("tags", tags);
        }
        if let Some(path) = self.file {
            let content = tokio::fs::read(&path)
                .await
                .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e))?;
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload.bin")
                .to_string();
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            let part = multipart::Part::bytes(content)
                .file_name(filename)
                .mime_str(mime.as_ref())?;
            form = form.part("file", part);
        }

        Ok(form)
    }
}

pub async fn handle(cmd: AssetCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = ApiClient::authenticated()?;

    match cmd {
        AssetCommands::List { category, tags } => {
            let mut query = Vec::new();
            if let Some(category) = category {
                query.push(("category", category));
            }
            if let Some(tags) = tags {
                query.push(("tags", tags));
            }

            let response = client.get_json("/api/assets", &query).await?;
            let assets = response["assets"].as_array().cloned().unwrap_or_default();
            if assets.is_empty() {
                return output_empty_collection(&output_format, "assets", "No assets found");
            }

            match output_format {
                OutputFormat::Json => output_json(&response),
                OutputFormat::Text => {
                    print_asset_table(&assets);
                    Ok(())
                }
            }
        }
        AssetCommands::Get { id } => {
            let asset = client.get_json(&format!("/api/assets/{}", id), &[]).await?;
            output_asset(&output_format, &asset)
        }
        AssetCommands::Create(fields) => {
            let asset = client.send_form(Method::POST, "/api/assets", fields.into_form().await?).await?;
            match output_format {
                OutputFormat::Json => output_json(&asset),
                OutputFormat::Text => {
                    println!("✓ Created asset {}", asset["id"]);
                    print_asset(&asset);
                    Ok(())
                }
            }
        }
        AssetCommands::Update { id, fields } => {
            let asset = client
                .send_form(Method::PUT, &format!("/api/assets/{}", id), fields.into_form().await?)
                .await?;
            output_asset(&output_format, &asset)
        }
        AssetCommands::Delete { id } => {
            let response = client.delete(&format!("/api/assets/{}", id)).await?;
            let message = response["message"].as_str().unwrap_or("Asset deleted");
            output_success(&output_format, message, Some(json!({ "id": id })))
        }
        AssetCommands::Download { id, output } => {
            let download = client.download(&format!("/api/assets/{}/file", id)).await?;
            let path = output.unwrap_or_else(|| {
                PathBuf::from(download.filename.clone().unwrap_or_else(|| format!("asset-{}.bin", id)))
            });
            tokio::fs::write(&path, &download.content).await?;

            output_success(
                &output_format,
                &format!("Saved {} bytes to {}", download.content.len(), path.display()),
                Some(json!({ "id": id, "path": path.display().to_string(), "bytes": download.content.len() })),
            )
        }
    }
}

fn output_asset(output_format: &OutputFormat, asset: &Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => output_json(asset),
        OutputFormat::Text => {
            print_asset(asset);
            Ok(())
        }
    }
}

fn print_asset(asset: &Value) {
    println!("ID:          {}", asset["id"]);
    println!("Name:        {}", asset["name"].as_str().unwrap_or(""));
    println!("Category:    {}", asset["category"].as_str().unwrap_or(""));
    println!("License:     {}", asset["license_type"].as_str().unwrap_or(""));
    println!("Source:      {}", asset["source_url"].as_str().unwrap_or(""));
    if let Some(description) = asset["description"].as_str() {
        println!("Description: {}", description);
    }
    println!("Tags:        {}", join_strings(asset.get("tags")));
    println!("File:        {}", asset["file_path"].as_str().unwrap_or("-"));
}

fn print_asset_table(assets: &[Value]) {
    println!("{:<6} {:<28} {:<14} {:<12} {:<5} {}", "ID", "NAME", "CATEGORY", "LICENSE", "FILE", "TAGS");
    println!("{}", "-".repeat(90));

    for asset in assets {
        let has_file = if asset["file_path"].is_string() { "yes" } else { "-" };
        println!(
            "{:<6} {:<28} {:<14} {:<12} {:<5} {}",
            asset["id"],
            truncate(asset["name"].as_str().unwrap_or(""), 28),
            asset["category"].as_str().unwrap_or(""),
            truncate(asset["license_type"].as_str().unwrap_or(""), 12),
            has_file,
            join_strings(asset.get("tags"))
        );
    }
}
