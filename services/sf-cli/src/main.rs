//! Salesforce command-line client
//!
//! Thin driver over `sf-client`:
//! 1. Loads the connected-app config (`--config`, `SF_CONFIG`, `salesforce.toml`)
//! 2. Opens the credential file (`--credentials`, `SF_CREDENTIALS`)
//! 3. Logs in, or restores the stored credential and refreshes it when due
//! 4. Runs one command and prints the result as JSON on stdout
//!
//! Logs go to stderr so stdout stays machine-readable.

mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use common::{ClientConfig, Secret};
use serde_json::json;
use sf_auth::FileCredentialStore;
use sf_client::{Api, Client};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Command;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let args = cli::Args::parse();

    let config_path = ClientConfig::resolve_path(args.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");
    let config = ClientConfig::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let store = FileCredentialStore::new(&args.credentials);
    let client = Arc::new(Client::from_config(config)?.with_store(Arc::new(store)));

    if args.command.needs_session() {
        client.restore().await.with_context(|| {
            format!(
                "no usable credential at {}; run `sf login` first",
                args.credentials.display()
            )
        })?;
        if client.needs_refresh().await? {
            info!("stored access token is due for refresh");
            client.refresh_token().await?;
        }
    }

    let output = run(&client, args.command).await?;
    if let Some(output) = output {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}

/// Execute one command against an already prepared client.
async fn run(client: &Arc<Client>, command: Command) -> Result<Option<serde_json::Value>> {
    let api = Api::new(Arc::clone(client));
    let default_redirect = client.config().redirect_url.clone();

    let output = match command {
        Command::Login { username } => {
            let password = std::env::var("SF_PASSWORD")
                .map(Secret::new)
                .context("SF_PASSWORD must be set for login")?;
            let credential = client.login(&username, &password).await?;
            Some(json!({ "instance_url": credential.api_url(), "expires": credential.expires().to_rfc3339() }))
        }
        Command::AuthorizeUrl { redirect_url } => {
            let redirect = redirect_url.unwrap_or(default_redirect);
            Some(json!({ "url": client.authorize_url(&redirect)? }))
        }
        Command::Exchange { code, redirect_url } => {
            let redirect = redirect_url.unwrap_or(default_redirect);
            let credential = client.authorize_confirm(&code, &redirect).await?;
            Some(json!({ "instance_url": credential.api_url(), "expires": credential.expires().to_rfc3339() }))
        }
        Command::Refresh => {
            let credential = client.refresh_token().await?;
            Some(json!({ "expires": credential.expires().to_rfc3339() }))
        }
        Command::Status => {
            let credential = client
                .credential()
                .await
                .context("no active credential")?;
            Some(json!({
                "id": credential.id(),
                "instance_url": credential.api_url(),
                "scope": credential.scope(),
                "issued": credential.issued().to_rfc3339(),
                "expires": credential.expires().to_rfc3339(),
                "needs_refresh": credential.needs_refresh(),
            }))
        }
        Command::Get {
            object_type,
            id,
            fields,
        } => {
            let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
            Some(api.get_record(&object_type, &id, &fields).await?)
        }
        Command::Query { soql } => Some(serde_json::Value::Array(api.search(&soql).await?)),
        Command::Create { object_type, data } => {
            Some(json!({ "id": api.create_record(&object_type, &data).await? }))
        }
        Command::Update {
            object_type,
            id,
            data,
        } => {
            api.update_record(&object_type, &id, &data).await?;
            None
        }
        Command::Delete { object_type, id } => {
            api.delete_record(&object_type, &id).await?;
            None
        }
    };

    Ok(output)
}
