//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Salesforce REST client.
#[derive(Parser, Debug)]
#[command(name = "sf")]
#[command(about = "Salesforce REST client: OAuth login, record CRUD and SOQL queries")]
#[command(version)]
pub struct Args {
    /// Config file (falls back to SF_CONFIG, then salesforce.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Credential snapshot file
    #[arg(
        long,
        global = true,
        env = "SF_CREDENTIALS",
        default_value = "salesforce-credential.json"
    )]
    pub credentials: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Password grant login (password read from SF_PASSWORD)
    Login { username: String },
    /// Print the web-server flow authorization URL
    AuthorizeUrl {
        /// Defaults to the configured redirect_url
        redirect_url: Option<String>,
    },
    /// Exchange an authorization code for a credential
    Exchange {
        code: String,
        /// Defaults to the configured redirect_url
        redirect_url: Option<String>,
    },
    /// Run the refresh-token grant
    Refresh,
    /// Show the stored credential
    Status,
    /// Fetch one record
    Get {
        object_type: String,
        id: String,
        /// Comma-separated field list
        #[arg(value_delimiter = ',')]
        fields: Vec<String>,
    },
    /// Run a SOQL query and print every page's records
    Query { soql: String },
    /// Create a record and print its id
    Create {
        object_type: String,
        #[arg(value_parser = parse_json)]
        data: serde_json::Value,
    },
    /// Patch a record
    Update {
        object_type: String,
        id: String,
        #[arg(value_parser = parse_json)]
        data: serde_json::Value,
    },
    /// Delete a record
    Delete { object_type: String, id: String },
}

impl Command {
    /// Whether the command needs a stored credential before it runs.
    pub fn needs_session(&self) -> bool {
        !matches!(
            self,
            Command::Login { .. } | Command::AuthorizeUrl { .. } | Command::Exchange { .. }
        )
    }
}

fn parse_json(raw: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("record data is not valid JSON: {e}"))
}
