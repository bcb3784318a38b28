// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line front end: one authenticated call per invocation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use reqwest::Method;
use tracing_subscriber::EnvFilter;

use crate::client::AuthClient;
use crate::config::ClientConfig;
use crate::error::RequestError;
use crate::request::ApiResponse;
use crate::terminator::{LogNavigator, Navigator};

pub const EXIT_OK: i32 = 0;
pub const EXIT_REQUEST_FAILED: i32 = 1;
pub const EXIT_INVALID_CONFIG: i32 = 2;
pub const EXIT_SESSION_ENDED: i32 = 3;

/// Authenticated API client with single-flight credential renewal.
#[derive(Debug, Parser)]
#[command(name = "authflight", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub client: ClientConfig,

    /// Extra request header as `name:value` (repeatable).
    #[arg(short = 'H', long = "header", global = true)]
    pub headers: Vec<String>,

    /// Log format (json or text).
    #[arg(long, env = "AUTHFLIGHT_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "AUTHFLIGHT_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// GET a path and print the response body.
    Get { path: String },
    /// DELETE a path.
    Delete { path: String },
    /// POST a JSON body.
    Post {
        path: String,
        #[arg(long)]
        data: Option<String>,
    },
    /// PUT a JSON body.
    Put {
        path: String,
        #[arg(long)]
        data: Option<String>,
    },
    /// PATCH a JSON body.
    Patch {
        path: String,
        #[arg(long)]
        data: Option<String>,
    },
    /// Exchange sign-in material (JSON) for a credential.
    SignIn {
        #[arg(long)]
        data: String,
    },
    /// Invalidate the session on the server and locally.
    SignOut,
}

/// Initialize tracing/logging on stderr.
///
/// Uses `try_init` so it's safe to call multiple times (e.g. from tests).
pub fn init_tracing(cli: &Cli) {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    let result = match cli.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init(),
    };
    drop(result);
}

/// Run one command and return the process exit code.
pub async fn run(cli: Cli) -> i32 {
    let ended = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ended);
    let navigator: Arc<dyn Navigator> = Arc::new(move |url: &str| {
        flag.store(true, Ordering::SeqCst);
        LogNavigator.redirect_to_sign_in(url);
    });

    let client = match AuthClient::new(cli.client.clone(), navigator) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_INVALID_CONFIG;
        }
    };

    match execute(&client, &cli).await {
        Ok(Some(output)) => {
            println!("{output}");
            EXIT_OK
        }
        Ok(None) => EXIT_OK,
        Err(e) => {
            eprintln!("error: {e}");
            let signing_out = matches!(cli.command, Command::SignOut);
            if ended.load(Ordering::SeqCst) && !signing_out {
                eprintln!("session ended; sign in again at {}", client.config().sign_in_url);
                EXIT_SESSION_ENDED
            } else {
                EXIT_REQUEST_FAILED
            }
        }
    }
}

async fn execute(client: &AuthClient, cli: &Cli) -> Result<Option<String>, RequestError> {
    let (method, path, data) = match cli.command {
        Command::Get { ref path } => (Method::GET, path, None),
        Command::Delete { ref path } => (Method::DELETE, path, None),
        Command::Post { ref path, ref data } => (Method::POST, path, data.as_deref()),
        Command::Put { ref path, ref data } => (Method::PUT, path, data.as_deref()),
        Command::Patch { ref path, ref data } => (Method::PATCH, path, data.as_deref()),
        Command::SignIn { ref data } => {
            client.sign_in(&parse_data(data)?).await?;
            return Ok(None);
        }
        Command::SignOut => {
            client.sign_out().await?;
            return Ok(None);
        }
    };

    let mut descriptor = client.request(method, path);
    for line in &cli.headers {
        descriptor = descriptor.try_header_line(line)?;
    }
    if let Some(data) = data {
        descriptor = descriptor.json(&parse_data(data)?)?;
    }

    let response = client.send(descriptor).await?;
    let body = render_body(&response);
    Ok((!body.is_empty()).then_some(body))
}

fn parse_data(data: &str) -> Result<serde_json::Value, RequestError> {
    serde_json::from_str(data).map_err(|e| RequestError::Build(format!("--data is not valid JSON: {e}")))
}

/// Pretty-print JSON bodies; anything else is returned as text.
pub fn render_body(response: &ApiResponse) -> String {
    match serde_json::from_slice::<serde_json::Value>(&response.body) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| response.text()),
        Err(_) => response.text().trim_end().to_owned(),
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
