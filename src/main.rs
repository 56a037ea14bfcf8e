//! `quizhub-session` -- drive the authenticated client from a shell.
//!
//! Credentials live in the OS keychain, so a session saved with `login`
//! survives between invocations and is refreshed on demand.
//!
//! ```text
//! quizhub-session login <access-token> <refresh-token> <user-json>
//! quizhub-session whoami
//! quizhub-session get <path>
//! quizhub-session post <path> <json-body>
//! quizhub-session delete <path>
//! quizhub-session logout
//! ```
//!
//! | Variable                 | Default                 | Description                          |
//! |--------------------------|-------------------------|--------------------------------------|
//! | `QUIZHUB_API_ORIGIN`     | `http://localhost:5000` | Backend origin, `/api` is appended   |
//! | `QUIZHUB_API_TIMEOUT_MS` | `30000`                 | Per-request timeout                  |
//! | `QUIZHUB_LOCATION`       | `/`                     | View the request is made from        |

use std::process::ExitCode;
use std::sync::Arc;

use quizhub_session::logging::init_tracing;
use quizhub_session::{
    ApiClient, ClientConfig, CurrentUser, HistoryNavigator, KeyringStorage, LoginSession, Navigator,
};
use serde_json::Value;

const ENV_LOCATION: &str = "QUIZHUB_LOCATION";

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn usage() -> &'static str {
    "usage: quizhub-session <login|whoami|get|post|delete|logout> [args...]"
}

fn print_json(value: &Value) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(args: &[String], client: &ApiClient, navigator: &HistoryNavigator) -> CliResult {
    let arg = |i: usize| args.get(i).map(String::as_str).ok_or(usage());

    match arg(0)? {
        "login" => {
            let user: CurrentUser = serde_json::from_str(arg(3)?)?;
            client.session().save(&LoginSession {
                access_token: arg(1)?.to_string(),
                refresh_token: arg(2)?.to_string(),
                user,
            })?;
            tracing::info!("Session saved");
        }
        "whoami" => match client.session().current_user() {
            Some(user) => print_json(&serde_json::to_value(user)?)?,
            None => println!("not logged in"),
        },
        "get" => print_json(&client.get::<Value>(arg(1)?).await?)?,
        "post" => {
            let body: Value = serde_json::from_str(arg(2)?)?;
            print_json(&client.post::<Value, _>(arg(1)?, &body).await?)?;
        }
        "delete" => print_json(&client.delete::<Value>(arg(1)?).await?)?,
        "logout" => client.logout()?,
        _ => return Err(usage().into()),
    }

    if let Some(to) = navigator.replacements().last() {
        eprintln!("session expired, redirected to {to}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing("quizhub_session=info");

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let storage = KeyringStorage::default();
    if !storage.is_available() {
        tracing::error!("OS keychain/secret service is unavailable");
        return ExitCode::FAILURE;
    }

    let location = std::env::var(ENV_LOCATION).unwrap_or_else(|_| "/".to_string());
    let navigator = HistoryNavigator::new(location);

    let client = match ApiClient::builder(config)
        .storage(Arc::new(storage))
        .navigator(Arc::new(navigator.clone()))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build client");
            return ExitCode::FAILURE;
        }
    };

    tracing::debug!(
        base_url = %client.config().base_url,
        location = %navigator.current_path(),
        "Starting"
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args, &client, &navigator).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
