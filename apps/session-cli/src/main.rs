use std::sync::Arc;

use clap::{Parser, Subcommand};
use planner_client::http::{Method, ReqwestTransport, Transport};
use planner_client::session::{AuthSession, FileStore, SessionStore};
use planner_client::{telemetry, AuthenticatedClient, ClientConfig};
use tracing::debug;

#[derive(Parser)]
#[command(name = "planner-session")]
#[command(about = "Log in to the planning backend and make authenticated calls")]
struct Args {
    /// Override PLANNER_API_BASE_URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Override PLANNER_SESSION_FILE
    #[arg(long, global = true)]
    session_file: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Authenticate and persist the session
    Login {
        #[arg(short, long)]
        email: String,
        /// Falls back to PLANNER_PASSWORD
        #[arg(short, long, env = "PLANNER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show the identity of the persisted session
    Whoami,
    /// End the persisted session
    Logout,
    /// Call the backend with the persisted credential
    Request {
        /// GET, POST, PUT or DELETE
        method: String,
        /// Path below the API base, e.g. /api/orders
        path: String,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(2);
        }
    };
    telemetry::init_tracing(config.log_format);

    let transport: Arc<dyn Transport> = match ReqwestTransport::from_config(&config) {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(2);
        }
    };
    let store = SessionStore::new(Arc::new(FileStore::new(&config.session_file)));
    let session = AuthSession::restored(store, transport.clone());
    debug!(state = %session.state(), "session restored");

    let code = match args.command {
        Command::Login { email, password } => {
            match session.login(&email, &password).await.into_result() {
                Ok(identity) => {
                    println!("✅ Logged in as {} ({})", identity.display_name(), identity.email);
                    0
                }
                Err(failure) => {
                    eprintln!("❌ {failure}");
                    1
                }
            }
        }
        Command::Whoami => match session.identity() {
            Some(identity) => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&identity).unwrap_or_default()
                );
                0
            }
            None => {
                eprintln!("Not logged in");
                1
            }
        },
        Command::Logout => {
            if session.logout() {
                println!("👋 Logged out");
            } else {
                println!("Already logged out");
            }
            0
        }
        Command::Request { method, path, body } => {
            let client = AuthenticatedClient::new(session.clone(), transport);
            run_request(&client, &method, &path, body.as_deref()).await
        }
    };

    std::process::exit(code);
}

fn load_config(args: &Args) -> Result<ClientConfig, planner_client::ConfigError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &args.base_url {
        config = config.with_base_url(base_url)?;
    }
    if let Some(session_file) = &args.session_file {
        config = config.with_session_file(session_file);
    }
    Ok(config)
}

async fn run_request(
    client: &AuthenticatedClient,
    method: &str,
    path: &str,
    body: Option<&str>,
) -> i32 {
    let method = match method.to_uppercase().as_str() {
        "GET" => Method::GET,
        "POST" => Method::POST,
        "PUT" => Method::PUT,
        "DELETE" => Method::DELETE,
        other => {
            eprintln!("Unknown method: {other}. Use: GET | POST | PUT | DELETE");
            return 2;
        }
    };
    let body = match body.map(serde_json::from_str::<serde_json::Value>).transpose() {
        Ok(body) => body,
        Err(e) => {
            eprintln!("❌ --body is not valid JSON: {e}");
            return 2;
        }
    };

    match client.request(method, path, body).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
            0
        }
        Err(e) => {
            eprintln!("❌ {e} [{}]", e.code());
            if e.status() == Some(401) {
                eprintln!("Session ended; run `planner-session login` again.");
            }
            1
        }
    }
}
