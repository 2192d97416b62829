use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use forecast_goals::{
    config::GoalsConfig,
    helpers::{
        oauth::{self, EnvCredentials, RefreshCredentials, DEFAULT_SCOPES},
        sheets,
    },
    models::oauth::StoredToken,
    service::GoalsService,
};

/// Read forecast goals from Google Sheets.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// Goals config (JSON) listing locations and labels
    #[arg(long, env = "FORECAST_GOALS_CONFIG", default_value = "goals.json")]
    config: PathBuf,

    /// OAuth client secrets downloaded from the Cloud Console
    #[arg(long, default_value = "credentials.json")]
    credentials: PathBuf,

    /// Where tokens are stored
    #[arg(long, default_value = "token.json")]
    token: PathBuf,

    /// Overrides the client id used for token refresh
    #[arg(long, env = "GOOGLE_OAUTH_CLIENT_ID", hide_env_values = true)]
    client_id: Option<String>,

    /// Overrides the client secret used for token refresh
    #[arg(long, env = "GOOGLE_OAUTH_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// With --google-client-secret and --google-refresh-token, replaces token.json
    #[arg(long, env = "GOOGLE_CLIENT_ID", hide_env_values = true)]
    google_client_id: Option<String>,

    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    google_client_secret: Option<String>,

    #[arg(long, env = "GOOGLE_REFRESH_TOKEN", hide_env_values = true)]
    google_refresh_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the consent URL to open in a browser
    AuthUrl,
    /// Exchange an authorization code for tokens and save them
    ExchangeCode { code: String },
    /// Run the consent flow with a loopback redirect and save a refresh token
    Authorize {
        #[arg(long, default_value_t = 8085)]
        port: u16,
    },
    /// Check that every configured spreadsheet is readable
    TestAccess,
    /// Print the layout of a forecast spreadsheet
    Explore {
        #[arg(long)]
        location: Option<String>,
    },
    /// Print the goal section and extracted monthly goals per location
    ReadGoals {
        #[arg(long)]
        json: bool,
    },
    /// Print total/goal rows of a monthly tab
    DailyTotals {
        #[arg(long)]
        location: Option<String>,
        /// A1 range, defaults to the configured monthly tab range
        #[arg(long)]
        tab_range: Option<String>,
    },
    /// Write sheets_data.js and sheets_data.py with the current goals
    Generate {
        #[arg(long, default_value = "src")]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let http = Client::new();

    match &cli.command {
        Command::AuthUrl => {
            let secrets = oauth::load_client_secrets(&cli.credentials)?;
            let redirect_uri = oauth::default_redirect_uri(&secrets);
            let url = oauth::authorization_url(&secrets, &redirect_uri, &DEFAULT_SCOPES)?;

            println!("Google OAuth Authorization URL:");
            println!("{url}");
            println!("\nOpen the URL, grant access, then copy the `code` parameter from");
            println!("the {redirect_uri}?code=... redirect and run:");
            println!("  forecast-goals exchange-code <CODE>");
        }
        Command::ExchangeCode { code } => {
            let secrets = oauth::load_client_secrets(&cli.credentials)?;
            let redirect_uri = oauth::default_redirect_uri(&secrets);
            let token = oauth::exchange_code(&http, &secrets, code, &redirect_uri).await?;
            let refresh = token.refresh_token.clone();

            oauth::save_token(&cli.token, &StoredToken::from(token))?;
            println!("Tokens saved to {}", cli.token.display());
            print_env_hint(&secrets.client_id, &secrets.client_secret, refresh.as_deref());
        }
        Command::Authorize { port } => {
            let secrets = oauth::load_client_secrets(&cli.credentials)?;
            let listener = TcpListener::bind(("127.0.0.1", *port))
                .await
                .with_context(|| format!("could not listen on port {port}"))?;
            let redirect_uri = format!("http://localhost:{port}");
            let url = oauth::authorization_url(&secrets, &redirect_uri, &DEFAULT_SCOPES)?;

            println!("Open this URL in your browser to authorize:\n{url}");
            let code = oauth::capture_redirect(listener).await?;
            let token = oauth::exchange_code(&http, &secrets, &code, &redirect_uri).await?;
            let refresh = token
                .refresh_token
                .context("Google did not return a refresh token")?;

            oauth::save_token(&cli.token, &StoredToken::authorized_user(&secrets, &refresh))?;
            println!("Authorization successful!");
            print_env_hint(&secrets.client_id, &secrets.client_secret, Some(&refresh));
        }
        command => {
            let service = build_service(&cli, &http).await?;
            run_sheets_command(&service, command).await?;
        }
    }

    Ok(())
}

fn print_env_hint(client_id: &str, client_secret: &str, refresh_token: Option<&str>) {
    println!("\nRefresh token: {}", refresh_token.unwrap_or("<none>"));
    println!("\nEnvironment for services reading the sheets:");
    println!("GOOGLE_CLIENT_ID={client_id}");
    println!("GOOGLE_CLIENT_SECRET={client_secret}");
    println!("GOOGLE_REFRESH_TOKEN={}", refresh_token.unwrap_or(""));
}

async fn build_service(cli: &Cli, http: &Client) -> Result<GoalsService> {
    let config = GoalsConfig::load(&cli.config)?;
    let env = EnvCredentials {
        client_id: cli.google_client_id.clone(),
        client_secret: cli.google_client_secret.clone(),
        refresh_token: cli.google_refresh_token.clone(),
    };
    let from_env = env.stored_token().is_some();
    let stored = oauth::load_stored_token(&env, &cli.token)?;

    // Secrets file is optional once the token carries the client credentials
    let secrets = oauth::load_client_secrets(&cli.credentials).ok();
    let file_secrets = secrets.as_ref().filter(|_| !from_env);
    let creds = RefreshCredentials {
        client_id: cli
            .client_id
            .clone()
            .or_else(|| file_secrets.map(|s| s.client_id.clone())),
        client_secret: cli
            .client_secret
            .clone()
            .or_else(|| file_secrets.map(|s| s.client_secret.clone())),
        token_uri: secrets.as_ref().map(|s| s.token_uri.clone()),
    };

    let access_token = oauth::resolve_access_token(http, &stored, &creds)
        .await
        .context("could not obtain an access token; run `authorize` first")?;
    let client = sheets::sheets_client_init(&access_token)?;
    Ok(GoalsService::new(client, config))
}

async fn run_sheets_command(service: &GoalsService, command: &Command) -> Result<()> {
    match command {
        Command::TestAccess => {
            for (name, outcome) in service.test_access().await {
                match outcome {
                    Ok(sheet) => println!("{name}: OK\n{sheet}\n"),
                    Err(e) => println!("{name}: FAILED ({e})\n"),
                }
            }
            let location = service.default_location()?;
            let sample = service.read_range(location, "A1:Z10").await?;
            println!("Sample data from {}:", location.label());
            for (i, row) in sample.rows().iter().take(3).enumerate() {
                println!("  Row {}: {}", i + 1, row.iter().take(5).cloned().collect::<Vec<_>>().join(" | "));
            }
        }
        Command::Explore { location } => {
            let location = match location {
                Some(name) => service.location(name)?,
                None => service.default_location()?,
            };
            let found = service.explore(location).await?;

            println!("Headers:");
            for row in &found.header_rows {
                let cells: Vec<&str> = row.cells.iter().map(String::as_str).filter(|c| !c.is_empty()).collect();
                println!("  Row {}: {}", row.number, cells.join(" | "));
            }
            println!("\nColumns:");
            for (letter, header) in &found.columns {
                println!("  Col {letter}: {header}");
            }
            println!("\nMonthly tab ({}):", service.config.monthly_tab_range);
            for row in &found.monthly_sample {
                println!("  Row {}: {}", row.number, row.cells.iter().take(4).cloned().collect::<Vec<_>>().join(" | "));
            }
            println!("\nKey metrics:");
            for row in &found.metric_rows {
                println!("  Row {}: {}", row.number, row.cells.join(" | "));
            }
        }
        Command::ReadGoals { json } => {
            if *json {
                let report = service.get_all_monthly_goals().await;
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            for location in &service.config.locations {
                println!("{} {}:", location.label(), service.config.section_label);
                match service.forecast_preview(location).await {
                    Ok(rows) => {
                        for row in rows {
                            println!("  {}: {}", row.label, row.cells.join(" | "));
                        }
                    }
                    Err(e) => println!("  error: {e}"),
                }
                match service.read_monthly_goals(location).await {
                    Some(goals) => println!("{}", goals.monthly_goals),
                    None => println!("  no monthly goals found\n"),
                }
            }
        }
        Command::DailyTotals {
            location,
            tab_range,
        } => {
            let location = match location {
                Some(name) => service.location(name)?,
                None => service.default_location()?,
            };
            let tab_range = tab_range
                .as_deref()
                .unwrap_or(&service.config.monthly_tab_range);
            for row in service.daily_totals(location, tab_range).await? {
                println!("  Row {}: {}", row.number, row.cells.iter().take(5).cloned().collect::<Vec<_>>().join(" | "));
            }
        }
        Command::Generate { out_dir } => {
            let generated = service.generate_modules(out_dir).await?;
            for (name, goals) in &generated.report.locations {
                match goals {
                    Some(goals) => println!("{name}:\n{}", goals.monthly_goals),
                    None => println!("{name}: no goals (null in generated modules)"),
                }
            }
            info!("Modules written");
            println!("Generated {}", generated.js_path.display());
            println!("Generated {}", generated.py_path.display());
        }
        Command::AuthUrl | Command::ExchangeCode { .. } | Command::Authorize { .. } => {
            anyhow::bail!("{command:?} does not read spreadsheets")
        }
    }
    Ok(())
}
