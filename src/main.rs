use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use log::error;

use imapstats::config::{ServerProfile, DEFAULT_MAILBOX};
use imapstats::{run_report, Config, DateWindow, ImapOpener, RequestInput, Security};

/// Incoming-mail volume report for an IMAP mailbox
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Path to config file
    #[clap(short, long, default_value = "~/.config/imapstats/config.json")]
    config: String,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Count incoming messages per day over a date range
    Report {
        /// IMAP server address (overrides the saved profile)
        #[clap(long)]
        host: Option<String>,

        /// IMAP server port
        #[clap(long)]
        port: Option<u16>,

        /// Security (ssl, starttls)
        #[clap(long)]
        security: Option<String>,

        /// Mailbox to count, INBOX when blank
        #[clap(long)]
        mailbox: Option<String>,

        /// IMAP username
        #[clap(short, long)]
        username: Option<String>,

        /// IMAP password
        #[clap(long, env = "IMAPSTATS_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// First day of the range, YYYY-MM-DD (UTC)
        #[clap(long)]
        start: Option<String>,

        /// Last day of the range, YYYY-MM-DD (UTC)
        #[clap(long)]
        end: Option<String>,

        /// Print the report as JSON
        #[clap(long)]
        json: bool,
    },

    /// Save the server profile used by `report`
    SetServer {
        /// IMAP server address
        #[clap(long)]
        host: String,

        /// IMAP server port
        #[clap(long, default_value = "993")]
        port: u16,

        /// Security (ssl, starttls)
        #[clap(long, default_value = "ssl")]
        security: String,

        /// Mailbox to count
        #[clap(long, default_value = DEFAULT_MAILBOX)]
        mailbox: String,

        /// IMAP username
        #[clap(short, long)]
        username: String,
    },

    /// Print the current configuration
    ShowConfig,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.debug { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .init();

    let config_path = shellexpand::tilde(&args.config).into_owned();
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    match args.command {
        Commands::Report {
            host,
            port,
            security,
            mailbox,
            username,
            password,
            start,
            end,
            json,
        } => {
            let profile = config.server.clone().unwrap_or_default();
            let (start, end) = match (start, end) {
                (Some(start), Some(end)) => (start, end),
                (start, end) => {
                    let today = Utc::now().date_naive();
                    let default = DateWindow::ending_on(today, config.default_window_days)
                        .context("Invalid default_window_days in config")?;
                    (
                        start.unwrap_or_else(|| default.start.to_string()),
                        end.unwrap_or_else(|| default.end.to_string()),
                    )
                }
            };

            let input = RequestInput {
                host: host.unwrap_or(profile.host),
                port: Some(port.unwrap_or(profile.port)),
                security: security.unwrap_or_else(|| profile.security.to_string()),
                mailbox: mailbox.unwrap_or(profile.mailbox),
                username: username.unwrap_or(profile.username),
                password: password.unwrap_or_default(),
                start_date: start,
                end_date: end,
            };

            let request = match input.validate() {
                Ok(request) => request,
                Err(errors) => {
                    for message in &errors.0 {
                        eprintln!("Error: {}", message);
                    }
                    std::process::exit(2);
                }
            };

            let mut opener = ImapOpener::new(config.connect_timeout());
            match run_report(&mut opener, &request, Utc::now()) {
                Ok(outcome) => {
                    for notice in &outcome.notices {
                        eprintln!("{}", notice);
                    }
                    if json {
                        let body = serde_json::to_string_pretty(&outcome.report)
                            .context("Failed to serialize report")?;
                        println!("{}", body);
                    } else {
                        print!("{}", outcome.report);
                    }
                }
                Err(e) => {
                    error!("Report failed: {}", e);
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::SetServer {
            host,
            port,
            security,
            mailbox,
            username,
        } => {
            let security: Security = security.parse().map_err(anyhow::Error::msg)?;
            config.server = Some(ServerProfile {
                host,
                port,
                security,
                mailbox,
                username,
            });
            config
                .save(&config_path)
                .with_context(|| format!("Failed to save config to {}", config_path))?;
            println!("Server profile saved to {}", config_path);
        }
        Commands::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
