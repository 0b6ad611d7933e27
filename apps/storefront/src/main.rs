use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{SessionController, Step};
use shared::domain::{DestinationId, GroupId, OptionId};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod render;

use commands::{Command, HELP};
use config::{load_settings, DEFAULT_CONFIG_FILE};

#[derive(Parser, Debug)]
#[command(about = "Terminal storefront for the flower shop checkout")]
struct Args {
    /// Checkout server base URL; overrides the config file and environment.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config)?;
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    info!(server_url = %settings.server_url, "starting storefront");

    let controller = SessionController::connect(&settings.server_url, settings.controller_config())
        .with_context(|| format!("cannot use server url '{}'", settings.server_url))?;
    if let Err(err) = controller.discover().await {
        warn!(error = %err, "merchant profile unavailable, will retry on first add");
    }

    println!("{HELP}");
    show(&controller).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("! {err}");
                continue;
            }
        };
        match command {
            Command::Quit => break,
            Command::Help => {
                println!("{HELP}");
                continue;
            }
            _ => {}
        }

        if let Err(err) = run(&controller, command).await {
            // Controller failures are already part of the snapshot.
            if controller.last_error().await.as_deref() != Some(err.to_string().as_str()) {
                println!("! {err}");
            }
        }
        show(&controller).await;
    }

    Ok(())
}

async fn run(controller: &SessionController, command: Command) -> Result<()> {
    match command {
        Command::Catalog | Command::Show | Command::Help | Command::Quit => {}
        Command::Add(product) => {
            controller.add_to_cart(&product).await?;
        }
        Command::Discount(code) => {
            if code.is_empty() {
                bail!("discount code is empty");
            }
            controller.apply_discount(code).await?;
        }
        Command::Checkout => {
            controller.request_fulfillment_options().await?;
        }
        Command::Destination(destination) => {
            controller
                .select_destination(DestinationId::new(destination))
                .await?;
        }
        Command::Ship { group, option } => {
            controller
                .select_shipping_option(GroupId::new(group), OptionId::new(option))
                .await?;
        }
        Command::Next => match controller.step().await {
            Step::Cart => {
                controller.request_fulfillment_options().await?;
            }
            Step::Fulfillment => {
                controller.proceed_to_payment().await?;
            }
            step => bail!("nothing comes after the {step} step"),
        },
        Command::Pay(instrument_id) => {
            let instrument = controller
                .available_instruments()
                .await
                .into_iter()
                .find(|i| i.id.as_str() == instrument_id)
                .with_context(|| format!("no payment instrument '{instrument_id}'"))?;
            controller.complete_payment(instrument).await?;
        }
        Command::Back => {
            controller.back().await?;
        }
        Command::Shop => {
            controller.continue_shopping().await?;
        }
        Command::Cancel => controller.cancel().await,
        Command::Restart => controller.start_over().await,
        Command::Profile => {
            let profile = controller.discover().await?;
            println!("ucp version {}", profile.ucp.version);
            for capability in &profile.ucp.capabilities {
                println!("  capability {} {}", capability.name, capability.version);
            }
            for handler in &profile.payment.handlers {
                println!("  payment handler {} ({})", handler.id, handler.name);
            }
        }
    }
    Ok(())
}

async fn show(controller: &SessionController) {
    let snapshot = controller.snapshot().await;
    let instruments = if snapshot.step == Step::Payment {
        controller.available_instruments().await
    } else {
        Vec::new()
    };
    print!("{}", render::render(&snapshot, &instruments));
}
