use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use controls_client::{
    load_settings, load_settings_from, ClientSettings, ControlsApi, ControlsPanel,
    HttpControlsApi, MemorySurface, NumericPolicy, StatusUpdate,
};
use shared::{domain::Control, protocol::ApplyReport};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod shell;

#[derive(Parser, Debug)]
#[command(name = "camctl", about = "View and adjust camera exposure, gain and brightness")]
struct Cli {
    /// Base URL of the camera backend.
    #[arg(long, global = true)]
    server_url: Option<String>,
    /// Settings file; defaults to ./camctl.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// Refuse to submit values that are not numbers instead of sending null.
    #[arg(long, global = true)]
    strict: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the backend's current control listing.
    Status,
    /// Submit control values and print the backend's answer.
    Apply {
        #[arg(long, allow_hyphen_values = true)]
        exposure_absolute: String,
        #[arg(long, allow_hyphen_values = true)]
        gain: String,
        #[arg(long, allow_hyphen_values = true)]
        brightness: String,
        #[arg(long, allow_hyphen_values = true)]
        exposure_auto: String,
        /// Signed exposure for backends that take one.
        #[arg(long, allow_hyphen_values = true)]
        exposure: Option<String>,
    },
    /// Check whether the backend has the camera open.
    Health,
    /// Drive the panel interactively from stdin.
    Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = resolve_settings(&cli);
    info!(server_url = %settings.server_url, "using camera backend");
    let api = Arc::new(
        HttpControlsApi::from_settings(&settings).context("failed to build controls client")?,
    );

    match cli.command {
        Command::Status => {
            let panel = ControlsPanel::new(
                api,
                page_for(&settings, settings.include_exposure.unwrap_or(false)),
                settings.panel_options(),
            );
            let update = panel.initialize().await?;
            print_update(&update);
        }
        Command::Apply {
            exposure_absolute,
            gain,
            brightness,
            exposure_auto,
            exposure,
        } => {
            let mut options = settings.panel_options();
            options.include_exposure = Some(exposure.is_some());
            let panel = ControlsPanel::new(
                api,
                page_for(&settings, exposure.is_some()),
                options,
            );

            let mut values = vec![
                (Control::ExposureAbsolute, exposure_absolute),
                (Control::Gain, gain),
                (Control::Brightness, brightness),
                (Control::ExposureAuto, exposure_auto),
            ];
            values.extend(exposure.map(|value| (Control::Exposure, value)));
            for (control, value) in values {
                panel.input(settings.elements.control(control), &value).await;
            }

            let update = panel.submit_controls().await?;
            print_update(&update);
            if let Some(text) = update.shown() {
                ensure_applied(text)?;
            }
        }
        Command::Health => {
            let report = api.health().await?;
            println!("camera_opened: {}", report.camera_opened);
            if !report.camera_opened {
                bail!("camera is not open");
            }
        }
        Command::Shell => {
            let panel = ControlsPanel::new(
                api,
                page_for(&settings, settings.include_exposure.unwrap_or(true)),
                settings.panel_options(),
            );
            shell::run(Arc::new(panel)).await?;
        }
    }

    Ok(())
}

fn resolve_settings(cli: &Cli) -> ClientSettings {
    let mut settings = match &cli.config {
        Some(path) => load_settings_from(path),
        None => load_settings(),
    };
    if let Some(url) = &cli.server_url {
        settings.server_url = url.clone();
    }
    if let Some(secs) = cli.timeout_secs {
        settings.request_timeout_secs = Some(secs);
    }
    if cli.strict {
        settings.numeric_policy = NumericPolicy::Strict;
    }
    settings
}

fn page_for(settings: &ClientSettings, with_exposure: bool) -> MemorySurface {
    MemorySurface::page_for(&settings.elements, with_exposure)
}

fn print_update(update: &StatusUpdate) {
    if let Some(text) = update.shown() {
        println!("{text}");
    }
}

/// Fails when the backend's per-control report lists a rejected control.
fn ensure_applied(text: &str) -> Result<()> {
    let Ok(value) = serde_json::from_str(text) else {
        return Ok(());
    };
    let Some(report) = ApplyReport::from_value(&value) else {
        return Ok(());
    };
    let failed: Vec<String> = report
        .failures()
        .map(|(name, outcome)| format!("{name}: {}", outcome.out))
        .collect();
    if !failed.is_empty() {
        bail!("backend rejected {}", failed.join("; "));
    }
    Ok(())
}
