use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use shared::{domain::UploadForm, error::OutcomeSummary};
use tracing::info;
use tracing_subscriber::EnvFilter;
use upload_client::{HttpUploadClient, SubmitEvent, UploadController};

mod config;
mod terminal;

use config::{load_settings, Settings};
use terminal::TerminalView;

#[derive(Parser, Debug)]
#[command(about = "Upload a family spreadsheet to the layout server")]
struct Args {
    /// File to upload.
    #[arg(long)]
    file: PathBuf,
    #[arg(long)]
    server_url: Option<String>,
    /// Form field name the file is sent under.
    #[arg(long)]
    file_field: Option<String>,
    /// Extra form field, `NAME=VALUE`; may be repeated.
    #[arg(long = "field", value_parser = parse_field)]
    fields: Vec<(String, String)>,
    #[arg(long)]
    timeout_seconds: Option<u64>,
    /// Download the generated layout image to this path.
    #[arg(long)]
    save_image: Option<PathBuf>,
    /// Print a JSON summary instead of the rendered result.
    #[arg(long)]
    json: bool,
}

fn parse_field(raw: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("field name is empty in '{raw}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

fn apply_args(mut settings: Settings, args: &Args) -> Settings {
    if let Some(v) = &args.server_url {
        settings.server_url = v.clone();
    }
    if let Some(v) = &args.file_field {
        settings.file_field = v.clone();
    }
    if let Some(v) = args.timeout_seconds {
        settings.timeout_seconds = v;
    }
    settings
}

async fn build_form(args: &Args, file_field: &str) -> Result<UploadForm> {
    let contents = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("failed to read '{}'", args.file.display()))?;
    let filename = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload.bin")
        .to_string();
    let mime_type = mime_guess::from_path(&args.file)
        .first_raw()
        .map(str::to_string);

    let form = UploadForm::new().file(file_field, filename, mime_type, contents);
    Ok(args
        .fields
        .iter()
        .fold(form, |form, (name, value)| form.text(name, value)))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();
    let settings = apply_args(load_settings(), &args);

    let form = build_form(&args, &settings.file_field).await?;
    let client = Arc::new(HttpUploadClient::new(
        &settings.server_url,
        settings.timeout(),
    )?);
    let view = Arc::new(TerminalView::new(args.json));
    let controller = UploadController::new(client.clone(), view);

    let mut event = SubmitEvent::new();
    let outcome = controller.on_submit(&mut event, form).await?;

    let summary = match &outcome {
        Ok(layout) => OutcomeSummary::success(200, &layout.message, &layout.layout_image),
        Err(err) => err.summary(),
    };

    if let (Ok(layout), Some(path)) = (&outcome, &args.save_image) {
        let bytes = client.fetch_layout_image(&layout.layout_image).await?;
        tokio::fs::write(path, &bytes)
            .await
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        info!(path = %path.display(), bytes = bytes.len(), "saved layout image");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    if !summary.outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
