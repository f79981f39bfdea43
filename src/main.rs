//! CLI entry point for the EDL downloader.

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use edl_downloader_core::{
    Config, DownloadRequest, DownloadResponse, EdlClient, generate_output_filename,
};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

/// Filename used when none can be derived from the URL.
const FALLBACK_FILENAME: &str = "download";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(url = %args.url, output = ?args.output, "CLI arguments parsed");

    let config = build_config(&args)?;
    let client = EdlClient::new(config).context("failed to create HTTP client")?;
    let request = build_request(&args);
    let output = output_path(&args.url, args.output.as_deref());

    let response = download_to_path(&client, &request, &output).await?;

    info!(
        status = response.status,
        bytes = response.bytes_written,
        path = %output.display(),
        "Download complete"
    );
    Ok(())
}

fn build_config(args: &Args) -> Result<Config> {
    let max_retries = NonZeroU32::new(u32::from(args.max_retries))
        .context("--max-retries must be at least 1")?;
    let mut config = Config::new(&args.edl_url, &args.client_id, &args.client_secret)
        .context("invalid identity provider configuration")?
        .with_fallback_authn(args.fallback_authn)
        .with_max_retries(max_retries);
    if let Some(user_agent) = &args.base_user_agent {
        config = config.with_user_agent(user_agent);
    }
    if let Some(app_name) = &args.app_name {
        config = config.with_app_name(app_name);
    }
    if let Some(local_hostname) = &args.local_hostname {
        config = config.with_local_hostname(local_hostname);
    }
    Ok(config)
}

fn build_request(args: &Args) -> DownloadRequest {
    let mut request = DownloadRequest::new(&args.url)
        .with_optional_bearer_token(args.token.clone());
    if !args.data.is_empty() {
        request = request.with_form(args.data.iter().cloned());
    }
    if let Some(user_agent) = &args.user_agent {
        request = request.with_user_agent(user_agent);
    }
    request
}

/// Resolves the destination: an explicit file, or a generated name inside a directory.
fn output_path(url: &str, output: Option<&Path>) -> PathBuf {
    let generated = || {
        let name = generate_output_filename(url, None, &[], false, false);
        if name.is_empty() {
            FALLBACK_FILENAME.to_string()
        } else {
            name
        }
    };
    match output {
        Some(path) if path.is_dir() => path.join(generated()),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(generated()),
    }
}

/// Downloads into `path`, removing the partial file if anything goes wrong.
async fn download_to_path(
    client: &EdlClient,
    request: &DownloadRequest,
    path: &Path,
) -> Result<DownloadResponse> {
    let file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    let outcome = write_download(client, request, &mut writer).await;

    if outcome.is_err() {
        drop(writer);
        if let Err(error) = tokio::fs::remove_file(path).await {
            warn!(path = %path.display(), %error, "failed to remove partial download");
        }
    }
    outcome
}

async fn write_download(
    client: &EdlClient,
    request: &DownloadRequest,
    writer: &mut BufWriter<tokio::fs::File>,
) -> Result<DownloadResponse> {
    let response = client.download(request, writer).await?;
    writer.flush().await?;
    if !response.is_success() {
        bail!(
            "server answered HTTP {} for {} without a payload",
            response.status,
            response.url
        );
    }
    Ok(response)
}
