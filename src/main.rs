use anyhow::{bail, Context, Result};
use clap::Parser;
use optimg::config::Config;
use optimg::image_optimizer::{CancelSignal, ImageOptimizer, ImageQuery};
use std::path::PathBuf;

/// Optimg - on-demand image optimizer
///
/// Runs a single `?url=...&w=...&q=...` request through the optimizer and
/// its on-disk cache.
#[derive(Parser, Debug)]
#[command(name = "optimg")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file; built-in defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Source image path, e.g. /uploads/photo.png
    #[arg(long)]
    url: String,

    /// Output width
    #[arg(short = 'w', long = "width")]
    width: String,

    /// Output quality
    #[arg(short = 'q', long = "quality", default_value = "75")]
    quality: String,

    /// Accept header used for format negotiation
    #[arg(long)]
    accept: Option<String>,

    /// Write the response body to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Test configuration and exit
    #[arg(long)]
    test: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    config.validate().map_err(anyhow::Error::msg)?;

    optimg::logging::init_subscriber(config.logging.format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging subsystem: {}", e))?;

    tracing::info!(
        cache_dir = %config.cache.dir,
        upstream_root = %config.upstream.root,
        formats = ?config.image.formats,
        "Configuration loaded successfully"
    );

    if args.test {
        println!("configuration OK");
        return Ok(());
    }

    let optimizer = ImageOptimizer::from_config(&config);
    let removed = optimizer.cache().remove_temp_files().await;
    if removed > 0 {
        tracing::info!(removed, "Removed interrupted cache writes");
    }
    let query = ImageQuery::new(&args.url, &args.width, &args.quality);

    let (cancel_tx, cancel) = CancelSignal::new();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let result = optimizer
        .serve(&query, args.accept.as_deref(), &cancel)
        .await;
    ctrl_c.abort();

    let served = match result {
        Ok(served) => served,
        Err(e) => {
            eprintln!("{} {}", e.to_http_status(), e.to_json_body());
            bail!(e);
        }
    };

    println!("200 OK");
    for (name, value) in served.headers() {
        println!("{}: {}", name, value);
    }

    if let Some(output) = &args.output {
        tokio::fs::write(output, &served.bytes)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;
        tracing::info!(output = %output.display(), size = served.bytes.len(), "Wrote image");
    }

    Ok(())
}
