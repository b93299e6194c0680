mod cli;

use imageforged::{config, conversion, server};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // CLI flags win over the config file
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting Imageforged server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "imageforged=trace,imageforged_common=trace,tower_http=debug".to_string()
        } else {
            "imageforged=debug,imageforged_common=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Convert {
            files,
            format,
            output_dir,
        } => convert_files(&files, format, &output_dir, cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("imageforged {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn convert_files(
    files: &[PathBuf],
    format: Option<String>,
    output_dir: &Path,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let requested = format.unwrap_or_else(|| config.conversion.default_format.clone());
    let spec = conversion::resolve_format(&requested)
        .with_context(|| format!("Cannot convert to '{}'", requested))?;
    let converter = conversion::Converter::from_config(&config.conversion);

    let mut failed = 0usize;
    for input in files {
        match conversion::convert_file(&converter, input, spec.format, output_dir) {
            Ok(written) => println!(
                "✓ {} → {} ({}x{}, {} bytes)",
                input.display(),
                written.path.display(),
                written.width,
                written.height,
                written.bytes
            ),
            Err(e) => {
                failed += 1;
                println!("✗ {}: {:#}", input.display(), e);
            }
        }
    }

    println!(
        "\nConverted {} of {} file(s) to {}",
        files.len() - failed,
        files.len(),
        spec.canonical_name
    );

    if failed > 0 {
        anyhow::bail!("{} file(s) failed to convert", failed);
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Max upload: {} bytes", config.server.max_upload_bytes);
            println!(
                "  Store: {} batches, {}s TTL",
                config.store.max_batches, config.store.batch_ttl_secs
            );
            println!("  Default format: {}", config.conversion.default_format);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Default format: {}", config.conversion.default_format);
        }
    }

    Ok(())
}
