mod cli;

use std::path::Path;

use anistream::decoder::{CipherTable, Decoder};
use anistream::server;
use anistream_core::config::Config;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

async fn start_server(host: Option<String>, port: Option<u16>, config_path: Option<&Path>) -> Result<()> {
    let mut config = Config::load_or_default(config_path)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting anistream");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );
    tracing::debug!(
        catalog = %config.upstream.api_url,
        trusted = ?config.resolver.trusted_sources,
        "Upstream settings"
    );

    server::start(config).await?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "anistream=trace,anistream_core=trace,tower_http=debug".to_string()
        } else {
            "anistream=debug,anistream_core=debug,tower_http=info".to_string()
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
        Commands::Decode { token, thumbnail } => decode_token(&token, thumbnail, cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("anistream {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn decode_token(token: &str, thumbnail: bool, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    let decoder = Decoder::new(CipherTable::catalog(), config.upstream.media_host);
    let decoded = if thumbnail {
        decoder.decode_thumbnail(token)
    } else {
        decoder.decode(token)
    };
    println!("{decoded}");
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            Config::load(p)?
        }
        None => {
            println!("No config file specified, using default lookup");
            Config::load_or_default(None)?
        }
    };

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ Configuration is valid");
    } else {
        println!("Configuration loaded with {} warning(s):", warnings.len());
        for warning in &warnings {
            println!("  ! {warning}");
        }
    }
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Catalog API: {}", config.upstream.api_url);
    println!("  Trusted sources: {}", config.resolver.trusted_sources.join(", "));
    println!("  Skip-time service: {}", config.skip.base_url);

    Ok(())
}
