mod cli;
mod commands;
mod crash_report;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use carelink_config::CareConfig;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::cli::Command;

const DEFAULT_LOG_DIRECTIVE: &str = "carelink=info";

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let path = crash_report::write_crash_report(info);

        eprintln!("\n--- CareLink crashed ---");
        if let Some(p) = &path {
            eprintln!("Crash report written to: {}", p.display());
        }
        eprintln!("------------------------\n");

        default_hook(info);
    }));
}

/// Load environment variables from a .env file (KEY=VALUE lines).
fn load_dotenv() {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let candidates = [
        PathBuf::from(".env"),
        // Workspace root, two levels up from crates/carelink-app/
        manifest_dir.join("..").join("..").join(".env"),
    ];

    for path in &candidates {
        if let Ok(contents) = std::fs::read_to_string(path) {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    let value = value.trim().trim_matches('"').trim_matches('\'');
                    if std::env::var(key).is_err() {
                        std::env::set_var(key, value);
                    }
                }
            }
            return;
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> (CareConfig, Option<String>) {
    let loaded = match path {
        Some(path) => carelink_config::load_from_path(path),
        None => carelink_config::load_config(),
    };
    match loaded {
        Ok(config) => (config, None),
        Err(e) => (CareConfig::default(), Some(e.to_string())),
    }
}

fn init_logging(directive: &str) {
    let directive: Result<Directive, _> = directive
        .parse()
        .or_else(|_| DEFAULT_LOG_DIRECTIVE.parse());
    let filter = match directive {
        Ok(d) => EnvFilter::from_default_env().add_directive(d),
        Err(_) => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    load_dotenv();
    install_panic_hook();

    let args = cli::parse();

    // Config first so its [logging] level can seed the filter.
    let (mut config, config_error) = load_config(args.config.as_ref());

    let directive = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    init_logging(&directive);

    tracing::info!("CareLink v{} starting...", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &args.config {
        tracing::info!(path = %path.display(), "using config override");
    }
    if let Some(e) = config_error {
        tracing::warn!(error = %e, "config load failed, using defaults");
    }

    if config.voice.transcription_api_key.is_none() {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            tracing::debug!("transcription key taken from OPENAI_API_KEY");
            config.voice.transcription_api_key = Some(key);
        }
    }

    if args.print_config {
        println!("{}", carelink_config::config_to_json(&config));
        return ExitCode::SUCCESS;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    let command = args.command.unwrap_or(Command::Chat);
    match runtime.block_on(commands::run(command, config)) {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
