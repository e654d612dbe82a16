//! kubedeck CLI - REST facade over a Kubernetes cluster

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod error;
mod exit_codes;
mod telemetry;

use commands::serve::ServeOptions;
use telemetry::LogFormat;

#[derive(Parser)]
#[command(name = "kubedeck")]
#[command(version)]
#[command(about = "REST facade over a Kubernetes cluster", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log output format
    #[arg(long, global = true, value_enum, env = "KUBEDECK_LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to bind
        #[arg(long, env = "KUBEDECK_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Port to bind (0 picks a free port)
        #[arg(short, long, env = "KUBEDECK_PORT", default_value_t = 8080)]
        port: u16,

        /// Path to the kubeconfig file (defaults to KUBECONFIG, then ~/.kube/config)
        #[arg(long)]
        kubeconfig: Option<PathBuf>,

        /// Seconds to wait for a deleted pod's name to be released
        #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
        settle_timeout_secs: u64,

        /// Milliseconds between reads while waiting for a name to be released
        #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u64).range(1..))]
        settle_interval_ms: u64,

        /// Origin allowed to call the API from a browser
        #[arg(long, env = "KUBEDECK_CORS_ORIGIN", default_value = "http://localhost:3000")]
        cors_origin: String,

        /// Base URL of the OpenAI-compatible completion API
        #[arg(long, env = "KUBEDECK_ASSISTANT_URL", default_value = kubedeck_assist::DEFAULT_BASE_URL)]
        assistant_url: String,

        /// Model used for manifest drafting
        #[arg(long, env = "KUBEDECK_ASSISTANT_MODEL", default_value = kubedeck_assist::DEFAULT_MODEL)]
        assistant_model: String,
    },

    /// Show the kubeconfig context and cluster the server would use
    Context {
        /// Path to the kubeconfig file
        #[arg(long)]
        kubeconfig: Option<PathBuf>,
    },
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> error::Result<()> {
    telemetry::init_tracing(cli.log_format)?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            kubeconfig,
            settle_timeout_secs,
            settle_interval_ms,
            cors_origin,
            assistant_url,
            assistant_model,
        } => commands::serve::run(ServeOptions {
            host,
            port,
            kubeconfig,
            settle_timeout_secs,
            settle_interval_ms,
            cors_origin,
            assistant_url,
            assistant_model,
        }),

        Commands::Context { kubeconfig } => commands::context::run(kubeconfig.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from([
            "kubedeck",
            "serve",
            "--port",
            "9090",
            "--kubeconfig",
            "/tmp/kubeconfig",
            "--settle-timeout-secs",
            "5",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Commands::Serve {
                port,
                kubeconfig,
                settle_timeout_secs,
                ..
            } => {
                assert_eq!(port, 9090);
                assert_eq!(kubeconfig, Some(PathBuf::from("/tmp/kubeconfig")));
                assert_eq!(settle_timeout_secs, 5);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_zero_settle_timeout_rejected() {
        let result = Cli::try_parse_from(["kubedeck", "serve", "--settle-timeout-secs", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_context_command() {
        let cli = Cli::try_parse_from(["kubedeck", "context"]).unwrap();
        assert!(matches!(cli.command, Commands::Context { kubeconfig: None }));
    }
}
