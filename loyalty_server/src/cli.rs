use std::{env, env::VarError};

use clap::Parser;

/// Command line flags. Every flag has an environment variable counterpart, and the environment variable wins when both
/// are given.
#[derive(Debug, Clone, Default, Parser)]
#[command(version, about = "Loyalty points service", long_about = None)]
pub struct Cli {
    /// Address and port to listen on, e.g. `localhost:8080` [env: RUN_ADDRESS]
    #[arg(short = 'a', long = "address")]
    pub run_address: Option<String>,
    /// Database connection string, e.g. `sqlite://data/loyalty.db` [env: DATABASE_URI]
    #[arg(short = 'd', long = "database")]
    pub database_uri: Option<String>,
    /// Base address of the accrual service [env: ACCRUAL_SYSTEM_ADDRESS]
    #[arg(short = 'r', long = "accrual")]
    pub accrual_address: Option<String>,
    /// Print the current (non-secret) configuration environment and exit
    #[arg(long)]
    pub show_env: bool,
}

pub fn handle_command_line_args() -> Cli {
    let cli = Cli::parse();
    if cli.show_env {
        display_envs();
        std::process::exit(0);
    }
    cli
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 8] = [
        "RUST_LOG",
        "RUN_ADDRESS",
        "DATABASE_URI",
        "ACCRUAL_SYSTEM_ADDRESS",
        "CANCEL_INTERVAL",
        "TOKEN_DURATION",
        "ACCRUAL_RETRY_INTERVAL",
        "ACCRUAL_DEFAULT_RETRY_AFTER",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn short_flags() {
        let args = ["loyalty_server", "-a", "0.0.0.0:9000", "-d", "sqlite://x.db", "-r", "accrual:8081"];
        let cli = Cli::parse_from(args);
        assert_eq!(cli.run_address.as_deref(), Some("0.0.0.0:9000"));
        assert_eq!(cli.database_uri.as_deref(), Some("sqlite://x.db"));
        assert_eq!(cli.accrual_address.as_deref(), Some("accrual:8081"));
        assert!(!cli.show_env);
    }

    #[test]
    fn flags_are_optional() {
        let cli = Cli::parse_from(["loyalty_server"]);
        assert!(cli.run_address.is_none());
        assert!(cli.database_uri.is_none());
        assert!(cli.accrual_address.is_none());
    }
}
