mod resolve;
mod serve;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use symserve_core::ServerConfig;

#[derive(Parser)]
#[command(
    name = "symserve",
    version,
    about = "Authorizing symbol server for native debuggers",
    long_about = "Serves debug-symbol files to debuggers speaking the symbol-server HTTP \
                  convention. Files are located through a metadata index, and each download \
                  is checked against the permissions of the project owning the build."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP symbol server
    Serve {
        /// JSON config file; defaults apply when omitted
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Address to listen on, overriding the config
        #[arg(short, long, value_name = "ADDR")]
        listen: Option<String>,
    },
    /// Resolve a request path against the configured storage, without authorization
    #[command(
        long_about = "Runs the resolver offline and prints what a request for PATH would hit: \
                      the index probe, a miss with its reason, or the build and artifact found."
    )]
    Resolve {
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Request path, e.g. /app/symbols/foo.pdb/<signature>/foo.pdb
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// Print the digest to store as password_sha256 in the users file
    #[command(
        long_about = "Prints the SHA-256 hex digest of PASSWORD for the password_sha256 field of \
                      the users file. The digest is unsalted and fast to compute, so anyone who \
                      can read the users file can brute-force weak passwords: keep the file \
                      private and use long random passwords."
    )]
    HashPassword {
        #[arg(value_name = "PASSWORD")]
        password: String,
    },
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => {
            let mut config = ServerConfig::load(config.as_deref())?;
            if let Some(listen) = listen {
                config.listen = listen;
            }
            let _guard = symserve_runtime::init_logging(&config, "server", true);
            serve::run(config)
        }
        Commands::Resolve { config, path } => {
            let config = ServerConfig::load(config.as_deref())?;
            let _guard = symserve_runtime::init_logging(&config, "cli", false);
            resolve::run(&config, &path)
        }
        Commands::HashPassword { password } => {
            println!("{}", symserve_core::auth::hash_password(&password));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from(["symserve", "serve", "--listen", "0.0.0.0:9000"]).unwrap();
        match cli.command {
            Commands::Serve { config, listen } => {
                assert!(config.is_none());
                assert_eq!(listen.as_deref(), Some("0.0.0.0:9000"));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_resolve() {
        let cli =
            Cli::try_parse_from(["symserve", "resolve", "-c", "conf.json", "/app/symbols/"]).unwrap();
        match cli.command {
            Commands::Resolve { config, path } => {
                assert_eq!(config, Some(PathBuf::from("conf.json")));
                assert_eq!(path, "/app/symbols/");
            }
            _ => panic!("expected resolve"),
        }
    }

    #[test]
    fn test_hash_password_help_warns_about_unsalted_digest() {
        use clap::CommandFactory;
        let command = Cli::command();
        let hash = command
            .get_subcommands()
            .find(|sub| sub.get_name() == "hash-password")
            .unwrap();
        let help = hash.get_long_about().unwrap().to_string();
        assert!(help.contains("unsalted"));
    }

    #[test]
    fn test_hash_password_requires_argument() {
        assert!(Cli::try_parse_from(["symserve", "hash-password"]).is_err());
    }
}
