use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "bridge-server", version, about = "zkEVM bridge tracker service")]
pub struct Cli {
    /// TOML config, used when the environment does not provide one.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Accounts to keep a live bridge list for.
    #[arg(long, value_delimiter = ',')]
    pub watch: Vec<String>,

    /// Number of bridges each watcher keeps.
    #[arg(long, default_value_t = 25)]
    pub watch_quantity: u64,

    #[arg(long, env = "HTTP_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "HTTP_PORT", default_value_t = 8000)]
    pub port: u16,

    /// JSON token list to seed the token registry with.
    #[arg(long)]
    pub token_list: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["bridge-server"]);
        assert!(cli.config.is_none());
        assert!(cli.watch.is_empty());
        assert_eq!(cli.watch_quantity, 25);
    }

    #[test]
    fn test_watch_list_is_comma_separated() {
        let cli = Cli::parse_from([
            "bridge-server",
            "--config",
            "bridge.toml",
            "--watch",
            "0xaa,0xbb",
            "--watch",
            "0xcc",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("bridge.toml")));
        assert_eq!(cli.watch, vec!["0xaa", "0xbb", "0xcc"]);
    }
}
