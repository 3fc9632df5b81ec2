//! Command line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// RSS feed aggregator.
///
/// Register a user, add or follow feeds, run `agg` to collect posts and
/// `browse` to read them.
#[derive(Parser, Debug)]
#[command(name = "gator", version, about = "RSS feed aggregator")]
pub struct Cli {
    /// Path to config file (default: $GATOR_CONFIG or ~/.gatorconfig.toml)
    #[arg(long, global = true, env = "GATOR_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Gator subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a user and log in as them
    Register { name: String },

    /// Switch the current user
    Login { name: String },

    /// Delete every user, feed, follow and post
    Reset,

    /// List users
    Users,

    /// Poll feeds forever, one feed per interval (e.g. 30s, 1m, 1h30m)
    Agg { interval: String },

    /// Add a feed and follow it
    #[command(name = "addfeed")]
    AddFeed { name: String, url: String },

    /// List all feeds
    Feeds,

    /// Follow an existing feed by URL
    Follow { url: String },

    /// List the feeds you follow
    Following,

    /// Stop following a feed
    Unfollow { url: String },

    /// Show the newest posts from the feeds you follow
    Browse {
        /// Number of posts to show
        #[arg(default_value_t = 2, value_parser = clap::value_parser!(i64).range(1..))]
        limit: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_register() {
        let cli = Cli::try_parse_from(["gator", "register", "kahya"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Register {
                name: "kahya".to_string()
            }
        );
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_addfeed_with_config() {
        let cli = Cli::try_parse_from([
            "gator",
            "--config",
            "/tmp/gator.toml",
            "addfeed",
            "Hacker News",
            "https://news.ycombinator.com/rss",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/gator.toml")));
        assert_eq!(
            cli.command,
            Command::AddFeed {
                name: "Hacker News".to_string(),
                url: "https://news.ycombinator.com/rss".to_string()
            }
        );
    }

    #[test]
    fn test_parse_browse_default_limit() {
        let cli = Cli::try_parse_from(["gator", "browse"]).unwrap();
        assert_eq!(cli.command, Command::Browse { limit: 2 });
    }

    #[test]
    fn test_parse_browse_rejects_bad_limit() {
        assert!(Cli::try_parse_from(["gator", "browse", "0"]).is_err());
        assert!(Cli::try_parse_from(["gator", "browse", "-3"]).is_err());
        assert!(Cli::try_parse_from(["gator", "browse", "many"]).is_err());
    }

    #[test]
    fn test_parse_agg_requires_interval() {
        assert!(Cli::try_parse_from(["gator", "agg"]).is_err());
        let cli = Cli::try_parse_from(["gator", "agg", "1m"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Agg {
                interval: "1m".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_command() {
        assert!(Cli::try_parse_from(["gator", "dance"]).is_err());
    }
}
