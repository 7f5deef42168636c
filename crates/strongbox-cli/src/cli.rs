use clap::{Parser, Subcommand};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "strongbox",
    about = "Encrypted key-value store for local application state",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    #[command(flatten)]
    Store(StoreCommand),
    /// Run a round-trip check against the configured store.
    Health,
    /// Print version and exit.
    Version,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Commands that operate on the encrypted store.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum StoreCommand {
    /// Encrypt and store a JSON value under a key.
    Set {
        key: String,
        /// JSON text, e.g. '{"balance": "1.5"}' or '"plain string"'.
        value: String,
    },
    /// Print the decrypted value for a key.
    Get { key: String },
    /// Report whether an entry exists (without decrypting it).
    Has { key: String },
    /// Delete an entry.
    Remove { key: String },
    /// List stored keys.
    Keys,
    /// Delete every encrypted entry; the data key is kept.
    Clear,
    /// Encrypt a legacy plaintext record stored under the bare key.
    Migrate { key: String },
    /// Inspect the saved application state.
    #[command(subcommand)]
    State(StateCommand),
    /// Discard the data key and every entry encrypted under it.
    ResetKey {
        /// Required confirmation; the operation is irreversible.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum StateCommand {
    /// Print the saved state, migrating a legacy plaintext copy first.
    Show,
    /// Delete the saved state.
    Clear,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set_with_json_value() {
        let cli = Cli::try_parse_from(["strongbox", "set", "balance", r#"{"eth":"1.5"}"#])
            .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Command::Store(StoreCommand::Set {
                key: "balance".into(),
                value: r#"{"eth":"1.5"}"#.into(),
            })
        );
    }

    #[test]
    fn requires_a_subcommand() {
        assert!(Cli::try_parse_from(["strongbox"]).is_err());
    }

    #[test]
    fn parses_health_subcommand() {
        let cli = Cli::try_parse_from(["strongbox", "health"]).expect("parse should succeed");
        assert_eq!(cli.command, Command::Health);
    }

    #[test]
    fn parses_state_show() {
        let cli = Cli::try_parse_from(["strongbox", "state", "show"]).expect("parse");
        assert_eq!(
            cli.command,
            Command::Store(StoreCommand::State(StateCommand::Show))
        );
    }

    #[test]
    fn reset_key_defaults_to_unconfirmed() {
        let cli = Cli::try_parse_from(["strongbox", "reset-key"]).expect("parse");
        assert_eq!(
            cli.command,
            Command::Store(StoreCommand::ResetKey { yes: false })
        );
        let cli = Cli::try_parse_from(["strongbox", "reset-key", "--yes"]).expect("parse");
        assert_eq!(
            cli.command,
            Command::Store(StoreCommand::ResetKey { yes: true })
        );
    }

    #[test]
    fn parses_config_init_subcommand() {
        let cli =
            Cli::try_parse_from(["strongbox", "config", "init"]).expect("parse should succeed");
        assert_eq!(cli.command, Command::Config(ConfigCommand::Init));
    }
}
