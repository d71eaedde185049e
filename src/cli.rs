//! Command-line interface.
//!
//! With no subcommand the binary runs the HTTP server. `issue-admin-key`
//! provisions a key carrying reserved permissions, which the HTTP issuance
//! endpoint only grants to callers that already hold them.

use clap::{Parser, Subcommand};

use crate::auth::permissions::SUPERUSER_PERMISSION;

/// API key issuance and authorization service
#[derive(Debug, Parser)]
#[command(name = "api_key_service")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Issue a privileged key and print its secret once
    IssueAdminKey {
        /// Display name of the key
        #[arg(long, default_value = "bootstrap admin")]
        name: String,

        /// Owning user, which must exist in the directory
        #[arg(long)]
        user_id: Option<String>,

        /// Permission to grant; repeat for several
        #[arg(long = "permission", default_value = SUPERUSER_PERMISSION)]
        permissions: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["api_key_service"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn issue_admin_key_defaults_to_superuser() {
        let cli = Cli::try_parse_from(["api_key_service", "issue-admin-key"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::IssueAdminKey {
                name: "bootstrap admin".into(),
                user_id: None,
                permissions: vec!["super:admin".into()],
            })
        );
    }

    #[test]
    fn issue_admin_key_accepts_repeated_permissions() {
        let cli = Cli::try_parse_from([
            "api_key_service",
            "issue-admin-key",
            "--name",
            "ops",
            "--user-id",
            "u1",
            "--permission",
            "admin:keys",
            "--permission",
            "read:admin",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::IssueAdminKey {
                name: "ops".into(),
                user_id: Some("u1".into()),
                permissions: vec!["admin:keys".into(), "read:admin".into()],
            })
        );
    }
}
