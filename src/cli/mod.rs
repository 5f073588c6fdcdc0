//! Command-line interface for dirhub.
//!
//! `serve` is the default; the other commands are maintenance tools that
//! open the same database the server uses.

mod commands;

use clap::{Parser, Subcommand};

/// dirhub - internal tool directory with role-based access control
#[derive(Parser)]
#[command(name = "dirhub")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web server and the maintenance scheduler
    #[command(alias = "daemon")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Create an account without going through the API
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: String,
        /// Admin, Manager or Staff
        #[arg(long, default_value = "Staff")]
        role: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        department: Option<String>,
    },

    /// List all accounts
    #[command(alias = "users")]
    ListUsers,

    /// Issue a password reset token for an account
    IssueResetToken {
        /// Username or email address
        login: String,
    },

    /// Delete used and expired reset tokens now
    PurgeTokens,

    /// Show the most recent activity log entries
    #[command(alias = "log")]
    Activity {
        /// Number of entries to show
        #[arg(long, default_value = "20")]
        limit: u64,
    },
}

pub use commands::*;
