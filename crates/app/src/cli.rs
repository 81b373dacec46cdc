//! Command line surface
//!
//! One subcommand per console operation.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use offchat_core::{Presence, Role};

/// OffChat admin console - manage accounts and the current session
#[derive(Parser, Debug)]
#[command(name = "offchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "OFFCHAT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// List accounts, optionally filtered by name
    Users {
        #[arg(long)]
        search: Option<String>,
    },

    /// Account counts by status
    Stats,

    /// Show the current session
    Whoami,

    /// Register a new account (needs admin approval)
    Signup { username: String, password: String },

    /// Log in as an approved account
    Login { username: String, password: String },

    /// End the current session
    Logout,

    /// Set presence of the current session
    Presence { presence: Presence },

    /// Set or clear (no argument) the avatar of the logged-in account
    Avatar { url: Option<String> },

    /// Approve a pending account
    Approve { id: String },

    /// Reject a pending account
    Reject { id: String },

    /// Suspend an active account
    Suspend { id: String },

    /// Lift a suspension
    Reinstate { id: String },

    /// Ban an active or suspended account
    Ban { id: String },

    /// Delete an account permanently
    Delete { id: String },

    /// Create an already-approved account
    AddUser {
        username: String,
        password: String,
        #[arg(long, default_value = "user")]
        role: Role,
    },

    /// End an account's session if it is the current one
    ForceLogout { id: String },
}
