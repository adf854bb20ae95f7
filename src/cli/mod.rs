//! Command-line interface definitions for the `dropwarden` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{ArgAction, ArgGroup, Parser, ValueEnum};

/// Top-level CLI for the `dropwarden` binary.
#[derive(Debug, Parser)]
#[command(
    name = "dropwarden",
    about = "Reconcile a DigitalOcean droplet to a desired state",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Create, start, or destroy a droplet.
    #[command(name = "droplet", about = "Create, start, or destroy a droplet")]
    Droplet(DropletCommand),
}

/// Desired droplet state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum StateArg {
    /// Droplet exists and is running with an address.
    #[value(alias = "active")]
    Present,
    /// No matching droplet exists.
    #[value(alias = "deleted")]
    Absent,
}

/// Arguments for the `dropwarden droplet` subcommand.
#[derive(Debug, Parser)]
#[command(group(ArgGroup::new("target").args(["id", "name"]).required(true).multiple(true)))]
pub(crate) struct DropletCommand {
    /// Desired state of the droplet.
    #[arg(long, value_enum, default_value_t = StateArg::Present)]
    pub(crate) state: StateArg,
    /// Provider identifier of an existing droplet.
    #[arg(long)]
    pub(crate) id: Option<u64>,
    /// Droplet name, used when creating and, with --unique-name, for lookup.
    #[arg(long)]
    pub(crate) name: Option<String>,
    /// Treat the name as unique and reuse a droplet that already carries it.
    #[arg(long)]
    pub(crate) unique_name: bool,
    /// Size identifier for a new droplet.
    #[arg(long, value_name = "ID", requires_all = ["image_id", "region_id"])]
    pub(crate) size_id: Option<u64>,
    /// Image identifier for a new droplet.
    #[arg(long, value_name = "ID", requires_all = ["size_id", "region_id"])]
    pub(crate) image_id: Option<u64>,
    /// Region identifier for a new droplet.
    #[arg(long, value_name = "ID", requires_all = ["size_id", "image_id"])]
    pub(crate) region_id: Option<u64>,
    /// SSH key identifiers to install on a new droplet (comma separated).
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub(crate) ssh_key_ids: Vec<u64>,
    /// Boot a new droplet with virtio drivers.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub(crate) virtio: bool,
    /// Attach a private network interface to a new droplet.
    #[arg(long)]
    pub(crate) private_networking: bool,
    /// Enable backups on a new droplet.
    #[arg(long)]
    pub(crate) backups_enabled: bool,
    /// Wait until the droplet runs with an address.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub(crate) wait: bool,
    /// Seconds to wait before giving up.
    #[arg(long, value_name = "SECONDS", default_value_t = 300)]
    pub(crate) wait_timeout: u64,
    /// API client identifier; overrides DO_CLIENT_ID.
    #[arg(long)]
    pub(crate) client_id: Option<String>,
    /// API key; overrides DO_API_KEY.
    #[arg(long)]
    pub(crate) api_key: Option<String>,
}
