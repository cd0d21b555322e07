//! Clap derive structures for the `shelly-bridge` CLI.
//!
//! Defines the command tree, global flags, and shared argument groups.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use shelly_core::DeviceKind;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// shelly-bridge -- control Shelly relays and RGBW2 controllers
#[derive(Debug, Parser)]
#[command(
    name = "shelly-bridge",
    version,
    about = "Discover, poll, and control Shelly devices on the local network",
    long_about = "Talks to Shelly relay (Shelly 1) and RGBW2 color devices over their\n\
        local HTTP API, finds them via mDNS, and can run as a polling bridge.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "SHELLY_BRIDGE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Per-request timeout in milliseconds (overrides the config file)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// One identifier per line (scripting)
    Plain,
}

/// Device profile for hosts that are not in the config file.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    /// Shelly 1 relay
    Relay,
    /// Shelly RGBW2 in color mode
    Color,
}

impl From<KindArg> for DeviceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Relay => DeviceKind::Relay,
            KindArg::Color => DeviceKind::Color,
        }
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Browse mDNS for Shelly devices
    #[command(alias = "scan")]
    Discover(DiscoverArgs),

    /// Poll a device and show its state
    #[command(alias = "st")]
    Status(DeviceArgs),

    /// Turn a device on
    On(OnArgs),

    /// Turn a device off
    Off(DeviceArgs),

    /// Flip a device's output
    Toggle(DeviceArgs),

    /// Set color channels and brightness (RGBW2 only)
    Color(ColorArgs),

    /// Select a built-in light effect (RGBW2 only)
    Effect(EffectArgs),

    /// Set the transition time (RGBW2 only)
    Transition(TransitionArgs),

    /// Reboot a device
    Reboot(DeviceArgs),

    /// Show device identification (`/shelly`)
    Info(DeviceArgs),

    /// Run the bridge: poll every configured device until interrupted
    Run(RunArgs),

    /// Inspect configuration
    #[command(alias = "cfg")]
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DeviceArgs {
    /// Configured device name or id, or a raw host (`ip` or `ip:port`)
    pub device: String,

    /// Profile to use when DEVICE is a raw host
    #[arg(long, short = 'k')]
    pub kind: Option<KindArg>,
}

// ── Per-command Arguments ────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Scan cycles
    #[arg(long)]
    pub cycles: Option<u32>,

    /// Pause between cycles in milliseconds
    #[arg(long)]
    pub wait_ms: Option<u64>,

    /// DNS-SD service type to browse
    #[arg(long)]
    pub service_type: Option<String>,
}

#[derive(Debug, Args)]
pub struct OnArgs {
    #[command(flatten)]
    pub target: DeviceArgs,

    /// Flip back off after this many seconds
    #[arg(long, short = 't')]
    pub timer: Option<u32>,
}

#[derive(Debug, Args)]
pub struct ColorArgs {
    #[command(flatten)]
    pub target: DeviceArgs,

    /// Red channel (0-255)
    #[arg(long, short = 'r')]
    pub red: Option<u8>,

    /// Green channel (0-255)
    #[arg(long, short = 'g')]
    pub green: Option<u8>,

    /// Blue channel (0-255)
    #[arg(long, short = 'b')]
    pub blue: Option<u8>,

    /// White channel (0-255)
    #[arg(long, short = 'w')]
    pub white: Option<u8>,

    /// Brightness (0-100)
    #[arg(long)]
    pub brightness: Option<u8>,

    /// Also switch the channel on
    #[arg(long, conflicts_with = "off")]
    pub on: bool,

    /// Also switch the channel off
    #[arg(long)]
    pub off: bool,

    /// Flip back after this many seconds
    #[arg(long, short = 't')]
    pub timer: Option<u32>,
}

#[derive(Debug, Args)]
pub struct EffectArgs {
    #[command(flatten)]
    pub target: DeviceArgs,

    /// Effect index: 0 off, 1 meteor shower, 2 gradual change, 3 flash
    #[arg(allow_negative_numbers = true)]
    pub effect: i64,
}

#[derive(Debug, Args)]
pub struct TransitionArgs {
    #[command(flatten)]
    pub target: DeviceArgs,

    /// Transition in milliseconds (0-5000)
    #[arg(allow_negative_numbers = true)]
    pub milliseconds: i64,

    /// Apply to the next change only instead of saving the default
    #[arg(long)]
    pub one_shot: bool,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Seconds between poll rounds (overrides the config file)
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Enable periodic mDNS discovery regardless of the config file
    #[arg(long)]
    pub discover: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,
    /// Print the effective configuration (file plus environment)
    Show,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
