mod run;

use {
    crate::{config::LogLevel, vsync_source::VsyncSourceKind},
    clap::{Args, Parser, Subcommand},
    std::path::PathBuf,
};

/// Frame synchronization core of an embedded window manager.
#[derive(Parser, Debug)]
#[command(version, about)]
struct WmSync {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// The log level. Overrides the config file.
    #[arg(value_enum, long, global = true)]
    pub log_level: Option<LogLevel>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Run the compositor core against a headless display.
    Run(RunArgs),
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// A JSON config file.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Log one line per finished frame.
    #[arg(long)]
    pub trace_frames: bool,
    /// Where vsync ticks come from.
    #[arg(value_enum, long)]
    pub vsync_source: Option<VsyncSourceKind>,
    /// The refresh period of the headless display in milliseconds.
    #[arg(long)]
    pub refresh_period_ms: Option<u64>,
    /// The number of frames to produce before exiting.
    #[arg(long, default_value_t = 120)]
    pub frames: u64,
}

pub fn main() {
    let cli = WmSync::parse();
    match cli.command {
        Cmd::Run(a) => run::main(cli.global, a),
    }
}
