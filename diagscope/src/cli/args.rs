//! CLI argument definitions

use clap::{ArgGroup, Parser};
use std::path::PathBuf;

use crate::store::DEFAULT_STATE_FILE;

/// Parse a bus address written in hex, with or without a `0x` prefix
///
/// # Errors
/// Returns a message for non-hex input or addresses above `0x7FF`
pub fn parse_hex_address(s: &str) -> Result<u16, String> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    let address =
        u16::from_str_radix(digits, 16).map_err(|_| format!("'{s}' is not a hex address"))?;
    if address > 0x7FF {
        return Err(format!("'{s}' is outside the 11-bit address range"));
    }
    Ok(address)
}

#[derive(Parser, Debug)]
#[command(
    name = "diagscope",
    version,
    about = "Live diagnostics dashboard for a request/response vehicle bus",
    group(ArgGroup::new("bus").required(true).args(["simulate", "replay"])),
    after_help = "\
EXAMPLES:
    diagscope --simulate                          Simulated ECU, default state file
    diagscope --replay capture.log                Replay a recorded frame log
    diagscope --simulate --log-file ds.log -vv    Trace logging to a file

KEYS:
    View:       c configure, Up/Down scroll, q quit
    Configure:  Up/Down move, Space toggle, a all, n none, Enter/c/Esc save"
)]
pub struct Args {
    /// Use the built-in simulated ECU
    #[arg(long)]
    pub simulate: bool,

    /// Replay frames from a text log (one `7E8 04 41 0C 1A F8` frame per line)
    #[arg(long, value_name = "FILE")]
    pub replay: Option<PathBuf>,

    /// File the active signal set is loaded from and saved to
    #[arg(long, value_name = "FILE", default_value = DEFAULT_STATE_FILE)]
    pub state_file: PathBuf,

    /// Longest wait for a key press per loop iteration (ms)
    #[arg(long, value_name = "MS", default_value = "200",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: u64,

    /// Minimum interval between polling passes (ms)
    #[arg(long, value_name = "MS", default_value = "200")]
    pub poll_ms: u64,

    /// Node the tester-present keep-alive and session request go to
    #[arg(long, value_name = "HEX", default_value = "7E0", value_parser = parse_hex_address)]
    pub keepalive_node: u16,

    /// Do not request the extended diagnostic session at startup
    #[arg(long)]
    pub no_session: bool,

    /// Write logs to this file (the terminal belongs to the dashboard)
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
