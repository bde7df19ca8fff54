//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;

/// Manual smoke test for an LSP endpoint
///
/// Connects to a language server over TCP, performs the initialize
/// handshake, opens the given file, requests completions at a position and
/// prints the results.
#[derive(Debug, Parser)]
#[command(name = "lsprobe")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Source file to open on the server
    pub file: PathBuf,

    /// Line of the completion position (0-based)
    #[arg(short, long, default_value_t = 0)]
    pub line: u32,

    /// Character of the completion position (0-based)
    #[arg(short = 'c', long, default_value_t = 0)]
    pub column: u32,

    /// Text inserted at the position via didChange before completing
    #[arg(long, value_name = "TEXT")]
    pub insert: Option<String>,

    /// Server host (overrides configuration)
    #[arg(long, env = "LSPROBE_HOST")]
    pub host: Option<String>,

    /// Server TCP port (overrides configuration)
    #[arg(short, long, env = "LSPROBE_PORT")]
    pub port: Option<u16>,

    /// Path to configuration file
    ///
    /// If not specified, searches for lsprobe.toml in:
    /// 1. $LSPROBE_CONFIG environment variable
    /// 2. Current directory
    /// 3. ~/.config/lsprobe/lsprobe.toml
    #[arg(long, value_name = "FILE", env = "LSPROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Per-request deadline in seconds (overrides configuration)
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Language ID reported in didOpen; guessed from the extension if unset
    #[arg(long)]
    pub language: Option<String>,

    /// Logging level
    ///
    /// Valid values: trace, debug, info, warn, error, off
    #[arg(long, default_value = "info", env = "LSPROBE_LOG")]
    pub log_level: String,
}

/// Map a file extension to the LSP language identifier.
#[must_use]
pub fn language_id_for(path: &std::path::Path) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some("rs") => "rust",
        Some("kt" | "kts") => "kotlin",
        Some("py") => "python",
        Some("ts") => "typescript",
        Some("js") => "javascript",
        Some("go") => "go",
        Some("java") => "java",
        Some("c" | "h") => "c",
        Some("cpp" | "cc" | "hpp") => "cpp",
        _ => "plaintext",
    }
    .to_string()
}
