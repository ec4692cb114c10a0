//! Logging with colored module prefixes.
//!
//! Provides the `log!` macro for formatted terminal output. Each message
//! carries a bracketed module prefix so interleaved parallel output stays
//! attributable.
//!
//! # Example
//!
//! ```ignore
//! log!("build"; "rendered {} pages", count);
//! ```

use colored::{ColoredString, Colorize};
use std::io::{Write, stderr};

/// Log a message with a colored module prefix.
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Pick a stable color for a module name.
fn colorize_prefix(module: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module {
        "error" => prefix.as_str().red().bold(),
        "warn" => prefix.as_str().yellow().bold(),
        "build" | "render" => prefix.as_str().green(),
        "watch" => prefix.as_str().cyan(),
        "feed" | "image" | "nav" => prefix.as_str().magenta(),
        "assets" | "copy" => prefix.as_str().blue(),
        _ => prefix.as_str().normal(),
    }
}

/// Write a prefixed log line to stderr.
///
/// Stderr keeps pipeline chatter away from stdout; write failures are
/// ignored since there is nothing useful to do about them.
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module);
    let mut out = stderr().lock();
    let _ = writeln!(out, "{prefix} {message}");
}
