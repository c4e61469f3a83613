//! Logging utilities for CLI output

/// Log level for CLI output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Suppress all output
    Quiet,
    /// Normal output level
    Normal,
    /// Verbose output with additional details
    Verbose,
}

/// Log a message if the current level permits it.
///
/// Normal messages show unless quiet; verbose messages show only at
/// verbose level.
pub fn log(level: LogLevel, required: LogLevel, msg: &str) {
    if enabled(level, required) {
        println!("{msg}");
    }
}

fn enabled(level: LogLevel, required: LogLevel) -> bool {
    match required {
        LogLevel::Quiet => false,
        LogLevel::Normal => level != LogLevel::Quiet,
        LogLevel::Verbose => level == LogLevel::Verbose,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_matrix() {
        assert!(enabled(LogLevel::Normal, LogLevel::Normal));
        assert!(enabled(LogLevel::Verbose, LogLevel::Normal));
        assert!(enabled(LogLevel::Verbose, LogLevel::Verbose));
        assert!(!enabled(LogLevel::Normal, LogLevel::Verbose));
        assert!(!enabled(LogLevel::Quiet, LogLevel::Normal));
        assert!(!enabled(LogLevel::Quiet, LogLevel::Verbose));
    }
}
