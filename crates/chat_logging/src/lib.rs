#![deny(missing_docs)]
//! Shared logging utilities for the chat relay workspace.
//!
//! This crate provides the `chat_*` logging macros used by the relay, the
//! client engine and the front end, plus a minimal test initializer for the
//! global logger.

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! chat_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! chat_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! chat_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! chat_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! chat_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Maps a `-v` count from the command line to a level filter.
///
/// Zero means `Info`; each extra flag lowers the threshold by one level.
pub fn level_for_verbosity(verbosity: u8) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        workspace_config(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

/// Logger config that only passes records from `chat_*` crates, so HTTP and
/// TLS dependencies do not flood the output.
pub fn workspace_config() -> simplelog::Config {
    simplelog::ConfigBuilder::new()
        .add_filter_allow_str("chat_")
        .build()
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    use log::{Level, LevelFilter, Log, Record};
    use simplelog::WriteLogger;

    use super::{level_for_verbosity, workspace_config};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn workspace_config_drops_dependency_records() {
        let buf = SharedBuf::default();
        let logger = WriteLogger::new(LevelFilter::Debug, workspace_config(), buf.clone());

        logger.log(
            &Record::builder()
                .level(Level::Debug)
                .target("hyper_util::client")
                .args(format_args!("connection noise"))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(Level::Debug)
                .target("chat_engine::relay")
                .args(format_args!("relay start"))
                .build(),
        );

        let written = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(written.contains("relay start"));
        assert!(!written.contains("connection noise"));
    }

    #[test]
    fn verbosity_lowers_threshold() {
        assert_eq!(level_for_verbosity(0), log::LevelFilter::Info);
        assert_eq!(level_for_verbosity(1), log::LevelFilter::Debug);
        assert_eq!(level_for_verbosity(7), log::LevelFilter::Trace);
    }

    #[test]
    fn test_initializer_is_idempotent() {
        super::initialize_for_tests();
        super::initialize_for_tests();
        chat_debug!("logger initialized twice without panicking");
    }
}
