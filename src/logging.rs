//! Logger construction.
//!
//! Library code takes a [`Logger`] explicitly and never installs a global one.
//! The CLI builds a terminal logger; tests and embedders can pass [`discard`].

use slog::{Drain, Level, Logger, o};

/// Async stderr logger. `verbosity`: 0 = warnings, 1 = info, 2+ = debug.
pub fn terminal(verbosity: u8) -> Logger {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = drain.filter_level(level_for(verbosity)).fuse();
    Logger::root(drain, o!("tool" => "admb-bridge"))
}

/// Logger that drops every record.
pub fn discard() -> Logger {
    Logger::root(slog::Discard, o!())
}

fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::Warning,
        1 => Level::Info,
        _ => Level::Debug,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_for(0), Level::Warning);
        assert_eq!(level_for(1), Level::Info);
        assert_eq!(level_for(5), Level::Debug);
    }
}
