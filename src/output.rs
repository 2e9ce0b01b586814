//! Console output gated by `--quiet`.
//!
//! Library code logs through `tracing`; these macros are for the
//! user-facing summaries the CLI prints.

use std::sync::atomic::{AtomicBool, Ordering};

static QUIET_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_quiet(quiet: bool) {
    QUIET_MODE.store(quiet, Ordering::SeqCst);
}

pub fn is_quiet() -> bool {
    QUIET_MODE.load(Ordering::SeqCst)
}

/// `println!` unless quiet
#[macro_export]
macro_rules! info_print {
    ($($arg:tt)*) => {
        if !$crate::output::is_quiet() {
            println!($($arg)*);
        }
    };
}

/// `eprintln!` unless quiet
#[macro_export]
macro_rules! warn_print {
    ($($arg:tt)*) => {
        if !$crate::output::is_quiet() {
            eprintln!($($arg)*);
        }
    };
}
