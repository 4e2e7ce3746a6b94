use std::io::{self, Write};

/// Logs the error held by `result`, if any, and otherwise ignores it.
macro_rules! log_if_err {
    ($result:expr, $msg:expr) => {{
        if let Err(ref e) = $result {
            ::log::error!("{}: {}", $msg, e);
        }
    }};
    ($result:expr, $fmt:expr, $($arg:tt)+) => {{
        if let Err(ref e) = $result {
            ::log::error!("{}: {}", format!($fmt, $($arg)+), e);
        }
    }};
}

pub mod unix;

/// Flushes buffered stdout so a forked child does not inherit and replay it.
pub fn flush_stdout() {
    let temp_result = io::stdout().flush();
    log_if_err!(temp_result, "failed to flush stdout");
}

/// Splits `input` on whitespace into owned words.
pub fn split_words<T: AsRef<str>>(input: T) -> Vec<String> {
    input
        .as_ref()
        .split_whitespace()
        .map(String::from)
        .collect()
}
