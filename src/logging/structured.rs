//! Structured logging utilities.
//!
//! Provides context-aware logging with op_id and report id included
//! in every log message.

use std::fmt;

/// Logging context for one operation (a lookup, a transition, a remote call).
#[derive(Debug, Clone)]
pub struct LogContext {
    pub op_id: String,
    pub report_id: Option<String>,
}

impl LogContext {
    pub fn new(op_id: &str) -> Self {
        Self {
            op_id: op_id.to_string(),
            report_id: None,
        }
    }

    pub fn with_report(&self, report_id: &str) -> Self {
        Self {
            op_id: self.op_id.clone(),
            report_id: Some(report_id.to_uppercase()),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.report_id {
            Some(pir) => write!(f, "[op={}] [pir={}]", self.op_id, pir),
            None => write!(f, "[op={}]", self.op_id),
        }
    }
}

/// Log an info message with context.
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        log::info!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        )
    };
}

/// Log a warning message with context.
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        log::warn!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        )
    };
}

/// Log an error message with context.
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        log::error!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        )
    };
}

/// Log a debug message with context.
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        log::debug!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        )
    };
}
