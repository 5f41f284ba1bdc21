//! Leveled stderr logging, tagged with the running fiber
//!
//! ```text
//! [DEBUG] [fiber 2] join 0 from 2
//! [INFO]  spawned 4 fibers
//! ```
//!
//! Lines written while a fiber owns the shared stack carry its id; the
//! scheduler sets the tag on every switch in and clears it on the way back
//! to the root flow.
//!
//! # Environment Variables
//!
//! - `COF_LOG_LEVEL=<level>` - off/error/warn/info/debug/trace or 0-5 (default info)
//! - `COF_FLUSH_EPRINT=1` - Flush stderr after each line (useful when a fiber crashes)

use std::cell::Cell;
use std::io::Write;
use std::sync::OnceLock;

use crate::id::FiberId;

/// Log levels, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Parse a `COF_LOG_LEVEL` value (name or digit, case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "1" => Some(LogLevel::Error),
            "warn" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            LogLevel::Off => "",
            LogLevel::Error => "[ERROR]",
            LogLevel::Warn => "[WARN] ",
            LogLevel::Info => "[INFO] ",
            LogLevel::Debug => "[DEBUG]",
            LogLevel::Trace => "[TRACE]",
        }
    }
}

/// Process-wide settings, read from the environment on first use
struct Settings {
    level: LogLevel,
    flush: bool,
}

static SETTINGS: OnceLock<Settings> = OnceLock::new();

fn settings() -> &'static Settings {
    SETTINGS.get_or_init(|| Settings {
        level: std::env::var("COF_LOG_LEVEL")
            .ok()
            .and_then(|v| LogLevel::parse(&v))
            .unwrap_or(LogLevel::Info),
        flush: crate::env::env_get_bool("COF_FLUSH_EPRINT", false),
    })
}

thread_local! {
    static FIBER: Cell<FiberId> = const { Cell::new(FiberId::NONE) };
}

/// Tag this thread's lines with `id` (switching into a fiber)
#[inline]
pub fn enter_fiber(id: FiberId) {
    FIBER.with(|c| c.set(id));
}

/// Drop the tag (back on the root flow)
#[inline]
pub fn leave_fiber() {
    FIBER.with(|c| c.set(FiberId::NONE));
}

/// Would a line at `level` be written?
#[inline]
pub fn enabled(level: LogLevel) -> bool {
    level != LogLevel::Off && level <= settings().level
}

fn write_line(
    out: &mut impl Write,
    level: LogLevel,
    fiber: FiberId,
    args: std::fmt::Arguments<'_>,
) -> std::io::Result<()> {
    write!(out, "{} ", level.tag())?;
    if fiber.is_some() {
        write!(out, "[fiber {}] ", fiber)?;
    }
    out.write_fmt(args)?;
    out.write_all(b"\n")
}

/// Internal: leveled line to stderr, holding the lock for the whole line
#[doc(hidden)]
pub fn _klog_impl(level: LogLevel, args: std::fmt::Arguments<'_>) {
    if !enabled(level) {
        return;
    }
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    let _ = write_line(&mut handle, level, FIBER.with(|c| c.get()), args);
    if settings().flush {
        let _ = handle.flush();
    }
}

/// Log an error (level 1)
#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => {
        $crate::kprint::_klog_impl($crate::kprint::LogLevel::Error, format_args!($($arg)*))
    };
}

/// Log a warning (level 2)
#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {
        $crate::kprint::_klog_impl($crate::kprint::LogLevel::Warn, format_args!($($arg)*))
    };
}

/// Log info (level 3)
#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => {
        $crate::kprint::_klog_impl($crate::kprint::LogLevel::Info, format_args!($($arg)*))
    };
}

/// Log scheduler events (level 4)
#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => {
        $crate::kprint::_klog_impl($crate::kprint::LogLevel::Debug, format_args!($($arg)*))
    };
}

/// Log per-switch detail (level 5)
#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => {
        $crate::kprint::_klog_impl($crate::kprint::LogLevel::Trace, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(level: LogLevel, fiber: FiberId, args: std::fmt::Arguments<'_>) -> String {
        let mut out = Vec::new();
        write_line(&mut out, level, fiber, args).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_level_order() {
        assert!(LogLevel::Off < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse(" trace "), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse("2"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("0"), Some(LogLevel::Off));
        assert_eq!(LogLevel::parse("loud"), None);
    }

    #[test]
    fn test_root_line_has_no_fiber_tag() {
        let line = render(LogLevel::Info, FiberId::NONE, format_args!("spawned {} fibers", 4));
        assert_eq!(line, "[INFO]  spawned 4 fibers\n");
    }

    #[test]
    fn test_fiber_line_is_tagged() {
        let line = render(LogLevel::Debug, FiberId::new(2), format_args!("join {}", 0));
        assert_eq!(line, "[DEBUG] [fiber 2] join 0\n");
    }

    #[test]
    fn test_enter_and_leave_fiber() {
        enter_fiber(FiberId::new(7));
        assert_eq!(FIBER.with(|c| c.get()), FiberId::new(7));
        leave_fiber();
        assert!(FIBER.with(|c| c.get()).is_none());
    }

    #[test]
    fn test_off_is_never_enabled() {
        assert!(!enabled(LogLevel::Off));
    }
}
