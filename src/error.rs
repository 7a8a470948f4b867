//! Outcome and failure types shared across the crate.
//!
//! `carriageway` never unwinds across a highway's worker loop (spec §9:
//! "convert every task invocation site into a fallible call ... never
//! unwind across the worker loop"). Task closures that can fail report an
//! [`Exception`]; the worker routes it to the highway's configured
//! exception handler instead of propagating a panic.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::fmt;

/// Numeric outcome codes (spec §7). `ok` family is `> 0`, `eFail` family is
/// `< 0`, and `noResult` is the zero value meaning "no work performed yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResultCode {
    NoResult,
    Ok,
    OkCreatedNew,
    OkReplaced,
    OkReady,
    OkInProcess,
    EFail,
    ENoMemory,
    EFailMoreThanIHave,
}

impl ResultCode {
    /// `true` for the zero and `ok` family; `false` for `eFail` family.
    pub fn is_ok(self) -> bool {
        !matches!(self, Self::EFail | Self::ENoMemory | Self::EFailMoreThanIHave)
    }

    pub fn is_err(self) -> bool {
        !self.is_ok()
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A source-location tag every [`crate::highway::Task`] carries, used both
/// for exception reporting and for the `tracing` spans the worker opens
/// around a task invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: u32,
}

impl SourceLocation {
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Captures a source-location tag, a message, a backtrace, and an optional
/// nested cause. Every task invocation that panics or returns an error is
/// converted into one of these before it reaches an exception handler
/// (spec §7).
pub struct Exception {
    location: SourceLocation,
    message: Cow<'static, str>,
    backtrace: Backtrace,
    cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl Exception {
    pub fn new(location: SourceLocation, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            location,
            message: message.into(),
            backtrace: Backtrace::capture(),
            cause: None,
        }
    }

    /// Builds an exception from a caught panic payload, used by the
    /// highway worker's task-invocation wrapper.
    pub fn from_panic(location: SourceLocation, payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "task panicked with a non-string payload".to_string()
        };
        Self::new(location, message)
    }

    pub fn with_cause(
        mut self,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn location(&self) -> SourceLocation {
        self.location
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

impl fmt::Debug for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exception")
            .field("location", &self.location)
            .field("message", &self.message)
            .field("cause", &self.cause.as_ref().map(|c| c.to_string()))
            .finish()
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

impl std::error::Error for Exception {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|c| c.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Captures `$msg` at the call site as an [`Exception`].
#[macro_export]
macro_rules! exception {
    ($msg:expr) => {
        $crate::error::Exception::new(
            $crate::error::SourceLocation::new(file!(), line!()),
            $msg,
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_code_ok_family() {
        assert!(ResultCode::Ok.is_ok());
        assert!(ResultCode::OkInProcess.is_ok());
        assert!(ResultCode::NoResult.is_ok());
        assert!(ResultCode::EFail.is_err());
        assert!(ResultCode::EFailMoreThanIHave.is_err());
    }

    #[test]
    fn exception_captures_location_and_message() {
        let e = exception!("boom");
        assert_eq!(e.message(), "boom");
        assert!(e.location().file.ends_with("error.rs"));
        assert!(e.cause().is_none());
    }
}
