// Copyright (C) 2026 The lttng-ust-agent contributors
//
// This file is part of lttng-ust-agent.
//
// lttng-ust-agent is free software: you can redistribute it and/or modify it under the terms of the
// GNU General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// lttng-ust-agent is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See
// the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with lttng-ust-agent.
// If not, see <http://www.gnu.org/licenses/>.
//! [lttng-ust-agent](crate) errors

use backtrace::Backtrace;

/// [lttng-ust-agent](crate) error type
///
/// [lttng-ust-agent](crate) eschews libraries like [thiserror], [anyhow] & [Snafu] in favor of
/// a straightforward enumeration with a few match arms chosen on the basis what the caller will
/// need to repond.
///
/// Note that a failing `lttng` command is *not* an error: the session facade reports those as
/// `false`, and callers are expected to check.
///
/// [thiserror]: https://docs.rs/thiserror
/// [anyhow]: https://docs.rs/anyhow
/// [Snafu]: https://docs.rs/snafu/latest/snafu
#[non_exhaustive]
pub enum Error {
    /// A caller handed us something we can't work with (an empty list of event names, a log
    /// level selector of kind "all" where a filter clause is required, &c)
    InvalidArgument {
        reason: String,
        back: Backtrace,
    },
    /// Text that doesn't describe an event rule
    BadRuleText {
        text: String,
        back: Backtrace,
    },
    /// Failed to spawn, or talk to, an external command
    Command {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// The notification channel failed
    Channel {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// An Event had no message field
    NoMessageField {
        name: &'static str,
        back: Backtrace,
    },
    /// A lock guarding shared state was poisoned
    Poisoned {
        back: Backtrace,
    },
    /// The notifier has been shut down
    ShutDown,
    /// A filter change callback called back into its notifier in a way that would deadlock
    Reentrant {
        what: &'static str,
        back: Backtrace,
    },
    /// A record sink refused a record
    Sink {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
}

impl Error {
    pub(crate) fn invalid_argument<S: Into<String>>(reason: S) -> Error {
        Error::InvalidArgument {
            reason: reason.into(),
            back: Backtrace::new(),
        }
    }
    pub(crate) fn reentrant(what: &'static str) -> Error {
        Error::Reentrant {
            what,
            back: Backtrace::new(),
        }
    }
    pub(crate) fn poisoned() -> Error {
        Error::Poisoned {
            back: Backtrace::new(),
        }
    }
}

impl std::fmt::Display for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::InvalidArgument { reason, .. } => write!(f, "Invalid argument: {}", reason),
            Error::BadRuleText { text, .. } => {
                write!(f, "'{}' is not the textual form of an event rule", text)
            }
            Error::Command { source, .. } => write!(f, "While running lttng, got {}", source),
            Error::Channel { source, .. } => {
                write!(f, "Agent notification channel error: {}", source)
            }
            Error::NoMessageField { name, .. } => write!(
                f,
                "Event '{}' had no message field, so no log record was made",
                name
            ),
            Error::Poisoned { .. } => write!(f, "A lock was poisoned"),
            Error::ShutDown => write!(f, "The filter change notifier has been shut down"),
            Error::Sink { source, .. } => write!(f, "Failed to publish a log record: {}", source),
            Error::Reentrant { what, .. } => write!(
                f,
                "{} was called from inside a filter change callback on the same notifier",
                what
            ),
            _ => write!(f, "Other lttng-ust-agent error"),
        }
    }
}

impl std::fmt::Debug for Error {
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::InvalidArgument { reason: _, back } => write!(f, "{}\n{:#?}", self, back),
            Error::BadRuleText { text: _, back } => write!(f, "{}\n{:#?}", self, back),
            Error::Command { source: _, back } => write!(f, "{}\n{:#?}", self, back),
            Error::Channel { source: _, back } => write!(f, "{}\n{:#?}", self, back),
            Error::NoMessageField { name: _, back } => write!(f, "{}\n{:#?}", self, back),
            Error::Poisoned { back } => write!(f, "{}\n{:#?}", self, back),
            Error::Sink { source: _, back } => write!(f, "{}\n{:#?}", self, back),
            Error::Reentrant { what: _, back } => write!(f, "{}\n{:#?}", self, back),
            err => write!(f, "lttng-ust-agent error: {}", err),
        }
    }
}

impl std::error::Error for Error {}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Error::poisoned()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
