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
//! Log level selectors & per-domain log level tables.
//!
//! Each logging API an agent can sit on top of (the "domain": JUL, log4j or log4j2) has its own
//! table of numeric log levels. [`LogLevelSelector`] describes the constraint an event rule places
//! on those numbers, and [`Domain`] knows how to read them.

use crate::error::{Error, Result};

type StdResult<T, E> = std::result::Result<T, E>;

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                            domains                                             //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The logging APIs for which the tracer has an agent domain.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Domain {
    /// `java.util.logging`
    Jul,
    /// Apache log4j 1.x
    Log4j,
    /// Apache log4j 2.x
    Log4j2,
}

/// The names & values of two well-known levels in a domain, as accepted by `lttng enable-event
/// --loglevel`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LevelStrings {
    pub warning_name: &'static str,
    pub warning_level: i32,
    pub info_name: &'static str,
    pub info_level: i32,
}

const JUL_LEVELS: LevelStrings = LevelStrings {
    warning_name: "warning",
    warning_level: 900,
    info_name: "info",
    info_level: 800,
};

const LOG4J_LEVELS: LevelStrings = LevelStrings {
    warning_name: "warn",
    warning_level: 30000,
    info_name: "info",
    info_level: 20000,
};

const LOG4J2_LEVELS: LevelStrings = LevelStrings {
    warning_name: "warn",
    warning_level: 300,
    info_name: "info",
    info_level: 400,
};

// Indexed by `severity_index`: error, warn, info, debug, trace
const JUL_TABLE: [(&str, i32); 5] = [
    ("severe", 1000),
    ("warning", 900),
    ("info", 800),
    ("fine", 500),
    ("finest", 300),
];
const LOG4J_TABLE: [(&str, i32); 5] = [
    ("error", 40000),
    ("warn", 30000),
    ("info", 20000),
    ("debug", 10000),
    ("trace", 5000),
];
const LOG4J2_TABLE: [(&str, i32); 5] = [
    ("error", 200),
    ("warn", 300),
    ("info", 400),
    ("debug", 500),
    ("trace", 600),
];

fn severity_index(level: &tracing::Level) -> usize {
    match *level {
        tracing::Level::ERROR => 0,
        tracing::Level::WARN => 1,
        tracing::Level::INFO => 2,
        tracing::Level::DEBUG => 3,
        _ => 4,
    }
}

impl Domain {
    /// The option selecting this domain on the `lttng` command line.
    pub fn cli_flag(&self) -> &'static str {
        match self {
            Domain::Jul => "-j",
            Domain::Log4j => "-l",
            Domain::Log4j2 => "--log4j2",
        }
    }
    pub fn name(&self) -> &'static str {
        match self {
            Domain::Jul => "jul",
            Domain::Log4j => "log4j",
            Domain::Log4j2 => "log4j2",
        }
    }
    pub fn level_strings(&self) -> LevelStrings {
        match self {
            Domain::Jul => JUL_LEVELS,
            Domain::Log4j => LOG4J_LEVELS,
            Domain::Log4j2 => LOG4J2_LEVELS,
        }
    }
    /// Map a [`tracing`] level into this domain's table, returning the level's name & value.
    ///
    /// [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
    pub fn level_for(&self, level: &tracing::Level) -> (&'static str, i32) {
        let table = match self {
            Domain::Jul => &JUL_TABLE,
            Domain::Log4j => &LOG4J_TABLE,
            Domain::Log4j2 => &LOG4J2_TABLE,
        };
        table[severity_index(level)]
    }
    /// True if level `a` is at least as severe as level `b` in this domain.
    ///
    /// JUL & log4j give more severe levels larger numbers; log4j2 inverts that.
    pub fn is_at_least_as_severe(&self, a: i32, b: i32) -> bool {
        match self {
            Domain::Jul | Domain::Log4j => a >= b,
            Domain::Log4j2 => a <= b,
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "{}", self.name())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                       log level selector                                       //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// How a [`LogLevelSelector`] compares its threshold to an event's level.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LogLevelKind {
    /// No constraint was given
    Unspecified,
    /// Placeholder for "every level"; it has no filter clause
    All,
    /// At least as severe as the threshold
    Range,
    /// Exactly the threshold
    Single,
}

impl LogLevelKind {
    /// Decode the log level type carried by an "enable event" command. The session daemon uses
    /// zero to mean "no constraint", so that decodes to [`LogLevelKind::Unspecified`].
    pub fn from_code(code: u32) -> Result<LogLevelKind> {
        match code {
            0 => Ok(LogLevelKind::Unspecified),
            1 => Ok(LogLevelKind::Range),
            2 => Ok(LogLevelKind::Single),
            n => Err(Error::invalid_argument(format!("unknown log level type {}", n))),
        }
    }
    pub fn name(&self) -> &'static str {
        match self {
            LogLevelKind::Unspecified => "unspecified",
            LogLevelKind::All => "all",
            LogLevelKind::Range => "range",
            LogLevelKind::Single => "single",
        }
    }
}

impl std::str::FromStr for LogLevelKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<LogLevelKind> {
        match s {
            "unspecified" => Ok(LogLevelKind::Unspecified),
            "all" => Ok(LogLevelKind::All),
            "range" => Ok(LogLevelKind::Range),
            "single" => Ok(LogLevelKind::Single),
            _ => Err(Error::invalid_argument(format!("unknown log level kind '{}'", s))),
        }
    }
}

impl std::fmt::Display for LogLevelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "{}", self.name())
    }
}

/// A (threshold, comparison) pair constraining the log level of matching events.
///
/// The level is passed through as-is; it's up to the domain to give it meaning.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LogLevelSelector {
    level: i32,
    kind: LogLevelKind,
}

impl LogLevelSelector {
    /// The "no log level given" selector.
    pub const UNSPECIFIED: LogLevelSelector = LogLevelSelector {
        level: i32::MIN,
        kind: LogLevelKind::Unspecified,
    };

    pub fn new(level: i32, kind: LogLevelKind) -> LogLevelSelector {
        LogLevelSelector { level, kind }
    }
    /// Match events at least as severe as `level` (`--loglevel`)
    pub fn range(level: i32) -> LogLevelSelector {
        LogLevelSelector::new(level, LogLevelKind::Range)
    }
    /// Match events at exactly `level` (`--loglevel-only`)
    pub fn single(level: i32) -> LogLevelSelector {
        LogLevelSelector::new(level, LogLevelKind::Single)
    }
    pub fn level(&self) -> i32 {
        self.level
    }
    pub fn kind(&self) -> LogLevelKind {
        self.kind
    }
    pub fn is_unspecified(&self) -> bool {
        self.kind == LogLevelKind::Unspecified
    }
    /// Render the filter clause the session daemon derives from this selector: empty when
    /// unspecified, `int_loglevel >= N` for a range & `int_loglevel == N` for a single level.
    pub fn to_filter_clause(&self) -> Result<String> {
        match self.kind {
            LogLevelKind::Unspecified => Ok(String::new()),
            LogLevelKind::Range => Ok(format!("int_loglevel >= {}", self.level)),
            LogLevelKind::Single => Ok(format!("int_loglevel == {}", self.level)),
            LogLevelKind::All => Err(Error::invalid_argument(
                "a log level selector of kind \"all\" has no filter clause",
            )),
        }
    }
    /// True if an event at `level` in `domain` satisfies this selector.
    pub fn matches(&self, domain: Domain, level: i32) -> bool {
        match self.kind {
            LogLevelKind::Unspecified | LogLevelKind::All => true,
            LogLevelKind::Range => domain.is_at_least_as_severe(level, self.level),
            LogLevelKind::Single => level == self.level,
        }
    }
}

impl std::default::Default for LogLevelSelector {
    fn default() -> Self {
        LogLevelSelector::UNSPECIFIED
    }
}

#[cfg(test)]
mod selector_tests {
    use super::*;

    #[test]
    fn test_filter_clause() {
        assert_eq!(LogLevelSelector::UNSPECIFIED.to_filter_clause().unwrap(), "");
        assert_eq!(
            LogLevelSelector::range(900).to_filter_clause().unwrap(),
            "int_loglevel >= 900"
        );
        assert_eq!(
            LogLevelSelector::single(20000).to_filter_clause().unwrap(),
            "int_loglevel == 20000"
        );
        let err = LogLevelSelector::new(800, LogLevelKind::All).to_filter_clause();
        assert!(matches!(err, Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn test_unspecified_sentinel() {
        assert_eq!(LogLevelSelector::UNSPECIFIED, LogLevelSelector::default());
        assert!(LogLevelSelector::UNSPECIFIED.is_unspecified());
        // Same number, different kind: not the sentinel
        let imposter = LogLevelSelector::range(i32::MIN);
        assert_ne!(LogLevelSelector::UNSPECIFIED, imposter);
        assert!(!imposter.is_unspecified());
        assert_ne!(LogLevelSelector::range(900), LogLevelSelector::single(900));
    }

    #[test]
    fn test_matching() {
        let warn = LogLevelSelector::range(900);
        assert!(warn.matches(Domain::Jul, 1000));
        assert!(warn.matches(Domain::Jul, 900));
        assert!(!warn.matches(Domain::Jul, 800));
        // log4j2 numbers run the other way
        let warn2 = LogLevelSelector::range(300);
        assert!(warn2.matches(Domain::Log4j2, 200));
        assert!(!warn2.matches(Domain::Log4j2, 400));
        let only = LogLevelSelector::single(20000);
        assert!(only.matches(Domain::Log4j, 20000));
        assert!(!only.matches(Domain::Log4j, 30000));
        assert!(LogLevelSelector::UNSPECIFIED.matches(Domain::Log4j, i32::MAX));
    }

    #[test]
    fn test_codes() {
        assert_eq!(LogLevelKind::from_code(0).unwrap(), LogLevelKind::Unspecified);
        assert_eq!(LogLevelKind::from_code(1).unwrap(), LogLevelKind::Range);
        assert_eq!(LogLevelKind::from_code(2).unwrap(), LogLevelKind::Single);
        assert!(LogLevelKind::from_code(3).is_err());
        assert_eq!("range".parse::<LogLevelKind>().unwrap(), LogLevelKind::Range);
    }

    #[test]
    fn test_domain_tables() {
        for domain in [Domain::Jul, Domain::Log4j, Domain::Log4j2] {
            let strings = domain.level_strings();
            assert_eq!(
                domain.level_for(&tracing::Level::WARN),
                (strings.warning_name, strings.warning_level)
            );
            assert_eq!(
                domain.level_for(&tracing::Level::INFO),
                (strings.info_name, strings.info_level)
            );
            assert!(domain.is_at_least_as_severe(strings.warning_level, strings.info_level));
            assert!(!domain.is_at_least_as_severe(strings.info_level, strings.warning_level));
        }
        assert_eq!(format!("{}", Domain::Log4j2), "log4j2");
        assert_eq!(Domain::Jul.cli_flag(), "-j");
    }
}
