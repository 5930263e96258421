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
//! The [`EventRule`] value type.
//!
//! An event rule records which log events a tracing session captures: an event name pattern, a
//! constraint on log level and the filter expression the session daemon derived from the two
//! (plus whatever filter the user supplied). Rules are plain values-- two rules built
//! independently from equivalent input compare equal.

use crate::error::{Error, Result};
use crate::loglevel::{Domain, LogLevelSelector};

use backtrace::Backtrace;

type StdResult<T, E> = std::result::Result<T, E>;

/// One enabled event, as the session daemon sees it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EventRule {
    event_pattern: String,
    level_selector: LogLevelSelector,
    filter_expression: String,
}

impl EventRule {
    /// The event name pattern meaning "every logger".
    pub const ALL_EVENTS: &'static str = "*";

    pub fn new<S1: Into<String>, S2: Into<String>>(
        event_pattern: S1,
        level_selector: LogLevelSelector,
        filter_expression: S2,
    ) -> EventRule {
        EventRule {
            event_pattern: event_pattern.into(),
            level_selector,
            filter_expression: filter_expression.into(),
        }
    }
    pub fn event_pattern(&self) -> &str {
        &self.event_pattern
    }
    pub fn level_selector(&self) -> &LogLevelSelector {
        &self.level_selector
    }
    pub fn filter_expression(&self) -> &str {
        &self.filter_expression
    }
    /// True if this rule's pattern selects the logger named `name`.
    ///
    /// `*` selects everything, a trailing `*` makes the pattern a prefix, anything else must match
    /// exactly.
    pub fn matches_logger(&self, name: &str) -> bool {
        if self.event_pattern == EventRule::ALL_EVENTS {
            true
        } else if let Some(prefix) = self.event_pattern.strip_suffix('*') {
            name.starts_with(prefix)
        } else {
            self.event_pattern == name
        }
    }
    /// True if an event from logger `name` at `level` is selected by this rule. The filter
    /// expression isn't considered; evaluating it is the tracer's business.
    pub fn matches(&self, domain: Domain, name: &str, level: i32) -> bool {
        self.matches_logger(name) && self.level_selector.matches(domain, level)
    }
}

/// The textual form of a rule is
///
/// ```text
/// name=<pattern> loglevel=<kind>[:<level>] filter=<expression>
/// ```
///
/// The filter expression runs to the end of the text. The level is omitted only for the
/// [`LogLevelSelector::UNSPECIFIED`] sentinel.
impl std::fmt::Display for EventRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "name={} loglevel=", self.event_pattern)?;
        if self.level_selector == LogLevelSelector::UNSPECIFIED {
            write!(f, "{}", self.level_selector.kind())?;
        } else {
            write!(
                f,
                "{}:{}",
                self.level_selector.kind(),
                self.level_selector.level()
            )?;
        }
        write!(f, " filter={}", self.filter_expression)
    }
}

impl std::str::FromStr for EventRule {
    type Err = Error;
    fn from_str(s: &str) -> Result<EventRule> {
        let bad = || Error::BadRuleText {
            text: s.to_string(),
            back: Backtrace::new(),
        };
        let rest = s.strip_prefix("name=").ok_or_else(bad)?;
        let (name, rest) = rest.split_once(" loglevel=").ok_or_else(bad)?;
        let (selector, filter) = rest.split_once(" filter=").ok_or_else(bad)?;
        let selector = match selector.split_once(':') {
            Some((kind, level)) => LogLevelSelector::new(
                level.parse().map_err(|_| bad())?,
                kind.parse().map_err(|_| bad())?,
            ),
            None if selector == "unspecified" => LogLevelSelector::UNSPECIFIED,
            None => return Err(bad()),
        };
        if name.is_empty() {
            return Err(bad());
        }
        Ok(EventRule::new(name, selector, filter))
    }
}
