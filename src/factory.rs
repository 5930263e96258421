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
//! Building [`EventRule`]s the way the session daemon does.
//!
//! When asked to enable an agent event, the session daemon synthesizes a filter expression from
//! the event name, the log level and any filter the user supplied. The functions here reproduce
//! that composition exactly, so that a rule built from the parameters of an `enable-event`
//! command compares equal to the rule the agent is later handed:
//!
//! ```text
//! (<user filter>) && (logger_name == "<name>") && (int_loglevel <op> <level>)
//! ```
//!
//! Absent clauses are simply left out.

use crate::error::Result;
use crate::loglevel::LogLevelSelector;
use crate::rule::EventRule;

fn name_clause(name: &str) -> String {
    format!("logger_name == \"{}\"", name)
}

/// The rule for `enable-event <name>`.
pub fn create_rule(name: &str) -> EventRule {
    EventRule::new(
        name,
        LogLevelSelector::UNSPECIFIED,
        format!("({})", name_clause(name)),
    )
}

/// The rule for `enable-event <name> --loglevel[-only] <level>`.
pub fn create_rule_with_level(name: &str, level: LogLevelSelector) -> Result<EventRule> {
    if level.is_unspecified() {
        return Ok(create_rule(name));
    }
    let filter = format!("({}) && ({})", name_clause(name), level.to_filter_clause()?);
    Ok(EventRule::new(name, level, filter))
}

/// The rule for `enable-event <name> [--loglevel[-only] <level>] --filter <filter>`.
pub fn create_rule_with_filter(
    name: &str,
    level: LogLevelSelector,
    filter: &str,
) -> Result<EventRule> {
    let filter = if level.is_unspecified() {
        format!("({}) && ({})", filter, name_clause(name))
    } else {
        format!(
            "({}) && ({}) && ({})",
            filter,
            name_clause(name),
            level.to_filter_clause()?
        )
    };
    Ok(EventRule::new(name, level, filter))
}

/// The rule for `enable-event -a`. The session daemon derives no clause at all for the
/// wildcard, so the filter is empty.
pub fn create_rule_all_events() -> EventRule {
    EventRule::new(EventRule::ALL_EVENTS, LogLevelSelector::UNSPECIFIED, "")
}
