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
//! Event rule tracking & filter change notification for [LTTng-UST] logging agents, plus a
//! [`tracing-subscriber`] [`Layer`] that plays the part of such an agent.
//!
//! [LTTng-UST]: https://lttng.org/docs/#doc-lttng-ust
//! [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//!
//! # Introduction
//!
//! An LTTng logging agent sits inside an application, on top of its logging API (JUL, log4j,
//! log4j2: the "domain"), and hands log records to the tracer. Which records is decided
//! elsewhere: a user runs `lttng enable-event -j my.logger --loglevel warning`, the session
//! daemon turns that into an *event rule* (an event name pattern, a log level selector & a
//! derived filter expression) and hands it to every registered agent.
//!
//! This crate models that side of the conversation:
//!
//! - [`rule::EventRule`] & [`loglevel::LogLevelSelector`] are plain values, compared
//!   structurally
//! - [`factory`] builds the rule the session daemon *will* produce for a given `enable-event`
//!   command, so expected & observed rule sets can be compared
//! - [`notifier::FilterChangeNotifier`] tracks the enabled rules & broadcasts every change to
//!   its [`notifier::FilterChangeListener`]s, replaying the current state to latecomers
//! - [`channel`] applies session daemon messages to a notifier from a dedicated thread
//! - [`session`] drives a tracing session through the `lttng` command line tool
//! - [`layer::AgentLayer`] turns [`tracing`] events selected by the enabled rules into
//!   [`record::LogRecord`]s for an application-supplied [`record::RecordSink`]
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
//!
//! # Usage
//!
//! ```rust
//! use lttng_ust_agent::factory::create_rule_with_level;
//! use lttng_ust_agent::loglevel::{Domain, LogLevelSelector};
//! use lttng_ust_agent::notifier::FilterChangeNotifier;
//! use lttng_ust_agent::layer::EnabledRules;
//! use std::sync::Arc;
//!
//! let notifier = Arc::new(FilterChangeNotifier::new());
//! let expected = create_rule_with_level(
//!     "EventA",
//!     LogLevelSelector::range(Domain::Jul.level_strings().warning_level),
//! )
//! .unwrap();
//! assert_eq!(
//!     expected.filter_expression(),
//!     "(logger_name == \"EventA\") && (int_loglevel >= 900)"
//! );
//!
//! // ...the session daemon reports the rule...
//! notifier.notify_event_rule_added(expected.clone()).unwrap();
//!
//! // and a listener registered afterwards still hears about it.
//! let mirror = Arc::new(EnabledRules::default());
//! notifier.register_listener(mirror.clone()).unwrap();
//! assert_eq!(mirror.rules().unwrap(), vec![expected]);
//! ```

pub mod channel;
pub mod error;
pub mod factory;
pub mod layer;
pub mod loglevel;
pub mod notifier;
pub mod record;
pub mod rule;
pub mod session;
