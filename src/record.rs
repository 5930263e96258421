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
//! Turning [`tracing`] events into log records.
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
//!
//! An event selected by the enabled rules becomes a [`LogRecord`]: the message, the logger name,
//! the domain's idea of the log level & where the event came from. What happens to the record
//! next is up to the [`RecordSink`] the application hands the [`AgentLayer`]; emitting it as a
//! native tracepoint is the business of the tracer's own bindings.
//!
//! [`AgentLayer`]: crate::layer::AgentLayer

use crate::error::{Error, Result};
use crate::loglevel::Domain;

use backtrace::Backtrace;
use chrono::{prelude::*, SecondsFormat};
use tracing_core::field::{Field, Visit};

use std::sync::{mpsc, Arc, Mutex};

struct MessageEventVisitor {
    message: Option<String>,
}

impl Visit for MessageEventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            // The tracing macros "pre-format" the message field, so `value` is really a
            // `std::fmt::Arguments`, which debug-prints without enclosing double-quotes.
            self.message = Some(format!("{:?}", value));
        }
    }
}

/// Extract `event`'s "message" field.
pub fn message_of(event: &tracing::Event<'_>) -> Result<String> {
    let mut visitor = MessageEventVisitor { message: None };
    event.record(&mut visitor);
    visitor.message.ok_or_else(|| Error::NoMessageField {
        name: event.metadata().name(),
        back: Backtrace::new(),
    })
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                        struct LogRecord                                        //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// One logging statement, as a log agent would hand it to the tracer.
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub domain: Domain,
    /// The logger (the event's target)
    pub logger: String,
    /// The level's name in `domain`'s table
    pub level_name: &'static str,
    /// The level's value in `domain`'s table
    pub level: i32,
    pub message: String,
    /// The module that logged the statement, if known
    pub module_path: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    /// The name of the logging thread, if it has one
    pub thread: Option<String>,
}

impl LogRecord {
    /// Build the record for `event`, whose (possibly normalized) metadata is `meta`. The level is
    /// mapped into `domain`'s table & the timestamp is "now".
    pub fn from_event(
        domain: Domain,
        meta: &tracing::Metadata<'_>,
        event: &tracing::Event<'_>,
    ) -> Result<LogRecord> {
        let (level_name, level) = domain.level_for(meta.level());
        Ok(LogRecord {
            timestamp: Utc::now(),
            domain,
            logger: meta.target().to_string(),
            level_name,
            level,
            message: message_of(event)?,
            module_path: meta.module_path().map(String::from),
            file: meta.file().map(String::from),
            line: meta.line(),
            thread: std::thread::current().name().map(String::from),
        })
    }
}

impl std::fmt::Display for LogRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}:{} [{}/{}] {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, false),
            self.domain,
            self.logger,
            self.level_name,
            self.level,
            self.message
        )
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                          record sinks                                          //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Somewhere to put the records the enabled rules select.
pub trait RecordSink {
    fn publish(&self, record: LogRecord) -> Result<()>;
}

impl<T: RecordSink + ?Sized> RecordSink for Arc<T> {
    fn publish(&self, record: LogRecord) -> Result<()> {
        (**self).publish(record)
    }
}

/// Hand records to another thread; fails once the receiving end has gone away.
impl RecordSink for mpsc::Sender<LogRecord> {
    fn publish(&self, record: LogRecord) -> Result<()> {
        self.send(record).map_err(|err| Error::Sink {
            source: Box::new(err),
            back: Backtrace::new(),
        })
    }
}

/// Collects records in memory until someone takes them.
#[derive(Debug, Default)]
pub struct RecordBuffer {
    records: Mutex<Vec<LogRecord>>,
}

impl RecordBuffer {
    /// Remove & return everything collected so far, oldest first.
    pub fn take(&self) -> Result<Vec<LogRecord>> {
        Ok(std::mem::take(&mut *self.records.lock()?))
    }
    pub fn len(&self) -> Result<usize> {
        Ok(self.records.lock()?.len())
    }
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl RecordSink for RecordBuffer {
    fn publish(&self, record: LogRecord) -> Result<()> {
        self.records.lock()?.push(record);
        Ok(())
    }
}
