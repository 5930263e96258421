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
//! The receiving end of the agent's session daemon channel.
//!
//! The session daemon tells a registered agent about enabled & disabled events and application
//! contexts, one discrete message at a time. How those messages arrive (the agent protocol) is
//! somebody else's problem; this module defines the decoded messages ([`Notification`]), a trait
//! for anything that produces them ([`NotificationSource`]) and a receive loop that applies them
//! to a [`FilterChangeNotifier`] on a dedicated thread.
//!
//! # Examples
//!
//! ```rust
//! use lttng_ust_agent::channel::{spawn_reader, Notification};
//! use lttng_ust_agent::factory::create_rule;
//! use lttng_ust_agent::notifier::FilterChangeNotifier;
//! use std::sync::{mpsc, Arc};
//!
//! let notifier = Arc::new(FilterChangeNotifier::new());
//! let (tx, rx) = mpsc::channel();
//! let reader = spawn_reader(rx, notifier.clone()).unwrap();
//! tx.send(Notification::EventEnabled(create_rule("EventA"))).unwrap();
//! drop(tx); // end of stream
//! reader.join().unwrap().unwrap();
//! assert_eq!(notifier.rules().unwrap(), vec![create_rule("EventA")]);
//! ```

use crate::error::{Error, Result};
use crate::notifier::FilterChangeNotifier;
use crate::rule::EventRule;

use backtrace::Backtrace;
use tracing::{debug, warn};

use std::{
    sync::{mpsc::Receiver, Arc},
    thread::{self, JoinHandle},
};

/// One decoded message from the session daemon.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// An event rule was enabled
    EventEnabled(EventRule),
    /// The event with this name was disabled
    EventDisabled(String),
    /// An application context was enabled
    AppContextEnabled { retriever: String, name: String },
    /// An application context was disabled
    AppContextDisabled { retriever: String, name: String },
}

/// Operations all sources of [`Notification`]s must support.
pub trait NotificationSource: Send {
    /// Block until the next message arrives; `Ok(None)` means the channel closed cleanly.
    fn recv(&mut self) -> Result<Option<Notification>>;
}

/// A closed (all senders dropped) `mpsc` channel is a clean end-of-stream.
impl NotificationSource for Receiver<Notification> {
    fn recv(&mut self) -> Result<Option<Notification>> {
        Ok(Receiver::recv(self).ok())
    }
}

/// Apply a single message to `notifier`.
pub fn dispatch(notifier: &FilterChangeNotifier, notification: Notification) -> Result<()> {
    match notification {
        Notification::EventEnabled(rule) => {
            notifier.notify_event_rule_added(rule)?;
        }
        Notification::EventDisabled(name) => {
            if notifier.notify_event_disabled(&name)? == 0 {
                warn!("The session daemon disabled event {}, which wasn't enabled", name);
            }
        }
        Notification::AppContextEnabled { retriever, name } => {
            notifier.notify_app_context_enabled(&retriever, &name)?;
        }
        Notification::AppContextDisabled { retriever, name } => {
            notifier.notify_app_context_disabled(&retriever, &name)?;
        }
    }
    Ok(())
}

/// Drain `source` into `notifier` until end-of-stream. A notifier that has been shut down ends
/// the loop quietly; any other error ends it & is returned.
pub fn run_reader<S: NotificationSource>(
    mut source: S,
    notifier: &FilterChangeNotifier,
) -> Result<()> {
    while let Some(notification) = source.recv()? {
        match dispatch(notifier, notification) {
            Ok(()) => (),
            Err(Error::ShutDown) => {
                debug!("Notifier shut down; agent channel reader exiting");
                return Ok(());
            }
            Err(err) => return Err(err),
        }
    }
    debug!("Agent channel closed; reader exiting");
    Ok(())
}

/// Run [`run_reader`] on a dedicated thread.
pub fn spawn_reader<S: NotificationSource + 'static>(
    source: S,
    notifier: Arc<FilterChangeNotifier>,
) -> Result<JoinHandle<Result<()>>> {
    thread::Builder::new()
        .name("lttng-agent-channel".to_string())
        .spawn(move || run_reader(source, &notifier))
        .map_err(|err| Error::Channel {
            source: Box::new(err),
            back: Backtrace::new(),
        })
}

#[cfg(test)]
mod channel_tests {
    use super::*;
    use crate::factory::{create_rule, create_rule_with_level};
    use crate::loglevel::LogLevelSelector;
    use crate::notifier::test_listener::TestListener;

    use std::sync::mpsc;

    #[test]
    fn test_reader_applies_in_order() {
        let notifier = Arc::new(FilterChangeNotifier::new());
        let listener = Arc::new(TestListener::default());
        notifier.register_listener(listener.clone()).unwrap();

        let (tx, rx) = mpsc::channel();
        let reader = spawn_reader(rx, notifier.clone()).unwrap();
        let warn = create_rule_with_level("EventB", LogLevelSelector::range(900)).unwrap();
        tx.send(Notification::EventEnabled(create_rule("EventA")))
            .unwrap();
        tx.send(Notification::EventEnabled(warn.clone())).unwrap();
        tx.send(Notification::AppContextEnabled {
            retriever: "myRetriever".to_string(),
            name: "intCtx".to_string(),
        })
        .unwrap();
        tx.send(Notification::EventDisabled("EventA".to_string()))
            .unwrap();
        // Not enabled: logged & ignored
        tx.send(Notification::EventDisabled("EventZ".to_string()))
            .unwrap();
        drop(tx);
        reader.join().unwrap().unwrap();

        assert_eq!(listener.added(), 2);
        assert_eq!(listener.removed(), 1);
        assert_eq!(listener.current(), vec![warn.clone()]);
        assert_eq!(notifier.rules().unwrap(), vec![warn]);
        assert_eq!(notifier.app_contexts().unwrap().len(), 1);
    }

    #[test]
    fn test_reader_stops_on_shutdown() {
        let notifier = Arc::new(FilterChangeNotifier::new());
        notifier.shutdown().unwrap();
        let (tx, rx) = mpsc::channel();
        tx.send(Notification::EventEnabled(create_rule("EventA")))
            .unwrap();
        // The sender is still alive, so only the shutdown can end the loop
        run_reader(rx, &notifier).unwrap();
        drop(tx);
    }

    struct Broken;
    impl NotificationSource for Broken {
        fn recv(&mut self) -> Result<Option<Notification>> {
            Err(Error::Channel {
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "session daemon went away",
                )),
                back: Backtrace::new(),
            })
        }
    }

    #[test]
    fn test_reader_reports_source_errors() {
        let notifier = FilterChangeNotifier::new();
        assert!(matches!(
            run_reader(Broken, &notifier),
            Err(Error::Channel { .. })
        ));
    }
}
