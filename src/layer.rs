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
//! [lttng-ust-agent](crate) [`Layer`] implementation.
//!
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//!
//! [`AgentLayer`] plays the part of a logging agent: it sees every [`tracing`] event, and turns
//! those selected by at least one enabled [`EventRule`] into [`LogRecord`]s for its
//! [`RecordSink`]. The layer learns which rules are enabled through its [`EnabledRules`], which
//! must be registered with the [`FilterChangeNotifier`] fed by the session daemon channel.
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
//! [`FilterChangeNotifier`]: crate::notifier::FilterChangeNotifier
//!
//! ```rust
//! use lttng_ust_agent::layer::AgentLayer;
//! use lttng_ust_agent::loglevel::Domain;
//! use lttng_ust_agent::notifier::FilterChangeNotifier;
//! use lttng_ust_agent::record::LogRecord;
//! use tracing_subscriber::layer::SubscriberExt; // Needed to get `with()`
//! use tracing_subscriber::registry::Registry;
//! use std::sync::{mpsc, Arc};
//!
//! let notifier = Arc::new(FilterChangeNotifier::new());
//! let (tx, _rx) = mpsc::channel::<LogRecord>();
//! let layer = AgentLayer::new(Domain::Jul, tx);
//! notifier.register_listener(layer.enabled_rules()).unwrap();
//! let subscriber = Registry::default().with(layer);
//! ```

use crate::{
    error::Result,
    loglevel::Domain,
    notifier::{AppContext, FilterChangeListener},
    record::{LogRecord, RecordSink},
    rule::EventRule,
};

use tracing::{error, Event};
use tracing_subscriber::layer::Context;

// When the tracing-log feature is enabled, use NormalizeEvent to recover the target of events
// that originated from the `log` crate (for those, `metadata().target()` is just "log").
#[cfg(feature = "tracing-log")]
use tracing_log::NormalizeEvent;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// Our own diagnostics are never published; they are typically emitted while the rule set is
// changing underneath us.
const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                       struct EnabledRules                                      //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A [`FilterChangeListener`] that keeps a copy of the enabled rules & application contexts.
#[derive(Default)]
pub struct EnabledRules {
    rules: Mutex<Vec<EventRule>>,
    contexts: Mutex<Vec<AppContext>>,
}

/// Callbacks have no way to report failure, so a poisoned mirror is logged, un-poisoned & updated
/// anyway; dropping the update would leave it out of step with the notifier for good.
fn lock_for_update<'a, T>(what: &str, mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|err| {
        error!(
            "The lock on the mirrored {} was poisoned; applying the update to its last state",
            what
        );
        mutex.clear_poison();
        PoisonError::into_inner(err)
    })
}

impl EnabledRules {
    pub fn rules(&self) -> Result<Vec<EventRule>> {
        Ok(self.rules.lock()?.clone())
    }
    pub fn app_contexts(&self) -> Result<Vec<AppContext>> {
        Ok(self.contexts.lock()?.clone())
    }
    /// True if any enabled rule selects an event from `logger` at `level`.
    pub fn is_enabled(&self, domain: Domain, logger: &str, level: i32) -> Result<bool> {
        Ok(self
            .rules
            .lock()?
            .iter()
            .any(|rule| rule.matches(domain, logger, level)))
    }
}

impl FilterChangeListener for EnabledRules {
    fn event_rule_added(&self, rule: &EventRule) {
        lock_for_update("event rules", &self.rules).push(rule.clone());
    }
    fn event_rule_removed(&self, rule: &EventRule) {
        let mut rules = lock_for_update("event rules", &self.rules);
        if let Some(idx) = rules.iter().position(|r| r == rule) {
            rules.remove(idx);
        }
    }
    fn app_context_enabled(&self, retriever: &str, name: &str) {
        lock_for_update("application contexts", &self.contexts)
            .push(AppContext::new(retriever, name));
    }
    fn app_context_disabled(&self, retriever: &str, name: &str) {
        let ctx = AppContext::new(retriever, name);
        lock_for_update("application contexts", &self.contexts).retain(|c| *c != ctx);
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                        struct AgentLayer                                       //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A [`tracing-subscriber`]-compliant [`Layer`] implementation that publishes [`Event`]s selected
/// by the enabled event rules to a [`RecordSink`].
///
/// [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
/// [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
pub struct AgentLayer<K: RecordSink> {
    domain: Domain,
    rules: Arc<EnabledRules>,
    sink: K,
}

impl<K: RecordSink> AgentLayer<K> {
    /// Construct an [`AgentLayer`] for `domain` that publishes records to `sink`
    pub fn new(domain: Domain, sink: K) -> Self {
        AgentLayer {
            domain,
            rules: Arc::new(EnabledRules::default()),
            sink,
        }
    }
    /// The listener to register with the notifier; the layer publishes nothing until it's been
    /// told about at least one rule.
    pub fn enabled_rules(&self) -> Arc<EnabledRules> {
        self.rules.clone()
    }
    pub fn domain(&self) -> Domain {
        self.domain
    }
}

impl<S, K> tracing_subscriber::layer::Layer<S> for AgentLayer<K>
where
    S: tracing::Subscriber,
    K: RecordSink + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        #[cfg(feature = "tracing-log")]
        let normalized_meta = event.normalized_metadata();
        #[cfg(feature = "tracing-log")]
        let meta = normalized_meta.as_ref().unwrap_or_else(|| event.metadata());
        #[cfg(not(feature = "tracing-log"))]
        let meta = event.metadata();

        let logger = meta.target();
        if logger.split("::").next() == Some(OWN_TARGET) {
            return;
        }
        let (_, level) = self.domain.level_for(meta.level());
        match self.rules.is_enabled(self.domain, logger, level) {
            Ok(true) => (),
            Ok(false) => return,
            Err(err) => {
                error!("Couldn't check the enabled rules for {}: {}", logger, err);
                return;
            }
        }

        LogRecord::from_event(self.domain, meta, event)
            .and_then(|record| self.sink.publish(record))
            .unwrap_or_else(|err| {
                error!("Failed to publish an event from {}: {}", logger, err);
            })
    }
}

#[cfg(test)]
mod smoke {
    use super::*;
    use crate::factory::{create_rule, create_rule_all_events, create_rule_with_level};
    use crate::loglevel::LogLevelSelector;
    use crate::notifier::FilterChangeNotifier;
    use crate::record::RecordBuffer;

    use tracing_subscriber::{
        layer::SubscriberExt, // Needed to get `with()`
        registry::Registry,
    };

    #[test]
    fn test_publishes_only_enabled_events() {
        let buffer = Arc::new(RecordBuffer::default());
        let notifier = FilterChangeNotifier::new();
        let layer = AgentLayer::new(Domain::Jul, buffer.clone());
        notifier.register_listener(layer.enabled_rules()).unwrap();
        notifier
            .notify_event_rule_added(
                create_rule_with_level("org.lttng.EventA", LogLevelSelector::range(900)).unwrap(),
            )
            .unwrap();

        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "org.lttng.EventA", "Hello, world!");
            // below the threshold
            tracing::info!(target: "org.lttng.EventA", "not me");
            // no rule for this logger
            tracing::error!(target: "org.lttng.EventB", "nor me");
        });

        let got = buffer.take().unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].logger, "org.lttng.EventA");
        assert_eq!((got[0].level_name, got[0].level), ("warning", 900));
        assert_eq!(got[0].message, "Hello, world!");
        assert_eq!(got[0].domain, Domain::Jul);
    }

    #[test]
    fn test_follows_rule_changes() {
        let buffer = Arc::new(RecordBuffer::default());
        let notifier = FilterChangeNotifier::new();
        let layer = AgentLayer::new(Domain::Log4j, buffer.clone());
        let mirror = layer.enabled_rules();
        notifier.register_listener(mirror.clone()).unwrap();

        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "app", "before");
            notifier.notify_event_rule_added(create_rule_all_events()).unwrap();
            tracing::debug!(target: "app", "during");
            tracing::info!(target: "lttng_ust_agent::notifier", "never published");
            notifier
                .notify_event_rule_removed(&create_rule_all_events())
                .unwrap();
            tracing::info!(target: "app", "after");
        });

        let got = buffer.take().unwrap();
        assert_eq!(got.len(), 1);
        assert!(got[0].to_string().ends_with("log4j:app [debug/10000] during"));
        assert!(mirror.rules().unwrap().is_empty());
    }

    #[test]
    fn test_sink_failures_stay_inside_the_layer() {
        let (tx, rx) = std::sync::mpsc::channel();
        let notifier = FilterChangeNotifier::new();
        let layer = AgentLayer::new(Domain::Log4j2, tx);
        notifier.register_listener(layer.enabled_rules()).unwrap();
        notifier.notify_event_rule_added(create_rule("app")).unwrap();

        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(target: "app", "delivered");
            assert_eq!(rx.recv().unwrap().level, 200);
            drop(rx);
            // The receiver is gone; this is logged, not raised
            tracing::error!(target: "app", "lost");
        });
    }

    #[test]
    fn test_mirror() {
        let notifier = FilterChangeNotifier::new();
        notifier.notify_event_rule_added(create_rule("EventA")).unwrap();
        notifier
            .notify_app_context_enabled("myRetriever", "intCtx")
            .unwrap();
        let mirror = Arc::new(EnabledRules::default());
        notifier.register_listener(mirror.clone()).unwrap();
        assert_eq!(mirror.rules().unwrap(), vec![create_rule("EventA")]);
        assert_eq!(
            mirror.app_contexts().unwrap(),
            vec![AppContext::new("myRetriever", "intCtx")]
        );
        assert!(mirror.is_enabled(Domain::Jul, "EventA", 0).unwrap());
        assert!(!mirror.is_enabled(Domain::Jul, "EventB", 0).unwrap());

        notifier.notify_event_disabled("EventA").unwrap();
        notifier
            .notify_app_context_disabled("myRetriever", "intCtx")
            .unwrap();
        assert!(mirror.rules().unwrap().is_empty());
        assert!(mirror.app_contexts().unwrap().is_empty());
    }

    /// Counts ERROR-level events
    struct Errors(Arc<Mutex<usize>>);

    impl<S: tracing::Subscriber> tracing_subscriber::layer::Layer<S> for Errors {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::ERROR {
                *self.0.lock().unwrap() += 1;
            }
        }
    }

    #[test]
    fn test_poisoned_mirror_still_updates() {
        let mirror = Arc::new(EnabledRules::default());
        mirror.event_rule_added(&create_rule("EventA"));
        {
            let mirror = mirror.clone();
            let _ = std::thread::spawn(move || {
                let _guard = mirror.rules.lock().unwrap();
                panic!("poison the rules");
            })
            .join();
        }
        assert!(mirror.rules().is_err());

        let errors = Arc::new(Mutex::new(0));
        let subscriber = Registry::default().with(Errors(errors.clone()));
        tracing::subscriber::with_default(subscriber, || {
            mirror.event_rule_added(&create_rule("EventB"));
            mirror.event_rule_removed(&create_rule("EventA"));
        });
        assert_eq!(*errors.lock().unwrap(), 1);
        assert_eq!(mirror.rules().unwrap(), vec![create_rule("EventB")]);
    }
}
