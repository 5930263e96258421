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
//! Relaying event rule changes to interested parties.
//!
//! The agent learns about enabled & disabled events from the session daemon, one message at a
//! time. [`FilterChangeNotifier`] keeps the canonical set of currently-enabled [`EventRule`]s (and
//! application contexts) and fans every change out to the [`FilterChangeListener`]s registered
//! with it. A listener that registers late is first handed a "statedump": one synthetic
//! `event_rule_added` per rule already enabled, so it never needs to have been around for the
//! earlier messages.
//!
//! # Examples
//!
//! ```rust
//! use lttng_ust_agent::factory::create_rule;
//! use lttng_ust_agent::notifier::FilterChangeNotifier;
//! use lttng_ust_agent::layer::EnabledRules;
//! use std::sync::Arc;
//!
//! let notifier = Arc::new(FilterChangeNotifier::new());
//! notifier.notify_event_rule_added(create_rule("EventA")).unwrap();
//!
//! let mirror = Arc::new(EnabledRules::default());
//! notifier.register_listener(mirror.clone()).unwrap();
//! assert_eq!(mirror.rules().unwrap(), vec![create_rule("EventA")]);
//! ```
//!
//! # Locking
//!
//! The rule set & application contexts live under one lock, held while a change is applied &
//! delivered, and while a registering listener gets its statedump. "Read the rule set & send the
//! statedump" is therefore atomic with respect to concurrent additions & removals: a registering
//! listener can neither miss nor see twice a rule being added at the same moment, and every
//! listener hears about changes in the order they were applied.
//!
//! The listener list has a lock of its own. Each change is delivered to a snapshot of the list
//! taken when delivery starts, so a callback may unregister any listener (itself included); a
//! listener unregistered mid-delivery may still hear about the change in progress, but nothing
//! after it. A callback may also register a listener: that listener gets its statedump as soon
//! as the change in progress has been delivered, and isn't part of that delivery. Anything else a
//! callback asks of the notifier that delivered to it fails with [`Error::Reentrant`].

use crate::error::{Error, Result};
use crate::rule::EventRule;

use tracing::{debug, error};

use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread::{self, ThreadId},
};

/// Operations all observers of event rule changes must support.
///
/// Callbacks are made on whatever thread reported the change, one change at a time.
pub trait FilterChangeListener: Send + Sync {
    /// `rule` was enabled (or was already enabled when this listener registered)
    fn event_rule_added(&self, rule: &EventRule);
    /// `rule` was disabled
    fn event_rule_removed(&self, rule: &EventRule);
    /// Application context `$app.<retriever>:<name>` was enabled
    fn app_context_enabled(&self, _retriever: &str, _name: &str) {}
    /// Application context `$app.<retriever>:<name>` was disabled
    fn app_context_disabled(&self, _retriever: &str, _name: &str) {}
}

/// An application context: a named piece of data, scoped to a retriever, that the application
/// offers the tracer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AppContext {
    pub retriever: String,
    pub name: String,
}

impl AppContext {
    pub fn new<S1: Into<String>, S2: Into<String>>(retriever: S1, name: S2) -> AppContext {
        AppContext {
            retriever: retriever.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "$app.{}:{}", self.retriever, self.name)
    }
}

type Listener = Arc<dyn FilterChangeListener>;

struct State {
    open: bool,
    // Insertion order, so the statedump order is stable
    rules: Vec<EventRule>,
    contexts: Vec<AppContext>,
}

#[derive(Default)]
struct Listeners {
    active: Vec<Listener>,
    // Registered from inside a callback; promoted (with a statedump) once that delivery is done
    pending: Vec<Listener>,
}

/// Invoke one listener callback; a panicking listener is logged & skipped so the others still
/// hear about the change.
fn deliver<F: FnOnce()>(what: &str, f: F) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        error!("A filter change listener panicked while handling {}", what);
    }
}

fn statedump(state: &State, listener: &Listener) {
    debug!(
        "Sending a filter change listener {} rule(s) & {} context(s)",
        state.rules.len(),
        state.contexts.len()
    );
    for rule in &state.rules {
        deliver("the statedump", || listener.event_rule_added(rule));
    }
    for ctx in &state.contexts {
        deliver("the statedump", || {
            listener.app_context_enabled(&ctx.retriever, &ctx.name)
        });
    }
}

fn same_listener<L: FilterChangeListener + ?Sized>(a: &Listener, b: &Arc<L>) -> bool {
    // Compare data pointers only; vtable pointers for the same type may differ across codegen
    // units.
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

struct Delivery<'a>(&'a Mutex<Option<ThreadId>>);

impl Drop for Delivery<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// The hub between the agent's session daemon channel and everything that wants to track the
/// enabled event rules.
///
/// Create one with [`FilterChangeNotifier::new`], share it via [`Arc`] with the channel reader
/// & any consumers, and call [`FilterChangeNotifier::shutdown`] when done.
pub struct FilterChangeNotifier {
    state: Mutex<State>,
    listeners: Mutex<Listeners>,
    // The thread currently delivering callbacks, if any
    delivering: Mutex<Option<ThreadId>>,
}

impl std::default::Default for FilterChangeNotifier {
    fn default() -> Self {
        FilterChangeNotifier {
            state: Mutex::new(State {
                open: true,
                rules: Vec::new(),
                contexts: Vec::new(),
            }),
            listeners: Mutex::new(Listeners::default()),
            delivering: Mutex::new(None),
        }
    }
}

impl FilterChangeNotifier {
    pub fn new() -> FilterChangeNotifier {
        FilterChangeNotifier::default()
    }

    fn in_callback(&self) -> Result<bool> {
        Ok(*self.delivering.lock()? == Some(thread::current().id()))
    }

    /// Lock the rule set for `what`, refusing if that would deadlock
    fn lock_state(&self, what: &'static str) -> Result<MutexGuard<'_, State>> {
        if self.in_callback()? {
            return Err(Error::reentrant(what));
        }
        Ok(self.state.lock()?)
    }

    fn lock_open(&self, what: &'static str) -> Result<MutexGuard<'_, State>> {
        let guard = self.lock_state(what)?;
        if !guard.open {
            return Err(Error::ShutDown);
        }
        Ok(guard)
    }

    /// Mark this thread as the one making callbacks until the returned guard is dropped.
    fn start_delivery(&self) -> Result<Delivery<'_>> {
        *self.delivering.lock()? = Some(thread::current().id());
        Ok(Delivery(&self.delivering))
    }

    /// Run `f` against a snapshot of the listeners, then hand out the statedumps owed to any
    /// listeners registered along the way. `state` is the caller's view of the locked rule set.
    fn dispatch<F: Fn(&Listener)>(&self, state: &State, f: F) -> Result<()> {
        let snapshot = self.listeners.lock()?.active.clone();
        let _delivery = self.start_delivery()?;
        for listener in &snapshot {
            f(listener);
        }
        self.promote_pending(state)
    }

    fn promote_pending(&self, state: &State) -> Result<()> {
        loop {
            let pending = std::mem::take(&mut self.listeners.lock()?.pending);
            if pending.is_empty() {
                return Ok(());
            }
            for listener in pending {
                self.listeners.lock()?.active.push(listener.clone());
                statedump(state, &listener);
            }
        }
    }

    /// Register `listener` & send it the statedump: one `event_rule_added` per enabled rule, then
    /// one `app_context_enabled` per enabled context. Every later change is delivered after the
    /// statedump.
    pub fn register_listener(&self, listener: Arc<dyn FilterChangeListener>) -> Result<()> {
        if self.in_callback()? {
            debug!("Deferring the registration of a filter change listener");
            self.listeners.lock()?.pending.push(listener);
            return Ok(());
        }
        let state = self.lock_open("register_listener")?;
        self.listeners.lock()?.active.push(listener.clone());
        debug!("Registered a filter change listener");
        let _delivery = self.start_delivery()?;
        statedump(&state, &listener);
        self.promote_pending(&state)
    }

    /// Remove `listener`; returns whether it had been registered. Once this returns the listener
    /// won't be called again, save for a change whose delivery was already under way. May be
    /// called from a callback.
    pub fn unregister_listener<L: FilterChangeListener + ?Sized>(
        &self,
        listener: &Arc<L>,
    ) -> Result<bool> {
        let mut listeners = self.listeners.lock()?;
        let Listeners { active, pending } = &mut *listeners;
        for list in [active, pending] {
            if let Some(idx) = list.iter().position(|l| same_listener(l, listener)) {
                list.remove(idx);
                debug!("Unregistered a filter change listener");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// `rule` was enabled. Returns `false` (and tells no one) if it already was.
    pub fn notify_event_rule_added(&self, rule: EventRule) -> Result<bool> {
        let mut state = self.lock_open("notify_event_rule_added")?;
        if state.rules.contains(&rule) {
            debug!("Ignoring a second notification for enabled rule {}", rule);
            return Ok(false);
        }
        debug!("Event rule added: {}", rule);
        state.rules.push(rule.clone());
        self.dispatch(&state, |listener| {
            deliver("an added rule", || listener.event_rule_added(&rule))
        })?;
        Ok(true)
    }

    /// `rule` was disabled. Returns `false` (and tells no one) if it wasn't enabled.
    pub fn notify_event_rule_removed(&self, rule: &EventRule) -> Result<bool> {
        let mut state = self.lock_open("notify_event_rule_removed")?;
        match state.rules.iter().position(|r| r == rule) {
            Some(idx) => {
                let rule = state.rules.remove(idx);
                debug!("Event rule removed: {}", rule);
                self.dispatch(&state, |listener| {
                    deliver("a removed rule", || listener.event_rule_removed(&rule))
                })?;
                Ok(true)
            }
            None => {
                debug!("Ignoring removal of rule {}, which isn't enabled", rule);
                Ok(false)
            }
        }
    }

    /// The event named `name` was disabled: every enabled rule with that pattern goes away, each
    /// reported as its own removal. Returns the number of rules removed.
    pub fn notify_event_disabled(&self, name: &str) -> Result<usize> {
        let mut state = self.lock_open("notify_event_disabled")?;
        let mut removed = 0;
        // Each rule leaves the set just before its own removal is delivered
        while let Some(idx) = state.rules.iter().position(|r| r.event_pattern() == name) {
            let rule = state.rules.remove(idx);
            debug!("Event {} disabled; removing rule {}", name, rule);
            self.dispatch(&state, |listener| {
                deliver("a removed rule", || listener.event_rule_removed(&rule))
            })?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Application context `$app.<retriever>:<name>` was enabled. Returns `false` if it already
    /// was.
    pub fn notify_app_context_enabled(&self, retriever: &str, name: &str) -> Result<bool> {
        let mut state = self.lock_open("notify_app_context_enabled")?;
        let ctx = AppContext::new(retriever, name);
        if state.contexts.contains(&ctx) {
            return Ok(false);
        }
        debug!("Application context enabled: {}", ctx);
        state.contexts.push(ctx);
        self.dispatch(&state, |listener| {
            deliver("an enabled context", || {
                listener.app_context_enabled(retriever, name)
            })
        })?;
        Ok(true)
    }

    /// Application context `$app.<retriever>:<name>` was disabled. Returns `false` if it wasn't
    /// enabled.
    pub fn notify_app_context_disabled(&self, retriever: &str, name: &str) -> Result<bool> {
        let mut state = self.lock_open("notify_app_context_disabled")?;
        let ctx = AppContext::new(retriever, name);
        match state.contexts.iter().position(|c| *c == ctx) {
            Some(idx) => {
                state.contexts.remove(idx);
                debug!("Application context disabled: {}", ctx);
                self.dispatch(&state, |listener| {
                    deliver("a disabled context", || {
                        listener.app_context_disabled(retriever, name)
                    })
                })?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// A snapshot of the enabled rules, in the order they were enabled.
    pub fn rules(&self) -> Result<Vec<EventRule>> {
        Ok(self.lock_open("rules")?.rules.clone())
    }

    /// A snapshot of the enabled application contexts.
    pub fn app_contexts(&self) -> Result<Vec<AppContext>> {
        Ok(self.lock_open("app_contexts")?.contexts.clone())
    }

    pub fn listener_count(&self) -> Result<usize> {
        let listeners = self.listeners.lock()?;
        Ok(listeners.active.len() + listeners.pending.len())
    }

    /// Drop every listener & all tracked state. Every subsequent notification or registration
    /// fails with [`Error::ShutDown`]. Shutting down twice is harmless.
    pub fn shutdown(&self) -> Result<()> {
        let mut state = self.lock_state("shutdown")?;
        if state.open {
            let mut listeners = self.listeners.lock()?;
            debug!(
                "Shutting down the filter change notifier ({} listener(s))",
                listeners.active.len() + listeners.pending.len()
            );
            state.open = false;
            state.rules.clear();
            state.contexts.clear();
            listeners.active.clear();
            listeners.pending.clear();
        }
        Ok(())
    }
}
