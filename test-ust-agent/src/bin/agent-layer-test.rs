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

//! Run [`AgentLayer`] against a hand-fed notifier & print the records it selects.
//!
//! [`AgentLayer`]: lttng_ust_agent::layer::AgentLayer

use lttng_ust_agent::{
    factory::{create_rule, create_rule_with_level},
    layer::AgentLayer,
    loglevel::{Domain, LogLevelSelector},
    notifier::FilterChangeNotifier,
    record::LogRecord,
};
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{
    layer::SubscriberExt, // Needed to get `with()`
    registry::Registry,
};

use std::sync::{mpsc, Arc};

pub fn main() {
    let domain = Domain::Log4j;
    let notifier = Arc::new(FilterChangeNotifier::new());
    let (tx, rx) = mpsc::channel::<LogRecord>();
    let printer = std::thread::spawn(move || {
        // Ends when the layer (and with it the sender) is dropped
        rx.iter().map(|record| println!("{}", record)).count()
    });

    let layer = AgentLayer::new(domain, tx);
    notifier.register_listener(layer.enabled_rules()).unwrap();

    // Stand in for the session daemon: everything from "agent-test", but only warnings & worse
    // from "agent-test.noisy".
    notifier
        .notify_event_rule_added(create_rule("agent-test"))
        .unwrap();
    notifier
        .notify_event_rule_added(
            create_rule_with_level(
                "agent-test.noisy",
                LogLevelSelector::range(domain.level_strings().warning_level),
            )
            .unwrap(),
        )
        .unwrap();

    {
        let subscriber = Registry::default().with(layer);
        let _guard = tracing::subscriber::set_default(subscriber);

        trace!(target: "agent-test", "你好, agent.");
        debug!(target: "agent-test", "你好, agent.");
        info!(target: "agent-test", "你好, agent.");
        info!(target: "agent-test.noisy", "You shouldn't see this.");
        warn!(target: "agent-test.noisy", "你好, agent.");
        error!(target: "agent-test.noisy", "你好, agent.");
    }

    notifier.shutdown().unwrap();
    let printed = printer.join().unwrap();
    if printed != 5 {
        eprintln!("expected 5 records, printed {}", printed);
        std::process::exit(1);
    }
}
