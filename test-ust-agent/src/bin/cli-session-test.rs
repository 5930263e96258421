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

//! Drive a live tracing session through the `lttng` tool.
//!
//! Needs a running session daemon; exits non-zero on the first step that fails.

use lttng_ust_agent::{
    loglevel::Domain,
    session::{CliSession, TracingSession},
};
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt, // Needed to get `with()`
    registry::Registry,
};

fn check(what: &str, ok: bool) {
    if !ok {
        eprintln!("{} failed", what);
        std::process::exit(1);
    }
    println!("{}: ok", what);
}

pub fn main() {
    // Show the commands as they're run...
    let subscriber = Registry::default().with(fmt::layer());
    // and install it.
    let _guard = tracing::subscriber::set_default(subscriber);

    let domain = Domain::Jul;
    let warning = domain.level_strings().warning_name;
    let mut session = match CliSession::builder(domain).create() {
        Ok(session) => session,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };

    check(
        "enable-event",
        session.enable_events(&["EventA", "EventB"]).unwrap_or(false),
    );
    check(
        "enable-event --loglevel",
        session.enable_event("EventC", Some(warning), false, None),
    );
    check(
        "enable-event --filter",
        session.enable_event("EventD", None, false, Some("$ctx.x == 1")),
    );
    check(
        "add-context",
        session.enable_app_context("myRetriever", "intCtx"),
    );
    check("start", session.start());
    for event in session.list_events() {
        println!("available: {}", event);
    }
    check("stop", session.stop());
    for line in session.view() {
        println!("{}", line);
    }
    check("disable-event -a", session.disable_all_events());
    check("destroy", session.close());
}
