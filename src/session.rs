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
//! Tracing session control via the `lttng` command line tool.
//!
//! [`TracingSession`] is the control surface the rest of the world uses to enable & disable agent
//! events; [`CliSession`] implements it by running `lttng`. Every operation is one external
//! process, run to completion: a session is not meant to be driven from more than one thread at
//! a time, which is why the operations take `&mut self`.
//!
//! A command that exits non-zero (or that can't be started at all) is reported as `false`, not
//! as an error; callers must check. Only calls that make no sense (an empty list of event
//! names, say) are rejected with [`Error::InvalidArgument`], before anything is run.
//!
//! # Examples
//!
//! ```no_run
//! use lttng_ust_agent::loglevel::Domain;
//! use lttng_ust_agent::session::{CliSession, TracingSession};
//!
//! let mut session = CliSession::builder(Domain::Jul).create().unwrap();
//! assert!(session.enable_events(&["EventA", "EventB"]).unwrap());
//! assert!(session.start());
//! // ...
//! assert!(session.stop());
//! let lines = session.view();
//! assert!(session.close());
//! ```

use crate::error::{Error, Result};
use crate::loglevel::Domain;

use backtrace::Backtrace;
use chrono::prelude::*;
use tracing::{debug, warn};

use std::{
    path::{Path, PathBuf},
    process::Command,
};

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                      the control surface                                       //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Operations all tracing session implementations must support.
pub trait TracingSession {
    /// Enable `name`, optionally restricted to log level `level` (and more severe, unless
    /// `level_only`) & to events satisfying `filter`.
    fn enable_event(
        &mut self,
        name: &str,
        level: Option<&str>,
        level_only: bool,
        filter: Option<&str>,
    ) -> bool;
    /// Enable each of `names`, which may not be empty.
    fn enable_events(&mut self, names: &[&str]) -> Result<bool>;
    fn enable_all_events(&mut self) -> bool;
    /// Disable each of `names`, which may not be empty.
    fn disable_events(&mut self, names: &[&str]) -> Result<bool>;
    fn disable_all_events(&mut self) -> bool;
    /// Add application context `$app.<retriever>:<name>` to the session's channel.
    fn enable_app_context(&mut self, retriever: &str, name: &str) -> bool;
    fn start(&mut self) -> bool;
    fn stop(&mut self) -> bool;
    /// The events the domain's registered applications offer.
    fn list_events(&mut self) -> Vec<String>;
    /// The session's trace, one event per line.
    fn view(&mut self) -> Vec<String>;
    /// Destroy the session.
    fn close(self) -> bool
    where
        Self: Sized;
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                        struct CliSession                                       //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A tracing session driven through the `lttng` tool.
#[derive(Debug)]
pub struct CliSession {
    lttng: PathBuf,
    domain: Domain,
    name: String,
}

/// Configure & create a [`CliSession`].
pub struct CliSessionBuilder {
    lttng: PathBuf,
    domain: Domain,
    name: Option<String>,
}

impl CliSessionBuilder {
    /// Use the `lttng` binary at `path` rather than the first one on `PATH`.
    pub fn lttng<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.lttng = path.as_ref().to_path_buf();
        self
    }
    /// Name the session; by default a unique name is generated from the current time.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }
    /// Build the session object without running anything.
    pub fn build(self) -> CliSession {
        CliSession {
            lttng: self.lttng,
            domain: self.domain,
            name: self.name.unwrap_or_else(generated_name),
        }
    }
    /// Build the session object & run `lttng create`.
    pub fn create(self) -> Result<CliSession> {
        let session = self.build();
        if !session.execute(&session.create_args()) {
            return Err(Error::Command {
                source: format!("failed to create tracing session {}", session.name).into(),
                back: Backtrace::new(),
            });
        }
        debug!("Created tracing session {}", session.name);
        Ok(session)
    }
}

fn generated_name() -> String {
    format!("ust-agent-{}", Utc::now().format("%Y%m%d-%H%M%S-%6f"))
}

fn to_strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// Pick the event names out of `lttng list -j|-l` output: they're the lines of the form
/// `- <name>`, possibly followed by annotations.
pub fn parse_event_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("- "))
        .filter_map(|rest| rest.split_whitespace().next())
        .map(|name| name.to_string())
        .collect()
}

impl CliSession {
    pub fn builder(domain: Domain) -> CliSessionBuilder {
        CliSessionBuilder {
            lttng: PathBuf::from("lttng"),
            domain,
            name: None,
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn domain(&self) -> Domain {
        self.domain
    }

    fn create_args(&self) -> Vec<String> {
        to_strings(&["create", self.name.as_str()])
    }
    fn enable_event_args(
        &self,
        name: &str,
        level: Option<&str>,
        level_only: bool,
        filter: Option<&str>,
    ) -> Vec<String> {
        let mut args = to_strings(&["enable-event", self.domain.cli_flag(), name]);
        if let Some(level) = level {
            let opt = if level_only {
                "--loglevel-only"
            } else {
                "--loglevel"
            };
            args.extend(to_strings(&[opt, level]));
        }
        if let Some(filter) = filter {
            args.extend(to_strings(&["--filter", filter]));
        }
        args.extend(to_strings(&["-s", self.name.as_str()]));
        args
    }
    fn event_list_args(&self, verb: &str, names: &[&str]) -> Result<Vec<String>> {
        if names.is_empty() {
            return Err(Error::invalid_argument(format!(
                "{} needs at least one event name",
                verb
            )));
        }
        Ok(to_strings(&[
            verb,
            self.domain.cli_flag(),
            names.join(",").as_str(),
            "-s",
            self.name.as_str(),
        ]))
    }
    fn enable_all_args(&self) -> Vec<String> {
        to_strings(&[
            "enable-event",
            self.domain.cli_flag(),
            "*",
            "-s",
            self.name.as_str(),
        ])
    }
    fn disable_all_args(&self) -> Vec<String> {
        to_strings(&[
            "disable-event",
            self.domain.cli_flag(),
            "-a",
            "-s",
            self.name.as_str(),
        ])
    }
    fn add_context_args(&self, retriever: &str, name: &str) -> Vec<String> {
        to_strings(&[
            "add-context",
            self.domain.cli_flag(),
            "-t",
            format!("$app.{}:{}", retriever, name).as_str(),
            "-s",
            self.name.as_str(),
        ])
    }

    /// Run `lttng` with `args`, returning its standard output if it succeeded.
    fn run(&self, args: &[String]) -> Option<String> {
        debug!("Running {} {}", self.lttng.display(), args.join(" "));
        let output = match Command::new(&self.lttng).args(args).output() {
            Ok(output) => output,
            Err(err) => {
                warn!("Couldn't run {}: {}", self.lttng.display(), err);
                return None;
            }
        };
        if output.status.success() {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            warn!(
                "lttng {} exited with {}: {}",
                args.first().map(|s| s.as_str()).unwrap_or(""),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            None
        }
    }
    fn execute(&self, args: &[String]) -> bool {
        self.run(args).is_some()
    }
}

impl TracingSession for CliSession {
    fn enable_event(
        &mut self,
        name: &str,
        level: Option<&str>,
        level_only: bool,
        filter: Option<&str>,
    ) -> bool {
        self.execute(&self.enable_event_args(name, level, level_only, filter))
    }
    fn enable_events(&mut self, names: &[&str]) -> Result<bool> {
        let args = self.event_list_args("enable-event", names)?;
        Ok(self.execute(&args))
    }
    fn enable_all_events(&mut self) -> bool {
        self.execute(&self.enable_all_args())
    }
    fn disable_events(&mut self, names: &[&str]) -> Result<bool> {
        let args = self.event_list_args("disable-event", names)?;
        Ok(self.execute(&args))
    }
    fn disable_all_events(&mut self) -> bool {
        self.execute(&self.disable_all_args())
    }
    fn enable_app_context(&mut self, retriever: &str, name: &str) -> bool {
        self.execute(&self.add_context_args(retriever, name))
    }
    fn start(&mut self) -> bool {
        self.execute(&to_strings(&["start", self.name.as_str()]))
    }
    fn stop(&mut self) -> bool {
        self.execute(&to_strings(&["stop", self.name.as_str()]))
    }
    fn list_events(&mut self) -> Vec<String> {
        self.run(&to_strings(&["list", self.domain.cli_flag()]))
            .map(|out| parse_event_list(&out))
            .unwrap_or_default()
    }
    fn view(&mut self) -> Vec<String> {
        self.run(&to_strings(&["view", self.name.as_str()]))
            .map(|out| out.lines().map(|l| l.to_string()).collect())
            .unwrap_or_default()
    }
    fn close(self) -> bool {
        let ok = self.execute(&to_strings(&["destroy", self.name.as_str()]));
        if ok {
            debug!("Destroyed tracing session {}", self.name);
        }
        ok
    }
}

#[cfg(test)]
mod session_tests {
    use super::*;
    use crate::factory::{
        create_rule, create_rule_all_events, create_rule_with_filter, create_rule_with_level,
    };
    use crate::loglevel::LogLevelSelector;
    use crate::notifier::{test_listener::TestListener, FilterChangeNotifier};

    use std::sync::Arc;

    fn session(domain: Domain) -> CliSession {
        CliSession::builder(domain).name("test-session").build()
    }

    #[test]
    fn test_enable_event_args() {
        let s = session(Domain::Jul);
        assert_eq!(
            s.enable_event_args("EventA", None, false, None),
            ["enable-event", "-j", "EventA", "-s", "test-session"]
        );
        assert_eq!(
            s.enable_event_args("EventA", Some("warning"), false, Some("a == 1")),
            [
                "enable-event",
                "-j",
                "EventA",
                "--loglevel",
                "warning",
                "--filter",
                "a == 1",
                "-s",
                "test-session"
            ]
        );
        let s = session(Domain::Log4j);
        assert_eq!(
            s.enable_event_args("EventA", Some("info"), true, None),
            [
                "enable-event",
                "-l",
                "EventA",
                "--loglevel-only",
                "info",
                "-s",
                "test-session"
            ]
        );
    }

    #[test]
    fn test_event_list_args() {
        let s = session(Domain::Log4j2);
        assert_eq!(
            s.event_list_args("enable-event", &["EventA", "EventB"])
                .unwrap(),
            ["enable-event", "--log4j2", "EventA,EventB", "-s", "test-session"]
        );
        assert!(matches!(
            s.event_list_args("disable-event", &[]),
            Err(Error::InvalidArgument { .. })
        ));
        assert_eq!(
            s.enable_all_args(),
            ["enable-event", "--log4j2", "*", "-s", "test-session"]
        );
        assert_eq!(
            s.disable_all_args(),
            ["disable-event", "--log4j2", "-a", "-s", "test-session"]
        );
        assert_eq!(
            s.add_context_args("myRetriever", "intCtx"),
            [
                "add-context",
                "--log4j2",
                "-t",
                "$app.myRetriever:intCtx",
                "-s",
                "test-session"
            ]
        );
    }

    #[test]
    fn test_empty_names_fail_before_running() {
        // This binary doesn't exist; if we tried to run it we'd get `Ok(false)`
        let mut s = CliSession::builder(Domain::Jul)
            .lttng("/no/such/lttng")
            .name("x")
            .build();
        assert!(matches!(
            s.enable_events(&[]),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            s.disable_events(&[]),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(!s.enable_events(&["EventA"]).unwrap());
        assert!(!s.start());
        assert!(s.list_events().is_empty());
        assert!(!s.close());
    }

    #[test]
    fn test_creation_failure() {
        let err = CliSession::builder(Domain::Jul)
            .lttng("/no/such/lttng")
            .create();
        assert!(matches!(err, Err(Error::Command { .. })));
    }

    #[test]
    fn test_generated_names_are_distinct() {
        let a = CliSession::builder(Domain::Jul).build();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = CliSession::builder(Domain::Jul).build();
        assert!(a.name().starts_with("ust-agent-"));
        assert_ne!(a.name(), b.name());
    }

    #[test]
    fn test_parse_event_list() {
        let out = "\
Java events (Logger name):
-------------------------
      PID: 4242 - Name: /usr/bin/java
            - org.lttng.EventA [disabled]
            - org.lttng.EventB
";
        assert_eq!(
            parse_event_list(out),
            vec!["org.lttng.EventA".to_string(), "org.lttng.EventB".to_string()]
        );
        assert!(parse_event_list("").is_empty());
    }

    /// Stands in for the session daemon: every command is reflected to the agent's notifier the
    /// way the daemon would report it.
    struct LoopbackSession {
        domain: Domain,
        notifier: Arc<FilterChangeNotifier>,
    }

    impl TracingSession for LoopbackSession {
        fn enable_event(
            &mut self,
            name: &str,
            level: Option<&str>,
            level_only: bool,
            filter: Option<&str>,
        ) -> bool {
            let strings = self.domain.level_strings();
            let selector = match level {
                None => LogLevelSelector::UNSPECIFIED,
                Some(l) => {
                    let value = if l == strings.warning_name {
                        strings.warning_level
                    } else {
                        strings.info_level
                    };
                    if level_only {
                        LogLevelSelector::single(value)
                    } else {
                        LogLevelSelector::range(value)
                    }
                }
            };
            let rule = match filter {
                Some(f) => create_rule_with_filter(name, selector, f),
                None => create_rule_with_level(name, selector),
            };
            rule.and_then(|r| self.notifier.notify_event_rule_added(r))
                .unwrap_or(false)
        }
        fn enable_events(&mut self, names: &[&str]) -> Result<bool> {
            if names.is_empty() {
                return Err(Error::invalid_argument("no names"));
            }
            for name in names {
                self.notifier.notify_event_rule_added(create_rule(name))?;
            }
            Ok(true)
        }
        fn enable_all_events(&mut self) -> bool {
            self.notifier
                .notify_event_rule_added(create_rule_all_events())
                .unwrap_or(false)
        }
        fn disable_events(&mut self, names: &[&str]) -> Result<bool> {
            if names.is_empty() {
                return Err(Error::invalid_argument("no names"));
            }
            for name in names {
                self.notifier.notify_event_disabled(name)?;
            }
            Ok(true)
        }
        fn disable_all_events(&mut self) -> bool {
            // One removal per enabled rule, as the daemon does it
            match self.notifier.rules() {
                Ok(rules) => rules
                    .iter()
                    .all(|r| self.notifier.notify_event_rule_removed(r).unwrap_or(false)),
                Err(_) => false,
            }
        }
        fn enable_app_context(&mut self, retriever: &str, name: &str) -> bool {
            self.notifier
                .notify_app_context_enabled(retriever, name)
                .unwrap_or(false)
        }
        fn start(&mut self) -> bool {
            true
        }
        fn stop(&mut self) -> bool {
            true
        }
        fn list_events(&mut self) -> Vec<String> {
            Vec::new()
        }
        fn view(&mut self) -> Vec<String> {
            Vec::new()
        }
        fn close(self) -> bool {
            true
        }
    }

    #[test]
    fn test_expected_rules_match_observed_rules() {
        let notifier = Arc::new(FilterChangeNotifier::new());
        let listener = Arc::new(TestListener::default());
        notifier.register_listener(listener.clone()).unwrap();
        let mut session = LoopbackSession {
            domain: Domain::Jul,
            notifier: notifier.clone(),
        };

        assert!(session.enable_event("EventA", Some("warning"), false, None));
        assert!(session.enable_event("EventB", None, false, Some("$ctx.x == 2")));
        assert!(session.enable_events(&["EventC"]).unwrap());

        let expected = vec![
            create_rule_with_level("EventA", LogLevelSelector::range(900)).unwrap(),
            create_rule_with_filter("EventB", LogLevelSelector::UNSPECIFIED, "$ctx.x == 2")
                .unwrap(),
            create_rule("EventC"),
        ];
        assert_eq!(listener.current(), expected);

        assert!(session.disable_all_events());
        assert_eq!(listener.removed(), 3);
        assert!(listener.current().is_empty());
        assert!(session.close());
    }

    #[test]
    #[cfg(feature = "lttng")]
    fn test_live_session() {
        let mut session = CliSession::builder(Domain::Jul).create().unwrap();
        assert!(session.enable_events(&["EventA", "EventB"]).unwrap());
        assert!(session.enable_event("EventC", Some("warning"), false, None));
        assert!(session.enable_app_context("myRetriever", "intCtx"));
        assert!(session.start());
        assert!(session.stop());
        assert!(session.disable_all_events());
        let _lines = session.view();
        assert!(session.close());
    }
}
