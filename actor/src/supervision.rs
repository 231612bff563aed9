// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Supervision strategies
//!
//! When an actor fails while processing a message, its mailbox is suspended and a failure
//! report travels to its parent. The parent's strategy decides what happens to the child:
//! resume it, restart it, stop it or escalate the failure one level up. Actors spawned from
//! the root supervise themselves with the default strategy.
//!

use crate::{
    ActorSystem, Message, Pid, context::InfoPart, mailbox::SystemMessage,
};

use backoff::{ExponentialBackoffBuilder, backoff::Backoff};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use std::{
    any::Any,
    fmt::{Debug, Formatter},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

/// Failure reason. Panics inside `receive` are reported as their message (`String`).
pub type Reason = Arc<dyn Any + Send + Sync>;

/// Decision taken for a failed child.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directive {
    /// Keep the current incarnation and resume the mailbox.
    Resume,
    /// Replace the incarnation with a fresh one from the producer.
    Restart,
    /// Stop the child.
    Stop,
    /// Let the supervisor's own parent decide.
    Escalate,
}

/// Maps a failure reason to a directive.
pub type Decider = Arc<dyn Fn(&Reason) -> Directive + Send + Sync>;

/// Decider that always restarts.
pub fn default_decider() -> Decider {
    Arc::new(|_: &Reason| Directive::Restart)
}

/// Human readable form of a failure reason.
pub fn describe_reason(reason: &Reason) -> String {
    if let Some(text) = reason.downcast_ref::<String>() {
        text.clone()
    } else if let Some(text) = reason.downcast_ref::<&'static str>() {
        (*text).to_owned()
    } else {
        "unknown reason".to_owned()
    }
}

/// Failure history of one actor, shared between the actor and its supervisor.
#[derive(Clone, Default)]
pub struct RestartStatistics {
    failure_times: Arc<Mutex<Vec<Instant>>>,
}

impl RestartStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of recorded failures.
    pub fn failure_count(&self) -> usize {
        self.times().len()
    }

    /// Records a failure now.
    pub fn fail(&self) {
        self.times().push(Instant::now());
    }

    /// Forgets every recorded failure.
    pub fn reset(&self) {
        self.times().clear();
    }

    /// Failures recorded within the last `within`. A zero window counts all failures.
    pub fn number_of_failures(&self, within: Duration) -> usize {
        let times = self.times();
        if within.is_zero() {
            return times.len();
        }
        let recent = times
            .iter()
            .filter(|time| time.elapsed() < within)
            .count();
        recent
    }

    /// Time of the most recent failure.
    pub fn last_failure(&self) -> Option<Instant> {
        self.times().last().copied()
    }

    fn times(&self) -> std::sync::MutexGuard<'_, Vec<Instant>> {
        self.failure_times
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Debug for RestartStatistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestartStatistics")
            .field("failure_count", &self.failure_count())
            .finish()
    }
}

/// The entity that owns failed children and applies directives to them.
pub trait Supervisor: InfoPart {
    /// Currently supervised children.
    fn children(&self) -> Vec<Pid>;
    /// Escalates a failure to this supervisor's own parent.
    fn escalate_failure(&mut self, reason: Reason, message: Option<Message>);
    fn restart_children(&mut self, pids: &[Pid]);
    fn stop_children(&mut self, pids: &[Pid]);
    fn resume_children(&mut self, pids: &[Pid]);
}

/// Failure handling policy.
pub trait SupervisorStrategy: Send + Sync {
    /// Called on the supervisor when `child` failed with `reason` while processing `message`.
    fn handle_failure(
        &self,
        system: &ActorSystem,
        supervisor: &mut dyn Supervisor,
        child: &Pid,
        restart_stats: &RestartStatistics,
        reason: &Reason,
        message: Option<&Message>,
    );
}

fn log_failure(child: &Pid, reason: &Reason, directive: Directive) {
    error!(
        "Actor {} failed: {}. Directive: {:?}.",
        child,
        describe_reason(reason),
        directive
    );
}

/// Applies the directive to the failed child only.
#[derive(Clone)]
pub struct OneForOneStrategy {
    max_nr_of_retries: usize,
    within: Duration,
    decider: Decider,
}

impl OneForOneStrategy {
    pub fn new(max_nr_of_retries: usize, within: Duration, decider: Decider) -> Self {
        Self {
            max_nr_of_retries,
            within,
            decider,
        }
    }

    fn should_stop(&self, restart_stats: &RestartStatistics) -> bool {
        if self.max_nr_of_retries == 0 {
            return true;
        }
        restart_stats.fail();
        if restart_stats.number_of_failures(self.within) > self.max_nr_of_retries {
            restart_stats.reset();
            return true;
        }
        false
    }
}

impl SupervisorStrategy for OneForOneStrategy {
    fn handle_failure(
        &self,
        _system: &ActorSystem,
        supervisor: &mut dyn Supervisor,
        child: &Pid,
        restart_stats: &RestartStatistics,
        reason: &Reason,
        message: Option<&Message>,
    ) {
        let directive = (self.decider)(reason);
        log_failure(child, reason, directive);
        let child = std::slice::from_ref(child);
        match directive {
            Directive::Resume => supervisor.resume_children(child),
            Directive::Restart => {
                if self.should_stop(restart_stats) {
                    supervisor.stop_children(child)
                } else {
                    supervisor.restart_children(child)
                }
            }
            Directive::Stop => supervisor.stop_children(child),
            Directive::Escalate => {
                supervisor.escalate_failure(reason.clone(), message.cloned())
            }
        }
    }
}

/// Applies the directive to every child of the supervisor.
#[derive(Clone)]
pub struct AllForOneStrategy {
    max_nr_of_retries: usize,
    within: Duration,
    decider: Decider,
}

impl AllForOneStrategy {
    pub fn new(max_nr_of_retries: usize, within: Duration, decider: Decider) -> Self {
        Self {
            max_nr_of_retries,
            within,
            decider,
        }
    }
}

impl SupervisorStrategy for AllForOneStrategy {
    fn handle_failure(
        &self,
        _system: &ActorSystem,
        supervisor: &mut dyn Supervisor,
        child: &Pid,
        restart_stats: &RestartStatistics,
        reason: &Reason,
        message: Option<&Message>,
    ) {
        let directive = (self.decider)(reason);
        log_failure(child, reason, directive);
        match directive {
            Directive::Resume => {
                supervisor.resume_children(std::slice::from_ref(child))
            }
            Directive::Restart => {
                let children = supervisor.children();
                let one_for_one = OneForOneStrategy::new(
                    self.max_nr_of_retries,
                    self.within,
                    self.decider.clone(),
                );
                if one_for_one.should_stop(restart_stats) {
                    supervisor.stop_children(&children)
                } else {
                    supervisor.restart_children(&children)
                }
            }
            Directive::Stop => {
                let children = supervisor.children();
                supervisor.stop_children(&children)
            }
            Directive::Escalate => {
                supervisor.escalate_failure(reason.clone(), message.cloned())
            }
        }
    }
}

/// Restarts the failed child unconditionally.
#[derive(Clone, Copy, Debug, Default)]
pub struct RestartingStrategy;

impl SupervisorStrategy for RestartingStrategy {
    fn handle_failure(
        &self,
        _system: &ActorSystem,
        supervisor: &mut dyn Supervisor,
        child: &Pid,
        _restart_stats: &RestartStatistics,
        reason: &Reason,
        _message: Option<&Message>,
    ) {
        log_failure(child, reason, Directive::Restart);
        supervisor.restart_children(std::slice::from_ref(child));
    }
}

/// Restarts the failed child after an exponentially growing delay.
///
/// Failures older than `backoff_window` are forgotten before the delay is computed.
#[derive(Clone, Debug)]
pub struct ExponentialBackoffStrategy {
    backoff_window: Duration,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl ExponentialBackoffStrategy {
    pub fn new(backoff_window: Duration, initial_backoff: Duration) -> Self {
        Self {
            backoff_window,
            initial_backoff,
            max_backoff: backoff_window,
        }
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    fn record_failure(&self, restart_stats: &RestartStatistics) {
        if let Some(last) = restart_stats.last_failure() {
            if last.elapsed() > self.backoff_window {
                restart_stats.reset();
            }
        }
        restart_stats.fail();
    }

    /// Delay before the `failures`-th restart.
    pub fn delay(&self, failures: usize) -> Duration {
        let mut backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_randomization_factor(0.0)
            .with_multiplier(2.0)
            .with_max_interval(self.max_backoff)
            .with_max_elapsed_time(None)
            .build();
        let mut delay = self.initial_backoff;
        for _ in 0..failures.max(1) {
            delay = backoff.next_backoff().unwrap_or(self.max_backoff);
        }
        delay
    }
}

impl SupervisorStrategy for ExponentialBackoffStrategy {
    fn handle_failure(
        &self,
        system: &ActorSystem,
        _supervisor: &mut dyn Supervisor,
        child: &Pid,
        restart_stats: &RestartStatistics,
        reason: &Reason,
        _message: Option<&Message>,
    ) {
        self.record_failure(restart_stats);
        let delay = self.delay(restart_stats.failure_count());
        log_failure(child, reason, Directive::Restart);
        debug!("Restarting actor {} in {:?}.", child, delay);

        let system = system.clone();
        let child = child.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            system.send_system_message(&child, SystemMessage::Restart);
        });
    }
}

/// Strategy used when props do not carry one: one-for-one, at most 10 restarts within
/// 10 seconds, always restarting.
pub fn default_strategy() -> Arc<dyn SupervisorStrategy> {
    Arc::new(OneForOneStrategy::new(
        10,
        Duration::from_secs(10),
        default_decider(),
    ))
}
