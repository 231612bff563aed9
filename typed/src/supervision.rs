// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Typed supervision
//!
//! A typed [`SupervisorStrategy`] sees the typed actor system and a typed address of the failed
//! child. It plugs into the runtime's decision point through an adapter; the directives it
//! applies are the runtime's own.
//!

use crate::{
    Pid,
    system::{ActorSystem, wrap_actor_system},
};

use actor::Message;

use std::sync::Arc;

pub use actor::{
    AllForOneStrategy, Decider, Directive, ExponentialBackoffStrategy,
    OneForOneStrategy, Reason, RestartStatistics, RestartingStrategy, Supervisor,
    default_decider,
};

/// Failure handling policy with typed arguments.
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

type StrategyFn = dyn Fn(
        &ActorSystem,
        &mut dyn Supervisor,
        &Pid,
        &RestartStatistics,
        &Reason,
        Option<&Message>,
    ) + Send
    + Sync;

/// Strategy that is a plain function.
#[derive(Clone)]
pub struct SupervisorStrategyFunc(Arc<StrategyFn>);

impl SupervisorStrategyFunc {
    pub fn new<F>(strategy: F) -> Self
    where
        F: Fn(
                &ActorSystem,
                &mut dyn Supervisor,
                &Pid,
                &RestartStatistics,
                &Reason,
                Option<&Message>,
            ) + Send
            + Sync
            + 'static,
    {
        Self(Arc::new(strategy))
    }
}

impl SupervisorStrategy for SupervisorStrategyFunc {
    fn handle_failure(
        &self,
        system: &ActorSystem,
        supervisor: &mut dyn Supervisor,
        child: &Pid,
        restart_stats: &RestartStatistics,
        reason: &Reason,
        message: Option<&Message>,
    ) {
        (self.0)(system, supervisor, child, restart_stats, reason, message)
    }
}

/// The runtime default strategy behind the typed interface: one-for-one, at most 10
/// restarts within 10 seconds, always restarting.
pub fn default_supervisor_strategy() -> Arc<dyn SupervisorStrategy> {
    let strategy = actor::default_strategy();
    Arc::new(SupervisorStrategyFunc::new(
        move |system, supervisor, child, restart_stats, reason, message| {
            strategy.handle_failure(
                system.proto(),
                supervisor,
                child.proto(),
                restart_stats,
                reason,
                message,
            )
        },
    ))
}

/// Runs a typed strategy at the runtime's decision point.
pub(crate) struct SupervisorStrategyAdapter {
    strategy: Arc<dyn SupervisorStrategy>,
}

impl SupervisorStrategyAdapter {
    pub(crate) fn new(strategy: Arc<dyn SupervisorStrategy>) -> Self {
        Self { strategy }
    }
}

impl actor::SupervisorStrategy for SupervisorStrategyAdapter {
    fn handle_failure(
        &self,
        system: &actor::ActorSystem,
        supervisor: &mut dyn Supervisor,
        child: &actor::Pid,
        restart_stats: &RestartStatistics,
        reason: &Reason,
        message: Option<&Message>,
    ) {
        let child = Pid::new(supervisor.context_handle(), child.clone());
        self.strategy.handle_failure(
            &wrap_actor_system(system.clone()),
            supervisor,
            &child,
            restart_stats,
            reason,
            message,
        );
    }
}
