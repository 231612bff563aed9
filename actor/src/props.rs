// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Props
//!
//! Spawn configuration: how to produce the actor and which middleware and supervisor to
//! install around it. Builders consume and return the props, so a `Props` value never
//! changes once built.
//!

use crate::{
    Actor, MessageEnvelope, Pid,
    actor::ReceiveFunc,
    context::{Context, ContextHandle, ReceiverContext},
    supervision::SupervisorStrategy,
};

use std::sync::Arc;

/// Creates a fresh actor instance, once per incarnation.
pub type Producer = Arc<dyn Fn() -> Box<dyn Actor> + Send + Sync>;

/// Step of the receive pipeline.
pub type ReceiverFunc =
    Arc<dyn Fn(&mut dyn ReceiverContext, MessageEnvelope) + Send + Sync>;

/// Wraps the next receive step.
pub type ReceiverMiddleware =
    Arc<dyn Fn(ReceiverFunc) -> ReceiverFunc + Send + Sync>;

/// Step of the send pipeline.
pub type SenderFunc =
    Arc<dyn Fn(&ContextHandle, &Pid, MessageEnvelope) + Send + Sync>;

/// Wraps the next send step.
pub type SenderMiddleware = Arc<dyn Fn(SenderFunc) -> SenderFunc + Send + Sync>;

/// Actor spawn configuration.
#[derive(Clone)]
pub struct Props {
    producer: Producer,
    receiver_middleware: Vec<ReceiverMiddleware>,
    sender_middleware: Vec<SenderMiddleware>,
    supervisor: Option<Arc<dyn SupervisorStrategy>>,
}

impl Props {
    /// Props for actors built by `producer`.
    pub fn from_producer<F>(producer: F) -> Self
    where
        F: Fn() -> Box<dyn Actor> + Send + Sync + 'static,
    {
        Self {
            producer: Arc::new(producer),
            receiver_middleware: vec![],
            sender_middleware: vec![],
            supervisor: None,
        }
    }

    /// Props for an actor that is a plain function.
    pub fn from_func<F>(receive: F) -> Self
    where
        F: Fn(&mut dyn Context) + Send + Sync + 'static,
    {
        let receive = ReceiveFunc::new(receive);
        Self::from_producer(move || Box::new(receive.clone()) as Box<dyn Actor>)
    }

    /// Appends receiver middleware. The first one supplied runs first.
    pub fn with_receiver_middleware<I>(mut self, middleware: I) -> Self
    where
        I: IntoIterator<Item = ReceiverMiddleware>,
    {
        self.receiver_middleware.extend(middleware);
        self
    }

    /// Appends sender middleware. The first one supplied runs first.
    pub fn with_sender_middleware<I>(mut self, middleware: I) -> Self
    where
        I: IntoIterator<Item = SenderMiddleware>,
    {
        self.sender_middleware.extend(middleware);
        self
    }

    /// Strategy used for the children of actors spawned with these props.
    pub fn with_supervisor(mut self, strategy: Arc<dyn SupervisorStrategy>) -> Self {
        self.supervisor = Some(strategy);
        self
    }

    pub fn receiver_middleware(&self) -> &[ReceiverMiddleware] {
        &self.receiver_middleware
    }

    pub fn sender_middleware(&self) -> &[SenderMiddleware] {
        &self.sender_middleware
    }

    pub fn supervisor_strategy(&self) -> Option<Arc<dyn SupervisorStrategy>> {
        self.supervisor.clone()
    }

    pub(crate) fn produce(&self) -> Box<dyn Actor> {
        (self.producer)()
    }
}

/// Folds `middleware` around `last`.
pub fn make_receiver_middleware_chain(
    middleware: &[ReceiverMiddleware],
    last: ReceiverFunc,
) -> ReceiverFunc {
    middleware
        .iter()
        .rev()
        .fold(last, |next, middleware| middleware(next))
}

/// Folds `middleware` around `last`.
pub fn make_sender_middleware_chain(
    middleware: &[SenderMiddleware],
    last: SenderFunc,
) -> SenderFunc {
    middleware
        .iter()
        .rev()
        .fold(last, |next, middleware| middleware(next))
}
