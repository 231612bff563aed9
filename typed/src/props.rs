// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Typed props
//!
//! Typed props wrap runtime props. Every actor built from them runs behind the system message
//! translator, and typed receiver middleware is lifted into runtime middleware so it runs at
//! the same point of the runtime chain.
//!
//! A lifted middleware re-derives its typed view on every invocation: a runtime context that
//! returns `Some` from `as_context` is wrapped as a full [`ContextWrapper`], anything else as a
//! [`ReceiverContextWrapper`].
//!

use crate::{
    actor::{Actor, ActorWrapper, ReceiveFunc},
    context::{Context, ContextWrapper, ReceiverContext, ReceiverContextWrapper},
    messages::message_converter,
    supervision::{SupervisorStrategy, SupervisorStrategyAdapter},
};

use actor::{MessageEnvelope, SenderMiddleware};

use std::sync::Arc;

/// Creates a fresh typed actor.
pub type Producer = Arc<dyn Fn() -> Box<dyn Actor> + Send + Sync>;

/// Step of the typed receive pipeline.
pub type ReceiverFunc =
    Arc<dyn Fn(&mut dyn ReceiverContext, MessageEnvelope) + Send + Sync>;

/// Wraps the next typed receive step.
pub type ReceiverMiddleware =
    Arc<dyn Fn(ReceiverFunc) -> ReceiverFunc + Send + Sync>;

/// Typed actor spawn configuration.
#[derive(Clone)]
pub struct Props {
    inner: actor::Props,
}

impl Props {
    /// Props for typed actors built by `producer`.
    pub fn from_producer<F>(producer: F) -> Self
    where
        F: Fn() -> Box<dyn Actor> + Send + Sync + 'static,
    {
        let inner = actor::Props::from_producer(move || {
            Box::new(ActorWrapper::new(producer())) as Box<dyn actor::Actor>
        })
        .with_receiver_middleware([
            Arc::new(message_converter) as actor::ReceiverMiddleware
        ]);
        Self { inner }
    }

    /// Props for an actor that is a plain function.
    pub fn from_func<F>(receive: F) -> Self
    where
        F: Fn(&mut dyn Context) + Send + Sync + 'static,
    {
        let receive = ReceiveFunc::new(receive);
        Self::from_producer(move || Box::new(receive.clone()) as Box<dyn Actor>)
    }

    /// Appends typed receiver middleware. The first one supplied runs first.
    pub fn with_receiver_middleware<I>(self, middleware: I) -> Self
    where
        I: IntoIterator<Item = ReceiverMiddleware>,
    {
        Self {
            inner: self
                .inner
                .with_receiver_middleware(middleware.into_iter().map(lift_middleware)),
        }
    }

    /// Appends runtime sender middleware.
    pub fn with_sender_middleware<I>(self, middleware: I) -> Self
    where
        I: IntoIterator<Item = SenderMiddleware>,
    {
        Self {
            inner: self.inner.with_sender_middleware(middleware),
        }
    }

    /// Strategy used for the children of actors spawned with these props.
    pub fn with_supervisor(self, strategy: Arc<dyn SupervisorStrategy>) -> Self {
        Self {
            inner: self
                .inner
                .with_supervisor(Arc::new(SupervisorStrategyAdapter::new(strategy))),
        }
    }

    /// The runtime props.
    pub fn proto(&self) -> &actor::Props {
        &self.inner
    }
}

/// Turns a typed middleware into a runtime one.
fn lift_middleware(middleware: ReceiverMiddleware) -> actor::ReceiverMiddleware {
    Arc::new(move |next: actor::ReceiverFunc| {
        let continuation: ReceiverFunc = Arc::new(
            move |ctx: &mut dyn ReceiverContext, envelope: MessageEnvelope| {
                next(ctx.proto_receiver_context(), envelope)
            },
        );
        let typed = middleware(continuation);
        Arc::new(
            move |ctx: &mut dyn actor::ReceiverContext, envelope: MessageEnvelope| {
                match ctx.as_context() {
                    Some(full) => typed(&mut ContextWrapper::new(full), envelope),
                    None => typed(&mut ReceiverContextWrapper::new(ctx), envelope),
                }
            },
        ) as actor::ReceiverFunc
    })
}
