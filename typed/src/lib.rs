// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Typed actors
//!
//! A typed facade over the `actor` runtime. The runtime works with raw addresses and
//! type-erased contexts; this crate exposes the same capabilities through narrower traits,
//! with addresses that remember the context they came from.
//!
//! ## Addresses
//!
//! Every [`Pid`] returned by a context (`spawn`, `self_pid`, `parent`, `sender`, `children`,
//! the `who` of a [`Terminated`] notification) is bound to that context. Telling the address
//! goes through the context's sender middleware.
//!
//! ## Contexts
//!
//! Capabilities are split into facets ([`InfoPart`], [`BasePart`], [`MessagePart`],
//! [`SenderPart`], [`ReceiverPart`], [`SpawnerPart`], [`StopperPart`]) combined into
//! [`Context`], [`ReceiverContext`], [`SenderContext`] and [`SpawnerContext`]. A receiver
//! context is widened to a full context only through [`ReceiverContext::as_context`].
//!
//! ## Middleware
//!
//! Typed receiver middleware registered with [`Props::with_receiver_middleware`] runs in the
//! order supplied, after the translation of runtime `Terminated` notifications. Any middleware
//! may stop the chain by not calling the next step.
//!
//! ## Example
//!
//! ```ignore
//! use typed::{ActorSystem, Context, Props, SpawnerPart};
//! use std::sync::Arc;
//!
//! let system = ActorSystem::new();
//! let mut root = system.root();
//! let pid = root.spawn(&Props::from_func(|ctx: &mut dyn Context| {
//!     if let Some(text) = ctx.message().and_then(|m| m.downcast_ref::<String>().cloned()) {
//!         println!("{}", text);
//!     }
//! }));
//! pid.tell(Arc::new("hello".to_owned()));
//! pid.graceful_stop().await?;
//! ```
//!

mod actor;
mod context;
mod messages;
mod pid;
mod props;
mod supervision;
mod system;

pub use crate::actor::{Actor, ActorFunc, ReceiveFunc};
pub use context::{
    BasePart, Context, ContextWrapper, Continuation, InfoPart, MessagePart,
    ReceiverContext, ReceiverContextWrapper, ReceiverPart, SenderContext,
    SenderPart, SpawnerContext, SpawnerPart, StopperPart,
};
pub use messages::{
    AutoReceiveMessage, DeadLetterEvent, Message, MessageEnvelope, PoisonPill,
    ReadonlyMessageHeader, ReceiveTimeout, Restarting, Started, Stopped, Stopping,
    SystemMessage, Terminated, is_auto_receive_message, is_system_message,
    unwrap_envelope_message,
};
pub use pid::Pid;
pub use props::{Producer, Props, ReceiverFunc, ReceiverMiddleware};
pub use supervision::{
    AllForOneStrategy, Decider, Directive, ExponentialBackoffStrategy,
    OneForOneStrategy, Reason, RestartStatistics, RestartingStrategy,
    Supervisor, SupervisorStrategy, SupervisorStrategyFunc, default_decider,
    default_supervisor_strategy,
};
pub use system::{ActorSystem, RootContext};

pub use ::actor::{
    ActorSystemConfig, AsAny, ContextHandle, Error, Future, SenderFunc,
    SenderMiddleware,
};
