// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor runtime
//!
//! An untyped actor runtime: processes addressed by [`Pid`], messages passed as
//! [`Message`] (`Arc<dyn Any + Send + Sync>`), parent/child supervision and futures for
//! request/reply.
//!
//! ## Overview
//!
//! - An [`ActorSystem`] owns a process registry and a root context. Everything outside of
//!   an actor talks to the system through its [`RootContext`].
//! - Actors are spawned from [`Props`]: a producer plus optional receiver middleware, sender
//!   middleware and supervisor strategy.
//! - Each actor runs in its own tokio task and receives one message at a time through
//!   [`Actor::receive`], with a [`Context`] giving access to the current message and to
//!   everything the actor can do.
//! - A panic in `receive` is a failure. It suspends the actor's mailbox and is reported to the
//!   parent, whose [`SupervisorStrategy`] decides to resume, restart, stop or escalate.
//! - Undeliverable messages go to dead letters, which are logged and published on the system
//!   event stream.
//!
//! ## Example
//!
//! ```ignore
//! use actor::{ActorSystem, Context, MessagePart, Props, SenderPart, SpawnerPart};
//! use std::{sync::Arc, time::Duration};
//!
//! let system = ActorSystem::default();
//! let mut root = system.root();
//! let echo = root.spawn(&Props::from_func(|ctx: &mut dyn Context| {
//!     if let Some(text) = ctx.message().and_then(|m| m.downcast_ref::<String>().cloned()) {
//!         ctx.respond(Arc::new(text));
//!     }
//! }));
//! let reply = root
//!     .request_future(&echo, Arc::new("hi".to_owned()), Duration::from_secs(1))
//!     .result()
//!     .await?;
//! ```
//!

mod actor;
mod context;
mod error;
mod future;
mod mailbox;
mod message;
mod pid;
mod props;
mod registry;
mod runner;
mod sink;
mod supervision;
mod system;

pub use actor::{Actor, ActorContext, AsAny, ReceiveFunc};
pub use context::{
    BasePart, Context, ContextHandle, Continuation, InfoPart, MessagePart,
    ReceiverContext, ReceiverPart, RootContext, SenderContext, SenderPart,
    SpawnerContext, SpawnerPart, StopperPart,
};
pub use error::Error;
pub use future::Future;
pub use mailbox::{ContinuationFn, Failure, SystemMessage};
pub use message::{
    DeadLetterEvent, DeadLetterResponse, Message, MessageEnvelope,
    MessageHeader, PoisonPill, ReceiveTimeout, Restarting, Started, Stopped,
    Stopping, Terminated, unwrap_envelope,
};
pub use pid::{LOCAL_ADDRESS, Pid};
pub use props::{
    Producer, Props, ReceiverFunc, ReceiverMiddleware, SenderFunc,
    SenderMiddleware, make_receiver_middleware_chain,
    make_sender_middleware_chain,
};
pub use registry::Process;
pub use sink::{Event, Sink, Subscriber};
pub use supervision::{
    AllForOneStrategy, Decider, Directive, ExponentialBackoffStrategy,
    OneForOneStrategy, Reason, RestartStatistics, RestartingStrategy,
    Supervisor, SupervisorStrategy, default_decider, default_strategy,
    describe_reason,
};
pub use system::{ActorSystem, ActorSystemConfig, SystemEvent, WeakActorSystem};
