// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Contexts
//!
//! What an actor can do while it processes a message is split into small capability traits:
//!
//! - [`InfoPart`]: who am I, who is my parent, which system do I live in.
//! - [`MessagePart`]: the message being processed and its header.
//! - [`SenderPart`]: send, request and request with a future.
//! - [`ReceiverPart`]: hand an envelope to the actor.
//! - [`SpawnerPart`]: create children.
//! - [`StopperPart`]: stop or poison other processes.
//! - [`BasePart`]: everything else a running actor can do (timeouts, stash, watch, ...).
//!
//! The composites [`Context`], [`ReceiverContext`], [`SenderContext`] and [`SpawnerContext`]
//! combine them. Code should ask for the narrowest trait it needs.
//!
//! Every context owns a [`ContextHandle`]: the part of its send path that stays valid after
//! the current message has been processed. Handles are what typed addresses bind to.
//!

use crate::{
    Actor, ActorSystem, Error, Future, Message, MessageEnvelope, MessageHeader,
    Pid, Props,
    mailbox::SystemMessage,
    message::PoisonPill,
    props::{SenderFunc, SenderMiddleware, make_sender_middleware_chain},
    system::WeakActorSystem,
};

use tracing::warn;

use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
    time::Duration,
};

/// Callback run on the actor once an awaited future resolves.
pub type Continuation =
    Box<dyn FnOnce(&mut dyn Context, Result<Message, Error>) + Send>;

/// Identity of the context and of the system it belongs to.
pub trait InfoPart {
    fn parent(&self) -> Option<Pid>;
    fn self_pid(&self) -> Option<Pid>;
    /// The actor instance.
    ///
    /// `None` while the actor is running its own `receive`, since the context holds the
    /// actor out of itself for the call. Middleware and continuations see `Some`.
    fn actor(&self) -> Option<&dyn Actor>;
    fn actor_system(&self) -> ActorSystem;
    /// Detached send path of this context.
    fn context_handle(&self) -> ContextHandle;
}

/// Access to the message being processed.
pub trait MessagePart {
    fn message(&self) -> Option<Message>;
    fn message_header(&self) -> MessageHeader;
}

/// Sending capabilities.
pub trait SenderPart {
    /// Sender of the message being processed.
    fn sender(&self) -> Option<Pid>;
    /// Fire and forget.
    fn send(&self, pid: &Pid, message: Message);
    /// Send with this context's process as the sender.
    fn request(&self, pid: &Pid, message: Message);
    /// Send with an explicit sender.
    fn request_with_custom_sender(&self, pid: &Pid, message: Message, sender: &Pid);
    /// Send and get a future for the reply.
    fn request_future(&self, pid: &Pid, message: Message, timeout: Duration) -> Future;
}

/// Delivery of an envelope to the actor.
pub trait ReceiverPart {
    fn receive(&mut self, envelope: MessageEnvelope);
}

/// Spawning capabilities.
pub trait SpawnerPart {
    /// Spawns with a generated name.
    fn spawn(&mut self, props: &Props) -> Pid;
    /// Spawns with a generated name starting with `prefix`.
    fn spawn_prefix(&mut self, props: &Props, prefix: &str) -> Pid;
    /// Spawns with an explicit name.
    ///
    /// # Errors
    ///
    /// `Error::NameExists` if a process with that name is already registered.
    fn spawn_named(&mut self, props: &Props, name: &str) -> Result<Pid, Error>;
}

/// Stopping capabilities.
pub trait StopperPart {
    /// Stops `pid` ahead of its queued messages.
    fn stop(&self, pid: &Pid);
    fn stop_future(&self, pid: &Pid) -> Future;
    /// Stops `pid` after its queued messages.
    fn poison(&self, pid: &Pid);
    fn poison_future(&self, pid: &Pid) -> Future;
}

/// Capabilities only a running actor has.
pub trait BasePart {
    fn receive_timeout(&self) -> Duration;
    fn children(&self) -> Vec<Pid>;
    /// Replies to the sender of the current message.
    fn respond(&self, response: Message);
    /// Keeps the current message to be re-delivered after a restart.
    fn stash(&mut self);
    fn watch(&mut self, pid: &Pid);
    fn unwatch(&mut self, pid: &Pid);
    /// Durations under one millisecond disable the timeout.
    fn set_receive_timeout(&mut self, duration: Duration);
    fn cancel_receive_timeout(&mut self);
    /// Sends the current envelope, sender included, to `pid`.
    fn forward(&self, pid: &Pid);
    /// Runs `continuation` on this actor once `future` resolves.
    fn await_future(&mut self, future: Future, continuation: Continuation);
}

/// Context that can only send.
pub trait SenderContext: InfoPart + SenderPart + MessagePart {}

impl<T: InfoPart + SenderPart + MessagePart + ?Sized> SenderContext for T {}

/// Context that can only spawn.
pub trait SpawnerContext: InfoPart + SpawnerPart {}

impl<T: InfoPart + SpawnerPart + ?Sized> SpawnerContext for T {}

/// Context handed to receiver middleware.
pub trait ReceiverContext: InfoPart + ReceiverPart + MessagePart {
    /// The full context behind this receiver context, if there is one.
    fn as_context(&mut self) -> Option<&mut dyn Context>;
}

/// Full actor context.
pub trait Context:
    InfoPart
    + BasePart
    + MessagePart
    + SenderPart
    + ReceiverPart
    + SpawnerPart
    + StopperPart
{
    fn as_receiver_context(&mut self) -> &mut dyn ReceiverContext;
}

/// Detached send path of a context.
///
/// A handle carries the sender middleware and the identity of the context that created it.
/// It holds the system weakly: once the system is gone, sends are dropped.
#[derive(Clone)]
pub struct ContextHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    system: WeakActorSystem,
    self_pid: Option<Pid>,
    headers: MessageHeader,
    sender_chain: Option<SenderFunc>,
}

impl ContextHandle {
    /// Creates a handle for a context of `system`.
    pub fn new(
        system: &ActorSystem,
        self_pid: Option<Pid>,
        headers: MessageHeader,
        sender_middleware: &[SenderMiddleware],
    ) -> Self {
        Self::with_weak(system.downgrade(), self_pid, headers, sender_middleware)
    }

    pub(crate) fn with_weak(
        system: WeakActorSystem,
        self_pid: Option<Pid>,
        headers: MessageHeader,
        sender_middleware: &[SenderMiddleware],
    ) -> Self {
        let sender_chain = if sender_middleware.is_empty() {
            None
        } else {
            Some(make_sender_middleware_chain(
                sender_middleware,
                Arc::new(deliver),
            ))
        };
        Self {
            inner: Arc::new(HandleInner {
                system,
                self_pid,
                headers,
                sender_chain,
            }),
        }
    }

    pub fn system(&self) -> Option<ActorSystem> {
        self.inner.system.upgrade()
    }

    /// Process of the context that created this handle.
    pub fn self_pid(&self) -> Option<&Pid> {
        self.inner.self_pid.as_ref()
    }

    pub fn headers(&self) -> &MessageHeader {
        &self.inner.headers
    }

    /// Returns `true` if both handles belong to the same context.
    pub fn ptr_eq(&self, other: &ContextHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Sends an envelope through this context's sender middleware.
    pub fn send_envelope(&self, pid: &Pid, envelope: MessageEnvelope) {
        match &self.inner.sender_chain {
            Some(chain) => chain(self, pid, envelope),
            None => deliver(self, pid, envelope),
        }
    }

    fn envelope(&self, message: Message, sender: Option<Pid>) -> MessageEnvelope {
        MessageEnvelope::new(message)
            .with_header(self.inner.headers.clone())
            .with_sender(sender)
    }

    pub fn send(&self, pid: &Pid, message: Message) {
        self.send_envelope(pid, self.envelope(message, None));
    }

    pub fn request(&self, pid: &Pid, message: Message) {
        self.send_envelope(pid, self.envelope(message, self.inner.self_pid.clone()));
    }

    pub fn request_with_custom_sender(&self, pid: &Pid, message: Message, sender: &Pid) {
        self.send_envelope(pid, self.envelope(message, Some(sender.clone())));
    }

    pub fn request_future(
        &self,
        pid: &Pid,
        message: Message,
        timeout: Duration,
    ) -> Future {
        let Some(system) = self.system() else {
            return Future::detached();
        };
        let future = Future::new(&system, timeout);
        self.send_envelope(pid, self.envelope(message, future.pid().cloned()));
        future
    }

    pub fn stop(&self, pid: &Pid) {
        if let Some(system) = self.system() {
            system.send_system_message(pid, SystemMessage::Stop);
        }
    }

    pub fn stop_future(&self, pid: &Pid) -> Future {
        let Some(system) = self.system() else {
            return Future::detached();
        };
        let future = watch_future(&system, pid);
        system.send_system_message(pid, SystemMessage::Stop);
        future
    }

    pub fn poison(&self, pid: &Pid) {
        self.send(pid, Arc::new(PoisonPill));
    }

    pub fn poison_future(&self, pid: &Pid) -> Future {
        let Some(system) = self.system() else {
            return Future::detached();
        };
        let future = watch_future(&system, pid);
        self.poison(pid);
        future
    }
}

impl PartialEq for ContextHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Debug for ContextHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextHandle")
            .field("self_pid", &self.inner.self_pid)
            .finish_non_exhaustive()
    }
}

/// Future resolved by the `Terminated` notification of `pid`.
fn watch_future(system: &ActorSystem, pid: &Pid) -> Future {
    let future = Future::new(system, system.config().stop_timeout);
    if let Some(watcher) = future.pid() {
        system.send_system_message(
            pid,
            SystemMessage::Watch {
                watcher: watcher.clone(),
            },
        );
    }
    future
}

/// Last step of every sender chain.
fn deliver(handle: &ContextHandle, pid: &Pid, envelope: MessageEnvelope) {
    match handle.system() {
        Some(system) => system.send_user_message(pid, envelope),
        None => warn!("Message to {} dropped: the actor system is gone.", pid),
    }
}

/// Context for code running outside of any actor.
#[derive(Clone)]
pub struct RootContext {
    system: ActorSystem,
    handle: ContextHandle,
}

impl RootContext {
    /// Creates a root context with its own header and sender middleware.
    pub fn new(
        system: &ActorSystem,
        headers: MessageHeader,
        sender_middleware: &[SenderMiddleware],
    ) -> Self {
        Self {
            system: system.clone(),
            handle: ContextHandle::new(system, None, headers, sender_middleware),
        }
    }

    pub(crate) fn from_handle(system: ActorSystem, handle: ContextHandle) -> Self {
        Self { system, handle }
    }
}

impl InfoPart for RootContext {
    fn parent(&self) -> Option<Pid> {
        None
    }

    fn self_pid(&self) -> Option<Pid> {
        None
    }

    fn actor(&self) -> Option<&dyn Actor> {
        None
    }

    fn actor_system(&self) -> ActorSystem {
        self.system.clone()
    }

    fn context_handle(&self) -> ContextHandle {
        self.handle.clone()
    }
}

impl MessagePart for RootContext {
    fn message(&self) -> Option<Message> {
        None
    }

    fn message_header(&self) -> MessageHeader {
        self.handle.headers().clone()
    }
}

impl SenderPart for RootContext {
    fn sender(&self) -> Option<Pid> {
        None
    }

    fn send(&self, pid: &Pid, message: Message) {
        self.handle.send(pid, message);
    }

    fn request(&self, pid: &Pid, message: Message) {
        self.handle.request(pid, message);
    }

    fn request_with_custom_sender(&self, pid: &Pid, message: Message, sender: &Pid) {
        self.handle.request_with_custom_sender(pid, message, sender);
    }

    fn request_future(&self, pid: &Pid, message: Message, timeout: Duration) -> Future {
        self.handle.request_future(pid, message, timeout)
    }
}

impl SpawnerPart for RootContext {
    fn spawn(&mut self, props: &Props) -> Pid {
        loop {
            let name = self.system.next_process_id();
            if let Ok(pid) = self.spawn_named(props, &name) {
                return pid;
            }
        }
    }

    fn spawn_prefix(&mut self, props: &Props, prefix: &str) -> Pid {
        loop {
            let name = format!("{}{}", prefix, self.system.next_process_id());
            if let Ok(pid) = self.spawn_named(props, &name) {
                return pid;
            }
        }
    }

    fn spawn_named(&mut self, props: &Props, name: &str) -> Result<Pid, Error> {
        self.system.spawn_actor(props, name, None)
    }
}

impl StopperPart for RootContext {
    fn stop(&self, pid: &Pid) {
        self.handle.stop(pid);
    }

    fn stop_future(&self, pid: &Pid) -> Future {
        self.handle.stop_future(pid)
    }

    fn poison(&self, pid: &Pid) {
        self.handle.poison(pid);
    }

    fn poison_future(&self, pid: &Pid) -> Future {
        self.handle.poison_future(pid)
    }
}
