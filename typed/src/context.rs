// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Typed contexts
//!
//! The typed facets mirror the runtime ones, with typed addresses and props in their
//! signatures. Two wrappers implement them over a borrowed runtime context:
//!
//! - [`ContextWrapper`] wraps a full `actor::Context`.
//! - [`ReceiverContextWrapper`] wraps a receiver-only `actor::ReceiverContext`.
//!
//! Every address a wrapper returns is bound to the handle of the runtime context it wraps.
//! Wrappers borrow the runtime context, so they cannot outlive the message being processed.
//!

use crate::{
    Pid, Props,
    actor::{Actor, ActorWrapper},
    system::{ActorSystem, wrap_actor_system},
};

use actor::{AsAny, ContextHandle, Error, Future, Message, MessageEnvelope, MessageHeader};

use std::time::Duration;

/// Callback run on the actor once an awaited future resolves.
pub type Continuation =
    Box<dyn FnOnce(&mut dyn Context, Result<Message, Error>) + Send>;

/// Identity of the context and of the system it belongs to.
pub trait InfoPart {
    /// Parent of the current actor.
    fn parent(&self) -> Option<Pid>;
    /// The current actor.
    fn self_pid(&self) -> Option<Pid>;
    /// The actor instance.
    ///
    /// The runtime takes the actor out of its context while it processes a message, so
    /// this returns `None` from inside the actor's own `receive`. Receiver middleware
    /// and awaited-future continuations see `Some`.
    ///
    /// # Panics
    ///
    /// If the runtime actor was not spawned from typed props.
    fn actor(&self) -> Option<&dyn Actor>;
    fn actor_system(&self) -> ActorSystem;
    /// Handle every address returned by this context is bound to.
    fn context_handle(&self) -> ContextHandle;
}

pub trait MessagePart {
    /// The message being processed.
    fn message(&self) -> Option<Message>;
    /// Header of the message being processed.
    fn message_header(&self) -> MessageHeader;
}

pub trait SenderPart {
    /// Sender of the message being processed.
    fn sender(&self) -> Option<Pid>;
    fn send(&self, pid: &Pid, message: Message);
    /// Sends with the current actor as sender.
    fn request(&self, pid: &Pid, message: Message);
    fn request_with_custom_sender(&self, pid: &Pid, message: Message, sender: &Pid);
    fn request_future(&self, pid: &Pid, message: Message, timeout: Duration) -> Future;
}

pub trait ReceiverPart {
    fn receive(&mut self, envelope: MessageEnvelope);
}

pub trait SpawnerPart {
    /// Spawns a child named with a unique id.
    fn spawn(&mut self, props: &Props) -> Pid;
    /// Spawns a child named with `prefix` followed by a unique id.
    fn spawn_prefix(&mut self, props: &Props, prefix: &str) -> Pid;
    /// Spawns a child named `name`.
    ///
    /// # Errors
    ///
    /// `Error::NameExists` if the name is taken.
    fn spawn_named(&mut self, props: &Props, name: &str) -> Result<Pid, Error>;
}

pub trait StopperPart {
    /// Stops the actor regardless of the user messages in its mailbox.
    fn stop(&self, pid: &Pid);
    fn stop_future(&self, pid: &Pid) -> Future;
    /// Stops the actor after it processed the user messages in its mailbox.
    fn poison(&self, pid: &Pid);
    fn poison_future(&self, pid: &Pid) -> Future;
}

pub trait BasePart {
    fn receive_timeout(&self) -> Duration;
    fn children(&self) -> Vec<Pid>;
    /// Replies to the sender of the current message.
    ///
    /// # Panics
    ///
    /// If the current message has no sender.
    fn respond(&self, response: Message);
    /// Keeps the current message for re-delivery after a restart.
    fn stash(&mut self);
    fn watch(&mut self, pid: &Pid);
    fn unwatch(&mut self, pid: &Pid);
    /// Sets the inactivity timeout. Durations under one millisecond disable it.
    fn set_receive_timeout(&mut self, duration: Duration);
    fn cancel_receive_timeout(&mut self);
    /// Forwards the current message, sender included.
    fn forward(&self, pid: &Pid);
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
    /// The full context behind this view, if there is one.
    fn as_context(&mut self) -> Option<&mut dyn Context>;

    #[doc(hidden)]
    fn proto_receiver_context(&mut self) -> &mut dyn actor::ReceiverContext;
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

    #[doc(hidden)]
    fn proto_context(&mut self) -> &mut dyn actor::Context;
}

/// Recovers the typed actor behind a runtime actor.
fn typed_actor(actor: &dyn actor::Actor) -> &dyn Actor {
    match <dyn actor::Actor as AsAny>::as_any(actor).downcast_ref::<ActorWrapper>() {
        Some(wrapper) => wrapper.inner(),
        None => panic!("the runtime actor is not a typed actor"),
    }
}

/// Typed view of a full runtime context.
pub struct ContextWrapper<'a> {
    inner: &'a mut dyn actor::Context,
}

impl<'a> ContextWrapper<'a> {
    pub fn new(inner: &'a mut dyn actor::Context) -> Self {
        Self { inner }
    }

    fn bind(&self, pid: actor::Pid) -> Pid {
        Pid::new(self.inner.context_handle(), pid)
    }
}

impl InfoPart for ContextWrapper<'_> {
    fn parent(&self) -> Option<Pid> {
        Pid::bind(self.inner.context_handle(), self.inner.parent())
    }

    fn self_pid(&self) -> Option<Pid> {
        Pid::bind(self.inner.context_handle(), self.inner.self_pid())
    }

    fn actor(&self) -> Option<&dyn Actor> {
        self.inner.actor().map(typed_actor)
    }

    fn actor_system(&self) -> ActorSystem {
        wrap_actor_system(self.inner.actor_system())
    }

    fn context_handle(&self) -> ContextHandle {
        self.inner.context_handle()
    }
}

impl MessagePart for ContextWrapper<'_> {
    fn message(&self) -> Option<Message> {
        self.inner.message()
    }

    fn message_header(&self) -> MessageHeader {
        self.inner.message_header()
    }
}

impl SenderPart for ContextWrapper<'_> {
    fn sender(&self) -> Option<Pid> {
        Pid::bind(self.inner.context_handle(), self.inner.sender())
    }

    fn send(&self, pid: &Pid, message: Message) {
        self.inner.send(pid.proto(), message);
    }

    fn request(&self, pid: &Pid, message: Message) {
        self.inner.request(pid.proto(), message);
    }

    fn request_with_custom_sender(&self, pid: &Pid, message: Message, sender: &Pid) {
        self.inner
            .request_with_custom_sender(pid.proto(), message, sender.proto());
    }

    fn request_future(&self, pid: &Pid, message: Message, timeout: Duration) -> Future {
        self.inner.request_future(pid.proto(), message, timeout)
    }
}

impl ReceiverPart for ContextWrapper<'_> {
    fn receive(&mut self, envelope: MessageEnvelope) {
        self.inner.receive(envelope);
    }
}

impl SpawnerPart for ContextWrapper<'_> {
    fn spawn(&mut self, props: &Props) -> Pid {
        let pid = self.inner.spawn(props.proto());
        self.bind(pid)
    }

    fn spawn_prefix(&mut self, props: &Props, prefix: &str) -> Pid {
        let pid = self.inner.spawn_prefix(props.proto(), prefix);
        self.bind(pid)
    }

    fn spawn_named(&mut self, props: &Props, name: &str) -> Result<Pid, Error> {
        let pid = self.inner.spawn_named(props.proto(), name)?;
        Ok(self.bind(pid))
    }
}

impl StopperPart for ContextWrapper<'_> {
    fn stop(&self, pid: &Pid) {
        self.inner.stop(pid.proto());
    }

    fn stop_future(&self, pid: &Pid) -> Future {
        self.inner.stop_future(pid.proto())
    }

    fn poison(&self, pid: &Pid) {
        self.inner.poison(pid.proto());
    }

    fn poison_future(&self, pid: &Pid) -> Future {
        self.inner.poison_future(pid.proto())
    }
}

impl BasePart for ContextWrapper<'_> {
    fn receive_timeout(&self) -> Duration {
        self.inner.receive_timeout()
    }

    fn children(&self) -> Vec<Pid> {
        let handle = self.inner.context_handle();
        self.inner
            .children()
            .into_iter()
            .map(|child| Pid::new(handle.clone(), child))
            .collect()
    }

    fn respond(&self, response: Message) {
        if self.inner.sender().is_none() {
            panic!(
                "actor {:?} responded to a message without sender",
                self.inner.self_pid()
            );
        }
        self.inner.respond(response);
    }

    fn stash(&mut self) {
        self.inner.stash();
    }

    fn watch(&mut self, pid: &Pid) {
        self.inner.watch(pid.proto());
    }

    fn unwatch(&mut self, pid: &Pid) {
        self.inner.unwatch(pid.proto());
    }

    fn set_receive_timeout(&mut self, duration: Duration) {
        self.inner.set_receive_timeout(duration);
    }

    fn cancel_receive_timeout(&mut self) {
        self.inner.cancel_receive_timeout();
    }

    fn forward(&self, pid: &Pid) {
        self.inner.forward(pid.proto());
    }

    fn await_future(&mut self, future: Future, continuation: Continuation) {
        self.inner.await_future(
            future,
            Box::new(move |ctx: &mut dyn actor::Context, result| {
                continuation(&mut ContextWrapper::new(ctx), result)
            }),
        );
    }
}

impl ReceiverContext for ContextWrapper<'_> {
    fn as_context(&mut self) -> Option<&mut dyn Context> {
        Some(self)
    }

    fn proto_receiver_context(&mut self) -> &mut dyn actor::ReceiverContext {
        self.inner.as_receiver_context()
    }
}

impl Context for ContextWrapper<'_> {
    fn as_receiver_context(&mut self) -> &mut dyn ReceiverContext {
        self
    }

    fn proto_context(&mut self) -> &mut dyn actor::Context {
        &mut *self.inner
    }
}

/// Typed view of a receiver-only runtime context.
pub struct ReceiverContextWrapper<'a> {
    inner: &'a mut dyn actor::ReceiverContext,
}

impl<'a> ReceiverContextWrapper<'a> {
    pub fn new(inner: &'a mut dyn actor::ReceiverContext) -> Self {
        Self { inner }
    }
}

impl InfoPart for ReceiverContextWrapper<'_> {
    fn parent(&self) -> Option<Pid> {
        Pid::bind(self.inner.context_handle(), self.inner.parent())
    }

    fn self_pid(&self) -> Option<Pid> {
        Pid::bind(self.inner.context_handle(), self.inner.self_pid())
    }

    fn actor(&self) -> Option<&dyn Actor> {
        self.inner.actor().map(typed_actor)
    }

    fn actor_system(&self) -> ActorSystem {
        wrap_actor_system(self.inner.actor_system())
    }

    fn context_handle(&self) -> ContextHandle {
        self.inner.context_handle()
    }
}

impl MessagePart for ReceiverContextWrapper<'_> {
    fn message(&self) -> Option<Message> {
        self.inner.message()
    }

    fn message_header(&self) -> MessageHeader {
        self.inner.message_header()
    }
}

impl ReceiverPart for ReceiverContextWrapper<'_> {
    fn receive(&mut self, envelope: MessageEnvelope) {
        self.inner.receive(envelope);
    }
}

impl ReceiverContext for ReceiverContextWrapper<'_> {
    fn as_context(&mut self) -> Option<&mut dyn Context> {
        None
    }

    fn proto_receiver_context(&mut self) -> &mut dyn actor::ReceiverContext {
        &mut *self.inner
    }
}
