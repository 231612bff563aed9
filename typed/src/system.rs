// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Typed actor system
//!
//! The typed [`ActorSystem`] wraps a runtime system and its root context. Its
//! [`RootContext`] can send, spawn and stop; every address it returns is bound to the root
//! context's handle.
//!

use crate::{
    Pid, Props,
    actor::Actor,
    context::{InfoPart, MessagePart, SenderPart, SpawnerPart, StopperPart},
};

use actor::{
    ActorSystemConfig, ContextHandle, Error, Future, InfoPart as _, Message,
    MessageHeader, MessagePart as _, SenderMiddleware, SenderPart as _,
    SpawnerPart as _, StopperPart as _,
};

use tracing::debug;

use std::time::Duration;

/// Typed actor system.
#[derive(Clone)]
pub struct ActorSystem {
    inner: actor::ActorSystem,
    root: RootContext,
}

impl ActorSystem {
    /// Creates a system with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ActorSystemConfig::default())
    }

    pub fn with_config(config: ActorSystemConfig) -> Self {
        debug!("Creating typed actor system.");
        wrap_actor_system(actor::ActorSystem::new(config))
    }

    /// The system's root context.
    pub fn root(&self) -> RootContext {
        self.root.clone()
    }

    /// The runtime system.
    pub fn proto(&self) -> &actor::ActorSystem {
        &self.inner
    }

    /// Stops every actor of the system.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.is_shutdown()
    }
}

impl Default for ActorSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Typed view of a runtime system. The root context of the view is the system's own root.
pub(crate) fn wrap_actor_system(system: actor::ActorSystem) -> ActorSystem {
    let root = RootContext {
        inner: system.root(),
    };
    ActorSystem {
        inner: system,
        root,
    }
}

/// Context for code running outside of any actor.
#[derive(Clone)]
pub struct RootContext {
    inner: actor::RootContext,
}

impl RootContext {
    /// Creates a root context with its own header and sender middleware.
    pub fn new(
        system: &ActorSystem,
        headers: MessageHeader,
        sender_middleware: &[SenderMiddleware],
    ) -> Self {
        Self {
            inner: actor::RootContext::new(system.proto(), headers, sender_middleware),
        }
    }

    /// The runtime root context.
    pub fn proto(&self) -> &actor::RootContext {
        &self.inner
    }

    fn bind(&self, pid: actor::Pid) -> Pid {
        Pid::new(self.inner.context_handle(), pid)
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
        wrap_actor_system(self.inner.actor_system())
    }

    fn context_handle(&self) -> ContextHandle {
        self.inner.context_handle()
    }
}

impl MessagePart for RootContext {
    fn message(&self) -> Option<Message> {
        None
    }

    fn message_header(&self) -> MessageHeader {
        self.inner.message_header()
    }
}

impl SenderPart for RootContext {
    fn sender(&self) -> Option<Pid> {
        None
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

impl SpawnerPart for RootContext {
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

impl StopperPart for RootContext {
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
