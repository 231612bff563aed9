// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor system
//!
//! The `system` module provides the `ActorSystem` type. The `ActorSystem` owns the process
//! registry, the root context and the event stream, and routes every message to the process
//! it is addressed to, or to dead letters.
//!

use crate::{
    Error, MessageEnvelope, Pid, Props,
    actor::ActorContext,
    context::{ContextHandle, RootContext},
    mailbox::{SystemMessage, mailbox},
    message::{DeadLetterEvent, DeadLetterResponse, Terminated},
    pid::LOCAL_ADDRESS,
    registry::ProcessRegistry,
    runner::ActorRunner,
    sink::{Event, Sink, Subscriber},
    MessageHeader,
};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

/// Actor system configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorSystemConfig {
    /// Address of the local processes.
    pub address: String,
    /// Capacity of the event stream buffer.
    pub event_stream_capacity: usize,
    /// How long stop futures wait for termination.
    pub stop_timeout: Duration,
    /// Log every message delivered to dead letters.
    pub dead_letter_logging: bool,
}

impl Default for ActorSystemConfig {
    fn default() -> Self {
        Self {
            address: LOCAL_ADDRESS.to_owned(),
            event_stream_capacity: 1024,
            stop_timeout: Duration::from_secs(10),
            dead_letter_logging: true,
        }
    }
}

impl ActorSystemConfig {
    pub fn with_address(mut self, address: &str) -> Self {
        self.address = address.to_owned();
        self
    }

    pub fn with_event_stream_capacity(mut self, capacity: usize) -> Self {
        self.event_stream_capacity = capacity;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn with_dead_letter_logging(mut self, enabled: bool) -> Self {
        self.dead_letter_logging = enabled;
        self
    }
}

/// Events published by the system.
#[derive(Clone, Debug)]
pub enum SystemEvent {
    /// A message could not be delivered.
    DeadLetter(DeadLetterEvent),
    /// An actor terminated.
    ActorTerminated(Pid),
}

impl Event for SystemEvent {}

/// Actor system.
#[derive(Clone)]
pub struct ActorSystem {
    inner: Arc<SystemInner>,
}

/// Non-owning reference to an actor system.
#[derive(Clone, Default)]
pub struct WeakActorSystem(Weak<SystemInner>);

impl WeakActorSystem {
    pub fn upgrade(&self) -> Option<ActorSystem> {
        self.0.upgrade().map(|inner| ActorSystem { inner })
    }
}

struct SystemInner {
    config: ActorSystemConfig,
    registry: ProcessRegistry,
    events: broadcast::Sender<SystemEvent>,
    root: ContextHandle,
    token: CancellationToken,
}

impl Default for ActorSystem {
    fn default() -> Self {
        Self::new(ActorSystemConfig::default())
    }
}

impl ActorSystem {
    /// Create a new actor system.
    pub fn new(config: ActorSystemConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_stream_capacity.max(1));
        let inner = Arc::new_cyclic(|weak: &Weak<SystemInner>| SystemInner {
            registry: ProcessRegistry::new(&config.address),
            events,
            root: ContextHandle::with_weak(
                WeakActorSystem(weak.clone()),
                None,
                MessageHeader::default(),
                &[],
            ),
            token: CancellationToken::new(),
            config,
        });
        debug!("Actor system created at {}.", inner.registry.address());
        Self { inner }
    }

    /// The system's root context.
    pub fn root(&self) -> RootContext {
        RootContext::from_handle(self.clone(), self.inner.root.clone())
    }

    pub fn config(&self) -> &ActorSystemConfig {
        &self.inner.config
    }

    pub fn address(&self) -> &str {
        self.inner.registry.address()
    }

    pub fn downgrade(&self) -> WeakActorSystem {
        WeakActorSystem(Arc::downgrade(&self.inner))
    }

    /// Returns `true` if both values refer to the same system.
    pub fn ptr_eq(&self, other: &ActorSystem) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of registered processes (actors and pending futures).
    pub fn process_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Returns `true` if a process is registered under `pid`.
    pub fn is_alive(&self, pid: &Pid) -> bool {
        self.inner.registry.get(pid).is_some()
    }

    pub(crate) fn registry(&self) -> &ProcessRegistry {
        &self.inner.registry
    }

    pub(crate) fn next_process_id(&self) -> String {
        self.inner.registry.next_id()
    }

    /// Registers and starts an actor under `id`.
    pub(crate) fn spawn_actor(
        &self,
        props: &Props,
        id: &str,
        parent: Option<Pid>,
    ) -> Result<Pid, Error> {
        let (process, mailbox) = mailbox();
        let pid = self.inner.registry.add(id, Arc::new(process))?;
        let ctx = ActorContext::new(self.clone(), props.clone(), parent, pid.clone());
        let runner = ActorRunner::new(ctx, mailbox, self.inner.token.clone());
        tokio::spawn(runner.run());
        debug!("Actor {} spawned.", pid);
        Ok(pid)
    }

    /// Delivers a user message, or routes it to dead letters.
    pub fn send_user_message(&self, pid: &Pid, envelope: MessageEnvelope) {
        let result = match self.inner.registry.get(pid) {
            Some(process) => process.send_user_message(pid, envelope),
            None => Err(envelope),
        };
        if let Err(envelope) = result {
            self.dead_letter(pid, envelope);
        }
    }

    /// Delivers a system message, or routes it to dead letters.
    pub(crate) fn send_system_message(&self, pid: &Pid, message: SystemMessage) {
        let result = match self.inner.registry.get(pid) {
            Some(process) => process.send_system_message(pid, message),
            None => Err(message),
        };
        if let Err(message) = result {
            self.dead_letter_system(pid, message);
        }
    }

    pub(crate) fn dead_letter(&self, pid: &Pid, envelope: MessageEnvelope) {
        if self.inner.config.dead_letter_logging {
            warn!("Message to {} was delivered to dead letters.", pid);
        }
        if let Some(sender) = &envelope.sender {
            if !envelope.is::<DeadLetterResponse>() {
                self.send_user_message(
                    sender,
                    MessageEnvelope::new(Arc::new(DeadLetterResponse {
                        target: pid.clone(),
                    })),
                );
            }
        }
        let _ = self.inner.events.send(SystemEvent::DeadLetter(DeadLetterEvent {
            pid: pid.clone(),
            message: envelope.message,
            sender: envelope.sender,
        }));
    }

    fn dead_letter_system(&self, pid: &Pid, message: SystemMessage) {
        match message {
            SystemMessage::Watch { watcher } => self.send_system_message(
                &watcher,
                SystemMessage::Terminated(Terminated {
                    who: pid.clone(),
                    address_terminated: false,
                }),
            ),
            message => debug!("System message {:?} to {} was dropped.", message, pid),
        }
    }

    pub(crate) fn notify_terminated(&self, pid: &Pid) {
        debug!("Actor {} is terminated.", pid);
        let _ = self
            .inner
            .events
            .send(SystemEvent::ActorTerminated(pid.clone()));
    }

    /// Subscribes to system events.
    pub fn event_stream(&self) -> broadcast::Receiver<SystemEvent> {
        self.inner.events.subscribe()
    }

    /// Runs `subscriber` on every system event in a separate task.
    pub fn subscribe(&self, subscriber: impl Subscriber<SystemEvent>) {
        let mut sink = Sink::new(self.event_stream(), subscriber);
        tokio::spawn(async move { sink.run().await });
    }

    /// Stops every actor in the system.
    pub fn shutdown(&self) {
        debug!("Stopping actor system...");
        self.inner.token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Resolves once `shutdown` has been called.
    pub async fn stopped(&self) {
        self.inner.token.cancelled().await
    }
}
