// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor
//!
//! The [`Actor`] trait and the [`ActorContext`] the runtime hands to it.
//!
//! An actor receives one message at a time through `receive`. Everything it can do while
//! processing that message (replying, spawning, watching, stopping) goes through the context.
//! The context lives as long as the actor and is owned by the actor's runner; actors only
//! ever see it borrowed for the duration of one message.
//!

use crate::{
    ActorSystem, Error, Future, Message, MessageEnvelope, MessageHeader, Pid,
    Props,
    context::{
        BasePart, Context, ContextHandle, Continuation, InfoPart, MessagePart,
        ReceiverContext, ReceiverPart, SenderPart, SpawnerPart, StopperPart,
    },
    mailbox::{ContinuationFn, Failure, SystemMessage},
    message::{Terminated, influences_receive_timeout},
    props::{ReceiverFunc, make_receiver_middleware_chain},
    supervision::{
        Reason, RestartStatistics, Supervisor, default_strategy, describe_reason,
    },
};

use tokio::time::Instant;
use tracing::{debug, error};

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Duration,
};

/// Access to the concrete type behind a trait object.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// An untyped actor.
pub trait Actor: AsAny + Send + 'static {
    /// Processes the message available through `ctx.message()`.
    fn receive(&mut self, ctx: &mut dyn Context);
}

/// Actor that is a plain function.
#[derive(Clone)]
pub struct ReceiveFunc(Arc<dyn Fn(&mut dyn Context) + Send + Sync>);

impl ReceiveFunc {
    pub fn new<F>(receive: F) -> Self
    where
        F: Fn(&mut dyn Context) + Send + Sync + 'static,
    {
        Self(Arc::new(receive))
    }
}

impl Actor for ReceiveFunc {
    fn receive(&mut self, ctx: &mut dyn Context) {
        (self.0)(ctx)
    }
}

/// Lifecycle of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ActorLifecycle {
    /// Processing messages.
    Alive,
    /// Replacing its incarnation.
    Restarting,
    /// Stopping its children before terminating.
    Stopping,
    /// Terminated.
    Stopped,
}

/// Turns a panic payload into a failure reason.
fn panic_reason(payload: Box<dyn Any + Send>) -> Reason {
    if let Some(text) = payload.downcast_ref::<String>() {
        Arc::new(text.clone())
    } else if let Some(text) = payload.downcast_ref::<&'static str>() {
        Arc::new((*text).to_owned())
    } else {
        Arc::new("actor panicked".to_owned())
    }
}

/// Runtime context of one actor.
pub struct ActorContext {
    system: ActorSystem,
    props: Props,
    parent: Option<Pid>,
    self_pid: Pid,
    handle: ContextHandle,
    receiver_chain: ReceiverFunc,
    actor: Option<Box<dyn Actor>>,
    envelope: Option<MessageEnvelope>,
    children: Vec<Pid>,
    watchers: Vec<Pid>,
    stash: Vec<MessageEnvelope>,
    receive_timeout: Duration,
    timeout_deadline: Option<Instant>,
    restart_stats: RestartStatistics,
    lifecycle: ActorLifecycle,
    suspended: bool,
    handling_root_failure: bool,
}

impl ActorContext {
    pub(crate) fn new(
        system: ActorSystem,
        props: Props,
        parent: Option<Pid>,
        self_pid: Pid,
    ) -> Self {
        let handle = ContextHandle::new(
            &system,
            Some(self_pid.clone()),
            MessageHeader::default(),
            props.sender_middleware(),
        );
        let last: ReceiverFunc = Arc::new(
            |ctx: &mut dyn ReceiverContext, envelope: MessageEnvelope| {
                ctx.receive(envelope)
            },
        );
        let receiver_chain =
            make_receiver_middleware_chain(props.receiver_middleware(), last);
        let actor = props.produce();
        Self {
            system,
            props,
            parent,
            self_pid,
            handle,
            receiver_chain,
            actor: Some(actor),
            envelope: None,
            children: vec![],
            watchers: vec![],
            stash: vec![],
            receive_timeout: Duration::ZERO,
            timeout_deadline: None,
            restart_stats: RestartStatistics::new(),
            lifecycle: ActorLifecycle::Alive,
            suspended: false,
            handling_root_failure: false,
        }
    }

    pub(crate) fn pid(&self) -> &Pid {
        &self.self_pid
    }

    pub(crate) fn lifecycle(&self) -> ActorLifecycle {
        self.lifecycle
    }

    pub(crate) fn set_lifecycle(&mut self, lifecycle: ActorLifecycle) {
        self.lifecycle = lifecycle;
    }

    pub(crate) fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub(crate) fn resume(&mut self) {
        self.suspended = false;
    }

    pub(crate) fn timeout_deadline(&self) -> Option<Instant> {
        self.timeout_deadline
    }

    pub(crate) fn clear_timeout_deadline(&mut self) {
        self.timeout_deadline = None;
    }

    /// Runs an envelope through the receive chain.
    ///
    /// # Errors
    ///
    /// Returns the failure reason if the chain panicked.
    pub(crate) fn invoke(&mut self, envelope: MessageEnvelope) -> Result<(), Reason> {
        let influences = influences_receive_timeout(&envelope.message);
        let chain = self.receiver_chain.clone();
        self.envelope = Some(envelope.clone());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            chain(&mut *self, envelope)
        }));
        self.envelope = None;
        if influences && !self.receive_timeout.is_zero() {
            self.timeout_deadline = Some(Instant::now() + self.receive_timeout);
        }
        outcome.map_err(panic_reason)
    }

    /// Runs an awaited future's continuation with the message captured when it was awaited.
    pub(crate) fn run_continuation(
        &mut self,
        envelope: Option<MessageEnvelope>,
        callback: ContinuationFn,
    ) -> Result<(), Reason> {
        self.envelope = envelope;
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| callback(&mut *self)));
        self.envelope = None;
        outcome.map_err(panic_reason)
    }

    /// Replaces the actor with a fresh incarnation and resumes the mailbox.
    pub(crate) fn incarnate(&mut self) {
        self.actor = Some(self.props.produce());
        self.lifecycle = ActorLifecycle::Alive;
        self.suspended = false;
    }

    pub(crate) fn take_stash(&mut self) -> Vec<MessageEnvelope> {
        std::mem::take(&mut self.stash)
    }

    /// Puts back stashed envelopes that could not be re-delivered, ahead of newer ones.
    pub(crate) fn restore_stash(&mut self, mut stash: Vec<MessageEnvelope>) {
        stash.append(&mut self.stash);
        self.stash = stash;
    }

    pub(crate) fn add_watcher(&mut self, watcher: Pid) {
        if !self.watchers.contains(&watcher) {
            self.watchers.push(watcher);
        }
    }

    pub(crate) fn remove_watcher(&mut self, watcher: &Pid) {
        self.watchers.retain(|pid| pid != watcher);
    }

    pub(crate) fn remove_child(&mut self, child: &Pid) {
        self.children.retain(|pid| pid != child);
    }

    /// Stops every child and waits until all of them terminated.
    pub(crate) async fn stop_all_children(&mut self) {
        let children = std::mem::take(&mut self.children);
        if children.is_empty() {
            return;
        }
        debug!(
            "Actor {} is stopping {} children.",
            self.self_pid,
            children.len()
        );
        let futures: Vec<Future> = children
            .iter()
            .map(|child| self.handle.stop_future(child))
            .collect();
        futures::future::join_all(futures.into_iter().map(|future| future.wait()))
            .await;
    }

    /// Suspends the mailbox and reports the failure to the parent.
    pub(crate) fn escalate(&mut self, reason: Reason, message: Option<Message>) {
        self.suspended = true;
        let failure = Failure {
            who: self.self_pid.clone(),
            reason,
            restart_stats: self.restart_stats.clone(),
            message,
        };
        if let Some(parent) = &self.parent {
            debug!(
                "Actor {} is escalating a failure to {}.",
                self.self_pid, parent
            );
            self.system
                .send_system_message(parent, SystemMessage::Failure(failure));
        } else if self.handling_root_failure {
            error!(
                "Actor {} escalated past the root: {}. Stopping it.",
                self.self_pid,
                describe_reason(&failure.reason)
            );
            self.system
                .send_system_message(&self.self_pid, SystemMessage::Stop);
        } else {
            self.handle_root_failure(failure);
        }
    }

    /// Top-level actors supervise themselves with the default strategy.
    fn handle_root_failure(&mut self, failure: Failure) {
        let system = self.system.clone();
        self.handling_root_failure = true;
        default_strategy().handle_failure(
            &system,
            self,
            &failure.who,
            &failure.restart_stats,
            &failure.reason,
            failure.message.as_ref(),
        );
        self.handling_root_failure = false;
    }

    /// Applies the supervisor strategy to a failed child.
    pub(crate) fn handle_child_failure(&mut self, failure: Failure) {
        let system = self.system.clone();
        let strategy = self
            .props
            .supervisor_strategy()
            .unwrap_or_else(default_strategy);
        strategy.handle_failure(
            &system,
            self,
            &failure.who,
            &failure.restart_stats,
            &failure.reason,
            failure.message.as_ref(),
        );
    }

    /// Unregisters the process and notifies watchers and parent.
    pub(crate) fn finalize_stop(&mut self) {
        self.system.registry().remove(&self.self_pid);
        self.lifecycle = ActorLifecycle::Stopped;
        self.timeout_deadline = None;
        let terminated = Terminated {
            who: self.self_pid.clone(),
            address_terminated: false,
        };
        for watcher in self.watchers.drain(..) {
            self.system.send_system_message(
                &watcher,
                SystemMessage::Terminated(terminated.clone()),
            );
        }
        if let Some(parent) = &self.parent {
            self.system
                .send_system_message(parent, SystemMessage::Terminated(terminated));
        }
        self.system.notify_terminated(&self.self_pid);
    }
}

impl InfoPart for ActorContext {
    fn parent(&self) -> Option<Pid> {
        self.parent.clone()
    }

    fn self_pid(&self) -> Option<Pid> {
        Some(self.self_pid.clone())
    }

    fn actor(&self) -> Option<&dyn Actor> {
        self.actor.as_deref()
    }

    fn actor_system(&self) -> ActorSystem {
        self.system.clone()
    }

    fn context_handle(&self) -> ContextHandle {
        self.handle.clone()
    }
}

impl MessagePart for ActorContext {
    fn message(&self) -> Option<Message> {
        self.envelope.as_ref().map(|envelope| envelope.message.clone())
    }

    fn message_header(&self) -> MessageHeader {
        self.envelope
            .as_ref()
            .map(|envelope| envelope.header.clone())
            .unwrap_or_default()
    }
}

impl SenderPart for ActorContext {
    fn sender(&self) -> Option<Pid> {
        self.envelope
            .as_ref()
            .and_then(|envelope| envelope.sender.clone())
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

impl ReceiverPart for ActorContext {
    fn receive(&mut self, envelope: MessageEnvelope) {
        self.envelope = Some(envelope);
        let Some(mut actor) = self.actor.take() else {
            error!("Actor {} has no incarnation to receive.", self.self_pid);
            return;
        };
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| actor.receive(&mut *self)));
        self.actor = Some(actor);
        if let Err(payload) = outcome {
            panic::resume_unwind(payload);
        }
    }
}

impl SpawnerPart for ActorContext {
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
        let id = format!("{}/{}", self.self_pid.id(), name);
        let pid =
            self.system
                .spawn_actor(props, &id, Some(self.self_pid.clone()))?;
        self.children.push(pid.clone());
        Ok(pid)
    }
}

impl StopperPart for ActorContext {
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

impl BasePart for ActorContext {
    fn receive_timeout(&self) -> Duration {
        self.receive_timeout
    }

    fn children(&self) -> Vec<Pid> {
        self.children.clone()
    }

    fn respond(&self, response: Message) {
        match self.sender() {
            Some(sender) => self.handle.send(&sender, response),
            None => self.system.dead_letter(
                &self.self_pid,
                MessageEnvelope::new(response),
            ),
        }
    }

    fn stash(&mut self) {
        if let Some(envelope) = &self.envelope {
            self.stash.push(envelope.clone());
        }
    }

    fn watch(&mut self, pid: &Pid) {
        self.system.send_system_message(
            pid,
            SystemMessage::Watch {
                watcher: self.self_pid.clone(),
            },
        );
    }

    fn unwatch(&mut self, pid: &Pid) {
        self.system.send_system_message(
            pid,
            SystemMessage::Unwatch {
                watcher: self.self_pid.clone(),
            },
        );
    }

    fn set_receive_timeout(&mut self, duration: Duration) {
        if duration < Duration::from_millis(1) {
            self.cancel_receive_timeout();
            return;
        }
        self.receive_timeout = duration;
        self.timeout_deadline = Some(Instant::now() + duration);
    }

    fn cancel_receive_timeout(&mut self) {
        self.receive_timeout = Duration::ZERO;
        self.timeout_deadline = None;
    }

    fn forward(&self, pid: &Pid) {
        if let Some(envelope) = &self.envelope {
            self.handle.send_envelope(pid, envelope.clone());
        }
    }

    fn await_future(&mut self, future: Future, continuation: Continuation) {
        let system = self.system.clone();
        let pid = self.self_pid.clone();
        let envelope = self.envelope.clone();
        tokio::spawn(async move {
            let result = future.result().await;
            system.send_system_message(
                &pid,
                SystemMessage::Continuation {
                    envelope,
                    callback: Box::new(move |ctx: &mut dyn Context| {
                        continuation(ctx, result)
                    }),
                },
            );
        });
    }
}

impl ReceiverContext for ActorContext {
    fn as_context(&mut self) -> Option<&mut dyn Context> {
        Some(self)
    }
}

impl Context for ActorContext {
    fn as_receiver_context(&mut self) -> &mut dyn ReceiverContext {
        self
    }
}

impl Supervisor for ActorContext {
    fn children(&self) -> Vec<Pid> {
        self.children.clone()
    }

    fn escalate_failure(&mut self, reason: Reason, message: Option<Message>) {
        self.escalate(reason, message);
    }

    fn restart_children(&mut self, pids: &[Pid]) {
        for pid in pids {
            self.system.send_system_message(pid, SystemMessage::Restart);
        }
    }

    fn stop_children(&mut self, pids: &[Pid]) {
        for pid in pids {
            self.system.send_system_message(pid, SystemMessage::Stop);
        }
    }

    fn resume_children(&mut self, pids: &[Pid]) {
        for pid in pids {
            self.system
                .send_system_message(pid, SystemMessage::ResumeMailbox);
        }
    }
}
