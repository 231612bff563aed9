// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor runner
//!
//! Every actor runs in its own tokio task, driven by an `ActorRunner`. The runner owns the
//! receiving halves of the actor's mailbox and its `ActorContext`, and processes one message at
//! a time. The main loop waits on, in priority order:
//!
//! 1. The system cancellation token: the system is shutting down.
//! 2. System messages: stop, restart, supervision and watch traffic.
//! 3. User messages, unless the mailbox is suspended after a failure.
//! 4. The receive timeout, if one is armed.
//!

use crate::{
    Message, MessageEnvelope,
    actor::{ActorContext, ActorLifecycle},
    context::InfoPart,
    mailbox::{Mailbox, SystemMessage},
    message::{
        PoisonPill, ReceiveTimeout, Restarting, Started, Stopped, Stopping,
        Terminated,
    },
    supervision::describe_reason,
};

use tokio::{select, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use std::sync::Arc;

/// Drives one actor.
pub(crate) struct ActorRunner {
    ctx: ActorContext,
    mailbox: Mailbox,
    token: CancellationToken,
}

impl ActorRunner {
    pub(crate) fn new(
        ctx: ActorContext,
        mailbox: Mailbox,
        token: CancellationToken,
    ) -> Self {
        Self {
            ctx,
            mailbox,
            token,
        }
    }

    /// Runs the actor until it is stopped.
    pub(crate) async fn run(mut self) {
        debug!("Actor {} is started.", self.ctx.pid());
        self.process(MessageEnvelope::new(Arc::new(Started)));

        loop {
            if self.ctx.lifecycle() == ActorLifecycle::Stopped {
                break;
            }
            let suspended = self.ctx.is_suspended();
            let deadline = self.ctx.timeout_deadline();
            select! {
                biased;
                _ = self.token.cancelled() => {
                    debug!("Actor {} received the system shutdown.", self.ctx.pid());
                    self.stop().await;
                }
                message = self.mailbox.system.recv() => match message {
                    Some(message) => self.handle_system(message).await,
                    None => self.stop().await,
                },
                envelope = self.mailbox.user.recv(), if !suspended => match envelope {
                    Some(envelope) => self.handle_user(envelope).await,
                    None => self.stop().await,
                },
                _ = receive_timeout_elapsed(deadline), if deadline.is_some() && !suspended => {
                    self.ctx.clear_timeout_deadline();
                    self.process(MessageEnvelope::new(Arc::new(ReceiveTimeout)));
                }
            }
        }
    }

    /// Runs an envelope through the receive chain and escalates a panic.
    fn process(&mut self, envelope: MessageEnvelope) {
        let message = envelope.message.clone();
        if let Err(reason) = self.ctx.invoke(envelope) {
            error!(
                "Actor {} failed: {}.",
                self.ctx.pid(),
                describe_reason(&reason)
            );
            self.ctx.escalate(reason, Some(message));
        }
    }

    async fn handle_user(&mut self, envelope: MessageEnvelope) {
        if envelope.is::<PoisonPill>() {
            debug!("Actor {} received a poison pill.", self.ctx.pid());
            self.stop().await;
        } else {
            self.process(envelope);
        }
    }

    async fn handle_system(&mut self, message: SystemMessage) {
        match message {
            SystemMessage::Stop => self.stop().await,
            SystemMessage::Restart => self.restart().await,
            SystemMessage::ResumeMailbox => {
                debug!("Actor {} is resuming its mailbox.", self.ctx.pid());
                self.ctx.resume();
            }
            SystemMessage::Watch { watcher } => self.ctx.add_watcher(watcher),
            SystemMessage::Unwatch { watcher } => self.ctx.remove_watcher(&watcher),
            SystemMessage::Terminated(terminated) => {
                self.ctx.remove_child(&terminated.who);
                self.process(MessageEnvelope::new(Arc::new(terminated)));
            }
            SystemMessage::Failure(failure) => {
                debug!(
                    "Actor {} is supervising a failure of {}.",
                    self.ctx.pid(),
                    failure.who
                );
                self.ctx.handle_child_failure(failure);
            }
            SystemMessage::Continuation { envelope, callback } => {
                let message = envelope.as_ref().map(|envelope| envelope.message.clone());
                if let Err(reason) = self.ctx.run_continuation(envelope, callback) {
                    error!(
                        "Actor {} failed in a continuation: {}.",
                        self.ctx.pid(),
                        describe_reason(&reason)
                    );
                    self.ctx.escalate(reason, message);
                }
            }
        }
    }

    /// Stops the children, terminates the actor and drains what is left in its mailbox.
    async fn stop(&mut self) {
        if matches!(
            self.ctx.lifecycle(),
            ActorLifecycle::Stopping | ActorLifecycle::Stopped
        ) {
            return;
        }
        debug!("Actor {} is stopping.", self.ctx.pid());
        self.ctx.set_lifecycle(ActorLifecycle::Stopping);
        self.notify(Arc::new(Stopping));
        self.ctx.stop_all_children().await;
        self.notify(Arc::new(Stopped));
        self.ctx.finalize_stop();
        self.drain();
    }

    /// Replaces the incarnation after a supervisor decided to restart it.
    async fn restart(&mut self) {
        debug!("Actor {} is restarting.", self.ctx.pid());
        self.ctx.set_lifecycle(ActorLifecycle::Restarting);
        self.notify(Arc::new(Restarting));
        self.ctx.stop_all_children().await;
        self.ctx.incarnate();
        self.process(MessageEnvelope::new(Arc::new(Started)));

        let mut stash = self.ctx.take_stash();
        while let Some(envelope) = stash.pop() {
            if self.ctx.is_suspended() {
                stash.push(envelope);
                self.ctx.restore_stash(stash);
                return;
            }
            self.process(envelope);
        }
    }

    /// Delivers a lifecycle notification. Failures are only logged: the actor is going away.
    fn notify(&mut self, message: Message) {
        if let Err(reason) = self.ctx.invoke(MessageEnvelope::new(message)) {
            error!(
                "Actor {} failed while changing state: {}.",
                self.ctx.pid(),
                describe_reason(&reason)
            );
        }
    }

    /// Routes messages still queued on a stopped actor.
    fn drain(&mut self) {
        self.mailbox.system.close();
        self.mailbox.user.close();
        let system = self.ctx.actor_system();
        let pid = self.ctx.pid().clone();
        while let Ok(message) = self.mailbox.system.try_recv() {
            if let SystemMessage::Watch { watcher } = message {
                system.send_system_message(
                    &watcher,
                    SystemMessage::Terminated(Terminated {
                        who: pid.clone(),
                        address_terminated: false,
                    }),
                );
            }
        }
        while let Ok(envelope) = self.mailbox.user.try_recv() {
            system.dead_letter(&pid, envelope);
        }
    }
}

/// Resolves at `deadline`, or never.
async fn receive_timeout_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => futures::future::pending().await,
    }
}
