// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Mailbox
//!
//! Every actor owns two unbounded queues: one for system messages, which the runner always
//! drains first, and one for user envelopes. The sending halves live in the process registry
//! as an `ActorProcess`; the receiving halves are owned by the actor's runner.
//!

use crate::{
    Message, MessageEnvelope, Pid, context::Context, message::Terminated,
    registry::Process, supervision::{Reason, RestartStatistics},
};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use std::fmt::{Debug, Formatter};

/// Closure scheduled back onto an actor once an awaited future resolves.
pub type ContinuationFn = Box<dyn FnOnce(&mut dyn Context) + Send>;

/// Failure report sent by a failing actor to its supervisor.
#[derive(Clone)]
pub struct Failure {
    /// The failing actor.
    pub who: Pid,
    /// Why it failed.
    pub reason: Reason,
    /// Restart history of the failing actor, shared with it.
    pub restart_stats: RestartStatistics,
    /// Message being processed at failure time.
    pub message: Option<Message>,
}

impl Debug for Failure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Failure")
            .field("who", &self.who)
            .field("restart_stats", &self.restart_stats)
            .finish_non_exhaustive()
    }
}

/// Runtime control messages. They bypass the user queue.
pub enum SystemMessage {
    /// Stop immediately, ignoring queued user messages.
    Stop,
    /// Replace the current incarnation.
    Restart,
    /// Resume processing user messages after a failure.
    ResumeMailbox,
    /// Register `watcher` for a `Terminated` notification.
    Watch { watcher: Pid },
    /// Remove a previously registered watcher.
    Unwatch { watcher: Pid },
    /// A watched process or a child terminated.
    Terminated(Terminated),
    /// A child failed.
    Failure(Failure),
    /// Resume an awaited future on the actor.
    Continuation {
        /// Message being processed when the future was awaited.
        envelope: Option<MessageEnvelope>,
        /// Work to run in the actor context.
        callback: ContinuationFn,
    },
}

impl Debug for SystemMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemMessage::Stop => write!(f, "Stop"),
            SystemMessage::Restart => write!(f, "Restart"),
            SystemMessage::ResumeMailbox => write!(f, "ResumeMailbox"),
            SystemMessage::Watch { watcher } => write!(f, "Watch({})", watcher),
            SystemMessage::Unwatch { watcher } => {
                write!(f, "Unwatch({})", watcher)
            }
            SystemMessage::Terminated(terminated) => {
                write!(f, "Terminated({})", terminated.who)
            }
            SystemMessage::Failure(failure) => {
                write!(f, "Failure({})", failure.who)
            }
            SystemMessage::Continuation { .. } => write!(f, "Continuation"),
        }
    }
}

/// Registry entry for a running actor.
pub(crate) struct ActorProcess {
    user: UnboundedSender<MessageEnvelope>,
    system: UnboundedSender<SystemMessage>,
}

impl Process for ActorProcess {
    fn send_user_message(
        &self,
        _pid: &Pid,
        envelope: MessageEnvelope,
    ) -> Result<(), MessageEnvelope> {
        self.user.send(envelope).map_err(|error| error.0)
    }

    fn send_system_message(
        &self,
        _pid: &Pid,
        message: SystemMessage,
    ) -> Result<(), SystemMessage> {
        self.system.send(message).map_err(|error| error.0)
    }
}

/// Receiving side of an actor mailbox.
pub(crate) struct Mailbox {
    pub(crate) user: UnboundedReceiver<MessageEnvelope>,
    pub(crate) system: UnboundedReceiver<SystemMessage>,
}

/// Creates a mailbox and the process that feeds it.
pub(crate) fn mailbox() -> (ActorProcess, Mailbox) {
    let (user_sender, user_receiver) = mpsc::unbounded_channel();
    let (system_sender, system_receiver) = mpsc::unbounded_channel();
    (
        ActorProcess {
            user: user_sender,
            system: system_sender,
        },
        Mailbox {
            user: user_receiver,
            system: system_receiver,
        },
    )
}
