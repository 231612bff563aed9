// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Typed addresses
//!
//! A typed [`Pid`] is a runtime address bound to the context that produced it. Operations on
//! the address (`tell`, `request_future`, `stop`, ...) go out through that context's send
//! path, so its sender middleware sees them.
//!

use actor::{ContextHandle, Error, Future, Message};

use serde::{Serialize, Serializer};
use tracing::debug;

use std::{
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    time::Duration,
};

/// Address of an actor, bound to a context.
#[derive(Clone)]
pub struct Pid {
    context: ContextHandle,
    pid: actor::Pid,
}

impl Pid {
    /// Binds `pid` to `context`.
    pub fn new(context: ContextHandle, pid: actor::Pid) -> Self {
        Self { context, pid }
    }

    /// Binds an optional runtime address. `None` stays `None`.
    pub(crate) fn bind(context: ContextHandle, pid: Option<actor::Pid>) -> Option<Self> {
        pid.map(|pid| Self::new(context, pid))
    }

    /// The runtime address.
    pub fn proto(&self) -> &actor::Pid {
        &self.pid
    }

    pub fn id(&self) -> &str {
        self.pid.id()
    }

    pub fn address(&self) -> &str {
        self.pid.address()
    }

    /// Send path this address is bound to.
    pub fn context(&self) -> &ContextHandle {
        &self.context
    }

    /// Sends `message` without a sender.
    pub fn tell(&self, message: Message) {
        self.context.send(&self.pid, message);
    }

    /// Sends `message` and returns a future for the reply.
    pub fn request_future(&self, message: Message, timeout: Duration) -> Future {
        self.context.request_future(&self.pid, message, timeout)
    }

    /// Stops the actor ahead of its queued messages.
    pub fn stop(&self) {
        self.context.stop(&self.pid);
    }

    pub fn stop_future(&self) -> Future {
        self.context.stop_future(&self.pid)
    }

    /// Stops the actor once it has processed its queued messages.
    pub fn poison(&self) {
        self.context.poison(&self.pid);
    }

    pub fn poison_future(&self) -> Future {
        self.context.poison_future(&self.pid)
    }

    /// Lets the actor drain its mailbox, then waits until it terminated.
    ///
    /// # Errors
    ///
    /// `Error::Timeout` if the actor did not terminate within the system's stop timeout.
    pub async fn graceful_stop(&self) -> Result<(), Error> {
        debug!("Actor {} is stopping gracefully.", self.pid);
        self.poison_future().wait().await
    }
}

impl PartialEq for Pid {
    fn eq(&self, other: &Self) -> bool {
        self.pid == other.pid
    }
}

impl Eq for Pid {}

impl Hash for Pid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pid.hash(state);
    }
}

impl Serialize for Pid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.pid.serialize(serializer)
    }
}

impl Display for Pid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.pid, f)
    }
}

impl Debug for Pid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pid")
            .field("pid", &self.pid)
            .field("context", &self.context)
            .finish()
    }
}
