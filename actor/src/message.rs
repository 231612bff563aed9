// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Messages
//!
//! Messages are type-erased: any `Send + Sync + 'static` value can travel between actors.
//! They are reference counted, so forwarding, stashing or publishing a message to dead letters
//! never copies the payload.
//!
//! This module also defines the lifecycle notifications the runtime delivers to actors
//! (`Started`, `Stopping`, ...) and the envelope every user message travels in.
//!

use crate::Pid;

use serde::{Deserialize, Serialize};

use std::{
    any::Any,
    collections::HashMap,
    fmt::{Debug, Formatter},
    sync::Arc,
};

/// Type-erased message payload.
pub type Message = Arc<dyn Any + Send + Sync>;

/// Read-only string header attached to an envelope.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageHeader(Arc<HashMap<String, String>>);

impl MessageHeader {
    /// Creates a header from a map.
    pub fn new(values: HashMap<String, String>) -> Self {
        Self(Arc::new(values))
    }

    /// Returns a copy of this header with `key` set to `value`.
    pub fn with(&self, key: &str, value: &str) -> Self {
        let mut values = self.0.as_ref().clone();
        values.insert(key.to_owned(), value.to_owned());
        Self::new(values)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_map(&self) -> HashMap<String, String> {
        self.0.as_ref().clone()
    }
}

/// A message plus its header and optional sender.
#[derive(Clone)]
pub struct MessageEnvelope {
    /// Message header.
    pub header: MessageHeader,
    /// Payload.
    pub message: Message,
    /// Address replies should go to.
    pub sender: Option<Pid>,
}

impl MessageEnvelope {
    /// Wraps a bare message in an envelope with no header and no sender.
    pub fn new(message: Message) -> Self {
        Self {
            header: MessageHeader::default(),
            message,
            sender: None,
        }
    }

    pub fn with_sender(mut self, sender: Option<Pid>) -> Self {
        self.sender = sender;
        self
    }

    pub fn with_header(mut self, header: MessageHeader) -> Self {
        self.header = header;
        self
    }

    /// Returns `true` if the payload is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.message.is::<T>()
    }
}

impl Debug for MessageEnvelope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageEnvelope")
            .field("header", &self.header)
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

/// Splits an envelope into its header, message and sender.
pub fn unwrap_envelope(
    envelope: MessageEnvelope,
) -> (MessageHeader, Message, Option<Pid>) {
    (envelope.header, envelope.message, envelope.sender)
}

/// Delivered once an actor incarnation is ready to process messages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Started;

/// Delivered when an actor begins to stop, before its children are stopped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stopping;

/// Last message an actor receives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stopped;

/// Delivered to the failing incarnation before it is replaced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restarting;

/// Delivered when no message arrived within the receive timeout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveTimeout;

/// User-level stop request: processed in mailbox order, after queued messages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoisonPill;

/// Notification that a watched process (or a child) has terminated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terminated {
    /// The terminated process.
    pub who: Pid,
    /// Whether the whole address (not only one process) became unreachable.
    pub address_terminated: bool,
}

/// Published on the event stream for every undeliverable message.
#[derive(Clone)]
pub struct DeadLetterEvent {
    /// Intended recipient.
    pub pid: Pid,
    /// Undelivered payload.
    pub message: Message,
    /// Sender of the undelivered message, if any.
    pub sender: Option<Pid>,
}

impl Debug for DeadLetterEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadLetterEvent")
            .field("pid", &self.pid)
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

/// Reply sent to a requester whose target does not exist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetterResponse {
    /// The unreachable target.
    pub target: Pid,
}

/// Messages that do not reset the receive timeout when processed.
pub(crate) fn influences_receive_timeout(message: &Message) -> bool {
    !(message.is::<ReceiveTimeout>()
        || message.is::<Started>()
        || message.is::<Stopping>()
        || message.is::<Stopped>()
        || message.is::<Restarting>())
}
