// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # System messages
//!
//! Lifecycle messages are the runtime's own types. `Terminated` is the exception: it carries
//! an address, so it is translated into a typed [`Terminated`] bound to the receiving context
//! before it reaches typed code.
//!
//! Two marker traits classify the lifecycle messages. A [`SystemMessage`] is delivered by the
//! runtime through the system queue; an [`AutoReceiveMessage`] is handled by the runtime itself
//! and then passed on to the actor.
//!

use crate::Pid;

use actor::{ReceiverContext, ReceiverFunc};

use std::{any::Any, sync::Arc};

pub use actor::{
    DeadLetterEvent, Message, MessageEnvelope, MessageHeader as ReadonlyMessageHeader,
    PoisonPill, ReceiveTimeout, Restarting, Started, Stopped, Stopping,
};

/// Message delivered by the runtime through the system queue.
pub trait SystemMessage: Any + Send + Sync {}

impl SystemMessage for Started {}
impl SystemMessage for Terminated {}
impl SystemMessage for actor::Terminated {}

/// Message the runtime acts upon before the actor sees it.
pub trait AutoReceiveMessage: Any + Send + Sync {}

impl AutoReceiveMessage for Restarting {}
impl AutoReceiveMessage for Stopping {}
impl AutoReceiveMessage for Stopped {}
impl AutoReceiveMessage for PoisonPill {}

/// `true` if `message` is one of the [`SystemMessage`] types.
pub fn is_system_message(message: &Message) -> bool {
    message.is::<Started>() || message.is::<Terminated>() || message.is::<actor::Terminated>()
}

/// `true` if `message` is one of the [`AutoReceiveMessage`] types.
pub fn is_auto_receive_message(message: &Message) -> bool {
    message.is::<Restarting>()
        || message.is::<Stopping>()
        || message.is::<Stopped>()
        || message.is::<PoisonPill>()
}

/// The payload of `message`: its inner message if it is an envelope, itself otherwise.
pub fn unwrap_envelope_message(message: &Message) -> Message {
    match message.downcast_ref::<MessageEnvelope>() {
        Some(envelope) => envelope.message.clone(),
        None => message.clone(),
    }
}

/// A watched actor or a child terminated.
#[derive(Clone, Debug, PartialEq)]
pub struct Terminated {
    /// The terminated actor, bound to the context that received the notification.
    pub who: Pid,
    pub address_terminated: bool,
}

/// Runtime middleware replacing `actor::Terminated` with its typed counterpart.
pub(crate) fn message_converter(next: ReceiverFunc) -> ReceiverFunc {
    Arc::new(
        move |ctx: &mut dyn ReceiverContext, mut envelope: MessageEnvelope| {
            let typed = envelope
                .message
                .downcast_ref::<actor::Terminated>()
                .map(|terminated| Terminated {
                    who: Pid::new(ctx.context_handle(), terminated.who.clone()),
                    address_terminated: terminated.address_terminated,
                });
            if let Some(typed) = typed {
                envelope.message = Arc::new(typed);
            }
            next(ctx, envelope)
        },
    )
}
