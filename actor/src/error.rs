// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Errors module
//!

use crate::Pid;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for the actor system.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// An actor with the same name is already registered.
    #[error("Actor {0} exists.")]
    NameExists(String),
    /// A future did not resolve before its deadline.
    #[error("Future timed out.")]
    Timeout,
    /// The request target was not reachable and the message went to dead letters.
    #[error("Message to {0} was delivered to dead letters.")]
    DeadLetter(Pid),
    /// The process behind a future went away before producing a result.
    #[error("Future was dropped before it resolved.")]
    FutureDropped,
    /// The actor system has been shut down.
    #[error("The actor system is stopped.")]
    SystemStopped,
}
