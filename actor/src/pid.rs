// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Process identifier
//!
//! A `Pid` names a process registered in an actor system. It is a plain value: it can be
//! cloned, hashed, compared and serialized, and it carries no way to act on the process by
//! itself. Sending always goes through a context or through the system.
//!

use serde::{Deserialize, Serialize};

use std::fmt::{Display, Formatter};

/// Address of processes living in the local actor system.
pub const LOCAL_ADDRESS: &str = "nonhost";

/// Process identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pid {
    address: String,
    id: String,
}

impl Pid {
    /// Creates a process identifier.
    pub fn new(address: &str, id: &str) -> Self {
        Self {
            address: address.to_owned(),
            id: id.to_owned(),
        }
    }

    /// Address of the system hosting the process.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Identifier of the process within its system.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns `true` if the process lives in the local system.
    pub fn is_local(&self) -> bool {
        self.address == LOCAL_ADDRESS
    }
}

impl Display for Pid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.address, self.id)
    }
}
