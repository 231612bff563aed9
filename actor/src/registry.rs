// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Process registry
//!
//! Maps process identifiers to the processes that receive their messages. Actors and
//! futures both register here.
//!

use crate::{Error, MessageEnvelope, Pid, mailbox::SystemMessage};

use dashmap::{DashMap, mapref::entry::Entry};

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Anything that can receive messages addressed to a `Pid`.
///
/// Both methods hand the message back when the process can no longer accept it, so the
/// caller can reroute it to dead letters.
pub trait Process: Send + Sync {
    fn send_user_message(
        &self,
        pid: &Pid,
        envelope: MessageEnvelope,
    ) -> Result<(), MessageEnvelope>;

    fn send_system_message(
        &self,
        pid: &Pid,
        message: SystemMessage,
    ) -> Result<(), SystemMessage>;
}

/// Registry of local processes.
pub(crate) struct ProcessRegistry {
    address: String,
    sequence: AtomicU64,
    processes: DashMap<String, Arc<dyn Process>>,
}

impl ProcessRegistry {
    pub(crate) fn new(address: &str) -> Self {
        Self {
            address: address.to_owned(),
            sequence: AtomicU64::new(0),
            processes: DashMap::new(),
        }
    }

    pub(crate) fn address(&self) -> &str {
        &self.address
    }

    /// Next automatically generated process name (`$1`, `$2`, ...).
    pub(crate) fn next_id(&self) -> String {
        format!("${}", self.sequence.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Registers `process` under `id`.
    pub(crate) fn add(
        &self,
        id: &str,
        process: Arc<dyn Process>,
    ) -> Result<Pid, Error> {
        match self.processes.entry(id.to_owned()) {
            Entry::Occupied(_) => Err(Error::NameExists(id.to_owned())),
            Entry::Vacant(entry) => {
                entry.insert(process);
                Ok(Pid::new(&self.address, id))
            }
        }
    }

    pub(crate) fn remove(&self, pid: &Pid) {
        self.processes.remove(pid.id());
    }

    /// Looks up a local process.
    pub(crate) fn get(&self, pid: &Pid) -> Option<Arc<dyn Process>> {
        if pid.address() != self.address {
            return None;
        }
        self.processes.get(pid.id()).map(|entry| entry.value().clone())
    }

    pub(crate) fn len(&self) -> usize {
        self.processes.len()
    }
}
