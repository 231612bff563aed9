// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Futures
//!
//! A `Future` is a short-lived process registered in the system so it can be used as the
//! sender of a request or as the watcher of a stopping actor. The first user message (or
//! `Terminated` notification) it receives resolves it; anything arriving later is discarded.
//!

use crate::{
    ActorSystem, Error, Message, MessageEnvelope, Pid,
    mailbox::SystemMessage,
    message::DeadLetterResponse,
    registry::Process,
};

use tokio::{sync::oneshot, time::Instant};
use tracing::debug;

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

type Outcome = Result<Message, Error>;

/// Handle to a pending reply.
pub struct Future {
    system: Option<ActorSystem>,
    pid: Option<Pid>,
    receiver: Option<oneshot::Receiver<Outcome>>,
    deadline: Instant,
}

impl Future {
    /// Registers a new future process that expires after `timeout`.
    pub fn new(system: &ActorSystem, timeout: Duration) -> Self {
        let (sender, receiver) = oneshot::channel();
        let process: Arc<dyn Process> = Arc::new(FutureProcess {
            sender: Mutex::new(Some(sender)),
        });
        let pid = loop {
            let id = format!("future{}", system.next_process_id());
            if let Ok(pid) = system.registry().add(&id, process.clone()) {
                break pid;
            }
        };
        Self {
            system: Some(system.clone()),
            pid: Some(pid),
            receiver: Some(receiver),
            deadline: Instant::now() + timeout,
        }
    }

    /// A future that can never resolve because there is no system to register it in.
    pub(crate) fn detached() -> Self {
        Self {
            system: None,
            pid: None,
            receiver: None,
            deadline: Instant::now(),
        }
    }

    /// Address replies must be sent to.
    pub fn pid(&self) -> Option<&Pid> {
        self.pid.as_ref()
    }

    /// Waits for the reply.
    ///
    /// # Errors
    ///
    /// * `Error::Timeout` if nothing arrived before the deadline.
    /// * `Error::DeadLetter` if the request target did not exist.
    /// * `Error::SystemStopped` if the future was created without a live system.
    pub async fn result(mut self) -> Result<Message, Error> {
        let Some(receiver) = self.receiver.take() else {
            return Err(Error::SystemStopped);
        };
        match tokio::time::timeout_at(self.deadline, receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(Error::FutureDropped),
            Err(_) => {
                if let Some(pid) = &self.pid {
                    debug!("Future {} timed out.", pid);
                }
                Err(Error::Timeout)
            }
        }
    }

    /// Waits for the future to resolve, discarding the reply.
    pub async fn wait(self) -> Result<(), Error> {
        self.result().await.map(|_| ())
    }
}

impl Drop for Future {
    fn drop(&mut self) {
        if let (Some(system), Some(pid)) = (&self.system, &self.pid) {
            system.registry().remove(pid);
        }
    }
}

struct FutureProcess {
    sender: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl FutureProcess {
    fn complete(&self, outcome: Outcome) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(sender) = sender {
            let _ = sender.send(outcome);
        }
    }
}

impl Process for FutureProcess {
    fn send_user_message(
        &self,
        _pid: &Pid,
        envelope: MessageEnvelope,
    ) -> Result<(), MessageEnvelope> {
        let dead_target = envelope
            .message
            .downcast_ref::<DeadLetterResponse>()
            .map(|response| response.target.clone());
        match dead_target {
            Some(target) => self.complete(Err(Error::DeadLetter(target))),
            None => self.complete(Ok(envelope.message)),
        }
        Ok(())
    }

    fn send_system_message(
        &self,
        _pid: &Pid,
        message: SystemMessage,
    ) -> Result<(), SystemMessage> {
        if let SystemMessage::Terminated(terminated) = message {
            self.complete(Ok(Arc::new(terminated)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::message::Terminated;

    #[tokio::test]
    async fn test_future_resolves_with_first_reply() {
        let system = ActorSystem::default();
        let future = Future::new(&system, Duration::from_secs(1));
        let pid = future.pid().cloned().unwrap();

        system.send_user_message(&pid, MessageEnvelope::new(Arc::new(7u32)));
        system.send_user_message(&pid, MessageEnvelope::new(Arc::new(8u32)));

        let reply = future.result().await.unwrap();
        assert_eq!(reply.downcast_ref::<u32>(), Some(&7));
        assert_eq!(system.process_count(), 0);
    }

    #[tokio::test]
    async fn test_future_times_out() {
        let system = ActorSystem::default();
        let started = std::time::Instant::now();
        let future = Future::new(&system, Duration::from_millis(30));
        assert_eq!(future.result().await.unwrap_err(), Error::Timeout);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_future_resolves_on_terminated() {
        let system = ActorSystem::default();
        let future = Future::new(&system, Duration::from_secs(1));
        let pid = future.pid().cloned().unwrap();
        let who = Pid::new("nonhost", "$9");
        system.send_system_message(
            &pid,
            SystemMessage::Terminated(Terminated {
                who: who.clone(),
                address_terminated: false,
            }),
        );

        let reply = future.result().await.unwrap();
        assert_eq!(reply.downcast_ref::<Terminated>().map(|t| &t.who), Some(&who));
    }

    #[tokio::test]
    async fn test_detached_future_reports_stopped_system() {
        let future = Future::detached();
        assert!(future.pid().is_none());
        assert_eq!(future.wait().await.unwrap_err(), Error::SystemStopped);
    }
}
