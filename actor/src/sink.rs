// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Event sink and subscriber.
//!
//! A sink forwards the events of a broadcast channel to a subscriber. It runs in its own task
//! until the channel closes.

use async_trait::async_trait;
use tokio::sync::broadcast::{Receiver as EventReceiver, error::RecvError};

use tracing::{debug, warn};

use std::fmt::Debug;

/// Events that can be published on a system event stream.
pub trait Event: Clone + Debug + Send + Sync + 'static {}

/// Delivers the events of a channel to a subscriber.
pub struct Sink<E: Event> {
    /// The subscriber that will be notified of events.
    subscriber: Box<dyn Subscriber<E>>,
    /// The broadcast receiver for events.
    event_receiver: EventReceiver<E>,
}

impl<E: Event> Sink<E> {
    /// Creates a new Sink with the given event receiver and subscriber.
    pub fn new(
        event_receiver: EventReceiver<E>,
        subscriber: impl Subscriber<E>,
    ) -> Self {
        Sink {
            subscriber: Box::new(subscriber),
            event_receiver,
        }
    }

    /// Runs the sink's event processing loop until the event channel is closed.
    ///
    /// Events lost because the subscriber fell behind are skipped.
    pub async fn run(&mut self) {
        loop {
            match self.event_receiver.recv().await {
                Ok(event) => {
                    debug!("Received event: {:?}. Notify to the subscriber.", event);
                    self.subscriber.notify(event).await;
                }
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Sink lagged behind, {} events skipped.", skipped);
                }
            }
        }
    }
}

/// Processes the events delivered by a [`Sink`].
#[async_trait]
pub trait Subscriber<E: Event>: Send + Sync + 'static {
    /// Called for every event received by the sink.
    async fn notify(&self, event: E);
}
