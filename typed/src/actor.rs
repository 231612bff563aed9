// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Typed actors
//!

use crate::context::{Context, ContextWrapper};

use actor::AsAny;

use std::sync::Arc;

/// An actor processing messages through a typed context.
pub trait Actor: AsAny + Send + 'static {
    /// Processes the message available through `ctx.message()`.
    fn receive(&mut self, ctx: &mut dyn Context);
}

/// Actor that is a plain function.
#[derive(Clone)]
pub struct ReceiveFunc(Arc<dyn Fn(&mut dyn Context) + Send + Sync>);

impl ReceiveFunc {
    pub fn new<F>(receive: F) -> Self
    where
        F: Fn(&mut dyn Context) + Send + Sync + 'static,
    {
        Self(Arc::new(receive))
    }
}

impl Actor for ReceiveFunc {
    fn receive(&mut self, ctx: &mut dyn Context) {
        (self.0)(ctx)
    }
}

pub type ActorFunc = ReceiveFunc;

/// Runtime actor running a typed one.
pub(crate) struct ActorWrapper {
    actor: Box<dyn Actor>,
}

impl ActorWrapper {
    pub(crate) fn new(actor: Box<dyn Actor>) -> Self {
        Self { actor }
    }

    pub(crate) fn inner(&self) -> &dyn Actor {
        self.actor.as_ref()
    }
}

impl actor::Actor for ActorWrapper {
    fn receive(&mut self, ctx: &mut dyn actor::Context) {
        self.actor.receive(&mut ContextWrapper::new(ctx));
    }
}
