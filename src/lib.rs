// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Typed actor framework.
//! Re-exports the typed facade; the untyped runtime is available as [`runtime`].

pub use typed::*;

/// The untyped runtime behind the facade.
pub mod runtime {
    pub use actor::*;
}
