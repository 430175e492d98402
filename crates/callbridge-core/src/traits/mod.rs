// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the callbridge collaborators.
//!
//! Traits use `#[async_trait]` so implementations can be boxed behind
//! `dyn` at the wiring layer and replaced with in-memory fakes in tests.

pub mod persistence;
pub mod source;

pub use persistence::TokenPersistence;
pub use source::EventSource;
