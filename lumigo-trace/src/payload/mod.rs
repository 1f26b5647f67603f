// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! Bounded, structure-aware payload rendering.
//!
//! Everything an instrumentation captures from an application payload goes
//! through [`Serializer`] before it is set as a span attribute: secrets are
//! masked by key, the output is cut at the payload cap, and the result is
//! deterministic for a given input and configuration.

mod scrub;
mod serializer;

pub use scrub::Scrubber;
pub use serializer::{SerializationError, Serializer};
