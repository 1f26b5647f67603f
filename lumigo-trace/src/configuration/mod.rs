// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

#[allow(clippy::module_inception)]
mod configuration;
pub(crate) mod sources;
pub mod supported_configurations;

pub use configuration::{Config, ConfigBuilder, DEFAULT_ENDPOINT};
pub use sources::ConfigSourceOrigin;
