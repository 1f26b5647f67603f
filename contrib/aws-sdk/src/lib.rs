// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! Lumigo instrumentation for the AWS SDK for Rust.
//!
//! Two cooperating pieces:
//!
//! - [`LumigoInterceptor`] hooks the AWS SDK request lifecycle: it injects
//!   the current trace context into outgoing SQS messages and captures
//!   request/response payloads and AWS attributes onto the active span.
//! - [`traced_messages`] wraps a `ReceiveMessage` result so that spans
//!   created while the application iterates the batch stay children of the
//!   receive span, with links to the trace context carried by each message.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lumigo_aws_sdk::{traced_messages, LumigoInterceptor};
//!
//! let sqs_config = aws_sdk_sqs::config::Builder::from(&sdk_config)
//!     .interceptor(LumigoInterceptor::new())
//!     .build();
//! let sqs_client = aws_sdk_sqs::Client::from_conf(sqs_config);
//!
//! let output = sqs_client.receive_message().queue_url(url).send().await?;
//! for message in &traced_messages(&output) {
//!     // spans created here join the receive span's trace
//! }
//! ```

mod interceptor;
mod messages;
mod services;

pub use interceptor::LumigoInterceptor;
pub use messages::{traced_messages, ScopeContext, TracedIter, TracedMessageList};

#[doc(hidden)]
pub mod testing {
    //! Entry points for driving the consumer machinery without an SQS
    //! round-trip. Not part of the public API.

    use aws_sdk_sqs::types::Message;
    use opentelemetry::Context;

    use crate::TracedMessageList;

    pub fn process(
        receive_cx: Context,
        messages: Vec<Message>,
        auto_filter_empty: bool,
    ) -> TracedMessageList {
        crate::messages::process_received_messages(receive_cx, messages, auto_filter_empty)
    }
}

use lumigo_opentelemetry::{HookRegistry, Instrumentor};

/// Instrumentor registration for the AWS SDK adapter.
///
/// The AWS SDK exposes its extension seam per client, so `install` only
/// claims the ID in the registry; the application still adds
/// [`LumigoInterceptor`] when building each service client.
#[derive(Debug, Default)]
pub struct AwsSdkInstrumentation;

impl Instrumentor for AwsSdkInstrumentation {
    fn id(&self) -> &'static str {
        "aws_sdk"
    }

    fn install(&self, _hooks: &HookRegistry) -> lumigo_trace::Result<()> {
        Ok(())
    }
}
