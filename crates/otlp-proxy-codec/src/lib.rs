//! OTLP decoding and rendering for the relay pipeline
//!
//! This crate holds the pure, per-request halves of the relay: turning a raw
//! export body into a typed OTLP request, and turning that request into a
//! deterministic YAML document written to an output sink. It performs no
//! network I/O.

pub mod codec;
pub mod error;
pub mod render;
pub mod signal;
pub mod sink;

pub use codec::{decode, DecodedBatch};
pub use error::{DecodeError, RenderError};
pub use render::{render, render_to};
pub use signal::{InputFormat, SignalKind};
pub use sink::{DocumentSink, MemorySink, StdoutSink};

/// Re-export of the OTLP message types used by [`DecodedBatch`].
pub use opentelemetry_proto::tonic as proto;
