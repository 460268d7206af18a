//! `armos-runtime` – the arm module and process plumbing.
//!
//! Wires the kernel's control pieces to named hardware and gives binaries a
//! single place to set up logging.
//!
//! # Modules
//!
//! - [`arm`] – [`Arm`][arm::Arm]: binds the arm motor, wrist servo, and flap
//!   servo, spawns the hold loop, and speaks degrees.
//! - [`flap`] – [`Flap`][flap::Flap]: the three-stop payload release flap.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber with an optional OTLP span exporter. Set
//!   `OTEL_EXPORTER_OTLP_ENDPOINT` to export spans to any OTLP-compatible
//!   collector.

pub mod arm;
pub mod flap;
pub mod telemetry;

pub use arm::Arm;
pub use flap::{Flap, FlapState};
