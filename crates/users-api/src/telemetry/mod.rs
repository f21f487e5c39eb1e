//! Logging and tracing for the service.
//!
//! Every event is written to stdout as JSON. Setting
//! `OTEL_EXPORTER_OTLP_ENDPOINT` additionally exports spans over OTLP/gRPC.
//! The level comes from `LOG_LEVEL` (default `info`) unless `RUST_LOG` is set.
//!
//! User field values and key material are never recorded in events or span
//! attributes. Emails are used for lookups and are not logged.

pub mod init;

pub use init::{init_telemetry, shutdown_telemetry};
