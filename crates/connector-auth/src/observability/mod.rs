//! Observability: metrics recording and the Prometheus recorder.

pub mod metrics;
