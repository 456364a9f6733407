//! E2E test scenarios.
//!
//! Each module covers one cross-cutting daemon behavior: config error
//! handling, module fault isolation, startup lifecycle, the
//! flood-detection pipeline, and graceful shutdown.

mod config_error;
mod fault_isolation;
mod lifecycle;
mod pipeline_flow;
mod shutdown;
