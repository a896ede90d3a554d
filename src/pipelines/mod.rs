//! Render pipelines and the passes built on them.
//!
//! - `basic` holds the pipeline construction helpers every pass uses
//! - `light` uploads scene lights for the shading passes
//! - `common` provides the full-screen blit
//! - `forward`, `gbuffer_fill` and `deferred_lighting` are the scene passes

pub mod basic;
pub mod common;
pub mod deferred_lighting;
pub mod forward;
pub mod gbuffer_fill;
pub mod light;
