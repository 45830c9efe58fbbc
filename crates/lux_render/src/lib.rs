//! Progressive rendering for lux.
//!
//! [`ProgressiveRenderer`] drives a pool of worker threads over a
//! [`Framebuffer`] whose tasks start coarse and refine toward full
//! resolution. The framebuffer publishes gamma-encoded [`DisplayImage`]s
//! that a viewer or file writer can pick up at any time.

mod config;
mod error;
mod framebuffer;
mod scheduler;
mod task;
mod worker;

pub use config::{IntegratorConfig, RendererConfig, MAX_SUBPATH_VERTICES};
pub use error::RenderError;
pub use framebuffer::{color_to_rgba, DisplayImage, Framebuffer, MATERIALIZE_INTERVAL};
pub use scheduler::ProgressiveRenderer;
pub use task::{build_initial_tasks, PixelRange, Splat, Task, MAX_TASK_SPP};
pub use worker::{render_sample, render_task, WorkerContext};
