//! Application-level orchestration.
//!
//! This module owns run lifecycle control (start/pause/stop/update), the status poller,
//! and post-run processing such as summaries and exports. UI/CLI layers call into this
//! module to keep responsibilities separated.

mod controller;
mod poller;
mod post_process;

pub(crate) use controller::{run_controller, ControllerSettings, RunController, UiCommand};
pub(crate) use post_process::process_run_completion;
