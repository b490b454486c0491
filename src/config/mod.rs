//! JSON configuration of the command-line tools.

pub mod step_fit_demo;
