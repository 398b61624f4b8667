mod bootstrap;
mod commands;
mod loop_runner;
mod text_map;

pub(crate) use bootstrap::build_app;
pub(crate) use loop_runner::run;
