pub(crate) mod bootstrap;
mod cart_log;
pub(crate) mod loop_runner;
