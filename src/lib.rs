pub mod args;
pub mod cmd;
pub mod snippet;
pub mod store;
pub mod tex;

mod exec;
