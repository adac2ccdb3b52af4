pub mod command;
pub mod handler;
