//! Application services for the notification context.

pub mod backoff;
pub mod command_handlers;
pub mod consumer;
pub mod fan_out;
pub mod publisher;
