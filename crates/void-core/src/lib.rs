//! Void Core — shared abstractions for the shout notification pipeline.
//!
//! This crate defines the ports that the notification context depends on:
//! the durable queue broker, the notification store and the shout
//! repository. It contains no infrastructure code.

pub mod broker;
pub mod clock;
pub mod error;
pub mod event;
pub mod repository;
pub mod store;
