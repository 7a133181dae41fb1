//! Domain model for the notification context.

pub mod commands;
pub mod events;
pub mod notification;
