//! HTTP routes.

pub mod health;
pub mod notifications;
pub mod shouts;
