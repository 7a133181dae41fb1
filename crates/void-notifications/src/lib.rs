//! Void — shout notification bounded context.
//!
//! Responsible for turning a committed shout into one notification per other
//! user: publishing the `ShoutCreated` event, consuming it from the durable
//! queue, and fanning it out to the notification store.

pub mod application;
pub mod domain;
