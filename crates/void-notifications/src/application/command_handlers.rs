//! Command handlers for the shout write path.
//!
//! Persist first, then publish. Publishing is fire-and-forget: the shout is
//! already committed, so a broker failure only costs its notifications.

use tracing::{info, instrument, warn};
use void_core::clock::Clock;
use void_core::error::DomainError;
use void_core::repository::{Shout, ShoutRepository};

use super::publisher::ShoutPublisher;
use crate::domain::commands::CreateShout;
use crate::domain::events::ShoutCreated;

/// Handles the `CreateShout` command: loads the author, persists the shout,
/// and publishes a `ShoutCreated` event for it.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the content is blank,
/// `DomainError::NotFound` if the author does not exist, or
/// `DomainError::Infrastructure` if the shout cannot be stored. Publish
/// failures are logged and never returned.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id, author_id = command.author_id))]
pub async fn handle_create_shout(
    command: &CreateShout,
    clock: &dyn Clock,
    repo: &dyn ShoutRepository,
    publisher: &ShoutPublisher,
) -> Result<Shout, DomainError> {
    if command.content.trim().is_empty() {
        return Err(DomainError::Validation("shout content must not be blank".into()));
    }

    let author = repo.find_user(command.author_id).await?;
    let shout = repo
        .insert_shout(author.id, &command.content, clock.now())
        .await?;
    info!(shout_id = shout.id, "stored shout");

    match ShoutCreated::from_shout(&shout, &author) {
        Ok(event) => {
            if let Err(e) = publisher.publish(&event).await {
                warn!(shout_id = shout.id, error = %e, "shout stored without notifications");
            }
        }
        Err(e) => warn!(shout_id = shout.id, error = %e, "could not build shout event"),
    }

    Ok(shout)
}
