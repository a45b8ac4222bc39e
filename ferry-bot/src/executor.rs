//! Batch transfer executor.

use crate::traits::{ChannelResolver, MessageCopier, TransferError};
use crate::types::{ChannelRef, MessageRef, TransferResult};
use std::sync::Arc;

/// Replicates a selected batch of messages into the destination channel.
pub struct BatchExecutor {
    resolver: Arc<dyn ChannelResolver>,
    copier: Arc<dyn MessageCopier>,
}

impl BatchExecutor {
    pub fn new(resolver: Arc<dyn ChannelResolver>, copier: Arc<dyn MessageCopier>) -> Self {
        Self { resolver, copier }
    }

    /// Replicate `messages` from `source` into `destination`, in order.
    ///
    /// Both handles are re-resolved once up front; a failure there
    /// aborts the whole batch before any copy is attempted. Individual
    /// copy failures are tallied and never abort the run, so
    /// `succeeded + failed == messages.len()` whenever this returns
    /// `Ok`. Copies are strictly sequential to preserve source-channel
    /// ordering and stay within transport rate limits.
    pub async fn run(
        &self,
        source: &ChannelRef,
        destination: &ChannelRef,
        messages: &[MessageRef],
    ) -> Result<TransferResult, TransferError> {
        let source = self
            .resolver
            .resolve(&source.raw)
            .await
            .map_err(TransferError::Source)?;
        let destination = self
            .resolver
            .resolve(&destination.raw)
            .await
            .map_err(TransferError::Destination)?;

        let mut result = TransferResult::default();

        for message in messages {
            match self
                .copier
                .copy_message(&destination, &source, message.message_id)
                .await
            {
                Ok(()) => {
                    result.succeeded += 1;
                    tracing::debug!(message_id = message.message_id, "message copied");
                }
                Err(e) => {
                    result.failed += 1;
                    tracing::warn!(
                        message_id = message.message_id,
                        error = %e,
                        "message copy failed"
                    );
                }
            }
        }

        tracing::info!(
            source_id = source.id,
            destination_id = destination.id,
            succeeded = result.succeeded,
            failed = result.failed,
            "archive run finished"
        );

        Ok(result)
    }
}
