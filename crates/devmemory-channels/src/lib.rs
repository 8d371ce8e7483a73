//! # DevMemory Channels
//! Outbound delivery of finished reports. Failures never escape as errors;
//! each send resolves to a [`devmemory_core::DeliveryAttempt`].

pub mod discord;
pub mod standup;

pub use discord::{DELIVERY_TARGET, DiscordClient, DiscordPayload};
pub use standup::{StandupNotifier, select_mode};
