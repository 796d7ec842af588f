// Discord implementations of the delivery ports.

pub mod channel_publisher;
pub mod dm_notifier;
pub mod membership;

pub use channel_publisher::DiscordPublisher;
pub use dm_notifier::DiscordNotifier;
pub use membership::DiscordSubscriptionChecker;

/// Parse a channel handle into a snowflake. Zero is not a valid id.
pub(crate) fn parse_snowflake(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|id| *id != 0)
}
