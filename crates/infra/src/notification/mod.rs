//! Post-save notification fan-out.

mod publisher;
#[cfg(feature = "redis")]
mod redis_bus;

pub use publisher::NotificationPublisher;
#[cfg(feature = "redis")]
pub use redis_bus::RedisNotificationBus;

#[cfg(test)]
pub(crate) use publisher::tests;
