//! # Notify
//!
//! Change notifications for coldap. Writers record `(topic, subject)` pairs on
//! a [`Notifier`]; the run flushes it once through a [`Publisher`].
//!
//! ## Features
//!
//! - `kafka`: Enable the Kafka transport (builds librdkafka, requires cmake)

pub mod error;
pub mod notifier;
pub mod publisher;

#[cfg(feature = "kafka")]
pub mod kafka;

pub use error::{NotifyError, NotifyResult};
pub use notifier::{ChangeNotification, Notifier};
pub use publisher::{InMemoryPublisher, LoggingPublisher, Publisher, UdpPublisher};

#[cfg(feature = "kafka")]
pub use kafka::KafkaPublisher;
