//! Delivery of the run summary as a text message.

mod textbelt;
mod trait_def;

pub use textbelt::{TextbeltTransport, TEXTBELT_ENDPOINT};
pub use trait_def::{NotificationError, NotificationTransport};

#[cfg(any(test, feature = "mock"))]
pub use trait_def::MockNotificationTransport;
