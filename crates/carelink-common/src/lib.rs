pub mod errors;
pub mod events;
pub mod id;
pub mod notifications;

pub use errors::{CareError, ConfigError};
pub use events::{Event, EventBus};
pub use id::{IdSequence, MessageId};
pub use notifications::{Notification, NotificationLevel};

pub type Result<T> = std::result::Result<T, CareError>;
