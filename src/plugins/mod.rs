pub mod notifiers;
pub mod traits;

pub use notifiers::{StdoutNotifier, TelegramNotifier};
pub use traits::{NotificationResult, Notifier};
