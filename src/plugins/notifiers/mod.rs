// Notifier implementations
pub mod stdout;
pub mod telegram;

pub use stdout::StdoutNotifier;
pub use telegram::TelegramNotifier;
