pub mod notify;

pub use notify::TracingNotifier;
