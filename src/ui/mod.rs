mod keyboard;
pub mod view;

#[cfg(feature = "ui")]
mod handlers;
#[cfg(feature = "ui")]
mod server;
#[cfg(all(test, feature = "ui"))]
mod tests;

pub use keyboard::{event_for_key, KeyboardInputHandler};

#[cfg(feature = "ui")]
pub use server::UiServer;
