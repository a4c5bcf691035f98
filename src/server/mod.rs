pub mod handler;
pub mod listener;
pub mod supervisor;
pub mod error;

pub type Result<T> = std::result::Result<T, Error>;

pub use error::Error;
pub use listener::{BoundListener, ListenerConfig, ListenerKind};
pub use supervisor::{serve, Supervisor};
