//! `hooks` crate — boundary traits the signature engine calls out through.
//!
//! The engine never talks to an identity provider or a delivery channel
//! directly; it goes through [`SignerDirectory`] and [`NotificationEmitter`].
//! The surrounding application supplies real implementations, tests use the
//! mocks in [`mock`].

pub mod error;
pub mod traits;
pub mod directory;
pub mod log;
pub mod mock;

pub use directory::StaticDirectory;
pub use error::HookError;
pub use log::LogNotifier;
pub use traits::{Notification, NotificationEmitter, NotificationKind, SignerDirectory};
