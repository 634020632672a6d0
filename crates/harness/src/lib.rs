mod editor;
pub mod fixtures;
mod server;

pub use editor::{Session, TestEditor};
pub use server::{Endpoint, FakeBackend};
