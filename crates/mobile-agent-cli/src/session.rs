pub mod message_serialize;
#[allow(clippy::module_inception)]
pub mod session;
pub mod session_file;

pub use session::Session;
