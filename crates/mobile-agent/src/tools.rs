pub mod dispatcher;
pub mod registry;

pub use dispatcher::ToolDispatcher;
pub use registry::{all_tools, get_tool};
