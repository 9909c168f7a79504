//! These models represent the objects passed around by the agent
//!
//! Two formats overlap here:
//! - anthropic messages/tools, sent from the agent to the model backend
//! - tool dispatch requests and results, exchanged between the agent and the local tools
//!
//! The internal structs mirror the anthropic wire shapes closely enough that content blocks
//! serialize directly, while messages are converted by the provider so that bookkeeping
//! fields (such as the creation timestamp) never reach the wire.
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
