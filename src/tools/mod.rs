//! MCP tool inputs for the Zendesk bridge.
//!
//! This module contains the input types for the MCP tools that expose
//! support desk operations.

mod inputs;

pub use inputs::*;
