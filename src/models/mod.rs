//! Data models for the Zendesk API.
//!
//! This module contains type definitions for tickets, users, comments,
//! uploads and the shared response envelopes.

mod comment;
mod common;
mod ticket;
mod user;

pub use comment::*;
pub use common::*;
pub use ticket::*;
pub use user::*;
