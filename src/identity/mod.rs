//! Identity Module
//!
//! Decides which remote object is the counterpart of a declared resource.

mod matchable;
mod resolver;

pub use matchable::{capitalize_first, RemoteMatchable, RemoteObject};
pub use resolver::{match_candidate, MatchPolicy, Resolution, Resolver};
