//! Entity types stored in the four knowledge base collections

pub mod atomic;
pub mod composite;
pub mod entity;
pub mod filter;
pub mod pattern;
pub mod platform;
pub mod terminology;
