//! Core services for quay.
//!
//! This crate owns the tool catalog shared by every boundary adapter, the
//! executor that turns a tool invocation into a terminal lookup, the
//! language-model seam, and the two-round conversation orchestrator used by
//! the chat endpoint. The `MySQL` backing store lives under [`store`].

pub mod catalog;
pub mod conversation;
pub mod llm;
pub mod store;
pub mod tools;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
