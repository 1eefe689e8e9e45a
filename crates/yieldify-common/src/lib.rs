//! Common types and utilities for the yieldify rewriter and runtime.
//!
//! This crate provides foundational pieces used across all yieldify crates:
//! - Centralized limits and thresholds (recursion depths, step budgets)
//! - Keyword tables consulted by the call-site rewriter

// Centralized limits and thresholds
pub mod limits;

// Keyword tables - which words may never be treated as call targets
pub mod keywords;
pub use keywords::{is_marker_keyword, is_non_call_keyword, is_operand_keyword};
