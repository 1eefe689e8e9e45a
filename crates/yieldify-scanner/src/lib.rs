//! Lexical layer for the yieldify rewriter.
//!
//! This crate provides the text-level building blocks the rewriter relies on:
//! - `scan` - Classifies string, comment and regex literal spans ("stringies")
//! - `encode` / `decode` - Swap those spans for placeholder tokens and back
//! - `PlaceholderMap` / `KeyGen` - Ordered token maps and unique token generation
//! - `find_closing_bracket` - Depth-counting bracket matcher

pub mod brackets;
pub use brackets::{Bracket, find_closing_bracket};

pub mod placeholder;
pub use placeholder::{KeyGen, Placeholder, PlaceholderMap, TokenFamily, decode};

pub mod span;
pub use span::{Quote, Span, SpanKind};

pub mod stringies;
pub use stringies::{Encoded, encode, scan};
