//! Centralized limits and thresholds for the rewriter and the runtime.
//!
//! This module provides shared constants for recursion depths and step
//! budgets used throughout the codebase. Keeping them in one place means the
//! rewriter and the trampoline never disagree about a threshold.
//!
//! # Categories
//!
//! - **Recursion Depths**: Limits to prevent stack overflow in the recursive
//!   rewriting passes
//! - **Step Budgets**: How many synchronous trampoline steps run before control
//!   is handed back to the event loop

// =============================================================================
// Recursion Depth Limits (Rewriter)
// =============================================================================

/// Maximum nesting depth for region rewriting.
///
/// Every ordinary function, class body and suspendable body is rewritten by a
/// recursive call. Real code rarely nests more than a few dozen levels; past
/// this depth the rewriter stops descending and copies the region verbatim.
///
/// # JavaScript example
///
/// ```javascript
/// function a() { function b() { function c() { /* ... 256 levels ... */ } } }
/// ```
pub const MAX_REGION_DEPTH: u32 = 256;

/// Maximum nesting depth for call-site marker insertion.
///
/// Argument lists are rewritten recursively (innermost call first). Deeply
/// nested calls such as `f(f(f(f(...))))` add one frame per level.
///
/// # JavaScript example
///
/// ```javascript
/// var x = wrap(wrap(wrap(wrap(/* ... 1000 levels ... */))));
/// ```
pub const MAX_CALL_NESTING_DEPTH: u32 = 1_000;

// =============================================================================
// Step Budgets (Trampoline)
// =============================================================================

/// Number of synchronous steps a trampoline may take before deferring the
/// rest of the routine to the next event-loop tick.
///
/// A routine that keeps yielding plain values or already-settled deferreds
/// never leaves the driver loop on its own. After this many steps the driver
/// reschedules itself, which bounds both latency for other routines and the
/// native stack depth when settlements chain synchronously.
pub const TRAMPOLINE_STEP_BUDGET: u32 = 100;

// =============================================================================
// Cache Layout
// =============================================================================

/// Directory name used under the system temp directory for cached rewrites.
pub const CACHE_DIR_NAME: &str = "yieldify";
