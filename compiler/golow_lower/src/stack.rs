//! Stack growth for deeply nested types and expressions.

/// If less than this remains, grow the stack.
const RED_ZONE: usize = 100 * 1024;

/// Stack space allocated per growth.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, growing the stack first when the remaining space is below
/// the red zone.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
