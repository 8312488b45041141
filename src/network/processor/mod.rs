//! Processors run the passes of a [`NeuraNetwork`](super::NeuraNetwork): they own the layer
//! structures of the current input and the gradients of the last backward pass.

use std::borrow::Cow;

mod feedforward;
pub use feedforward::NeuraFeedforwardProcessor;

mod recurrent;
pub use recurrent::NeuraRecurrentProcessor;

/// Borrows `value`, or clones it when `copy` is set.
#[inline]
fn cow<T: Clone>(value: &T, copy: bool) -> Cow<'_, T> {
    if copy {
        Cow::Owned(value.clone())
    } else {
        Cow::Borrowed(value)
    }
}

#[inline]
fn cow_slice<T: Clone>(values: &[T], copy: bool) -> Cow<'_, [T]> {
    if copy {
        Cow::Owned(values.to_vec())
    } else {
        Cow::Borrowed(values)
    }
}
