use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

pub(crate) fn next_id() -> usize {
    NEXT_ID.fetch_add(1, Ordering::SeqCst)
}

/// Elementwise sign, where zero counts as positive.
pub(crate) fn non_zero_sign(value: f64) -> f64 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

#[cfg(test)]
#[macro_export]
macro_rules! assert_approx {
    ( $left:expr, $right:expr, $epsilon:expr ) => {
        let left = $left;
        let right = $right;
        if ((left - right) as f64).abs() >= $epsilon as f64 {
            panic!("Expected {} to be approximately equal to {}", left, right);
        }
    };
}
