//! Numeric helpers shared by decoding and filtering.

/// Logistic function.
#[inline]
pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Returns `(index, value)` of the largest element, preferring the lowest
/// index on ties. Returns `None` for an empty slice.
pub(crate) fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    let mut iter = values.iter().copied().enumerate();
    let first = iter.next()?;
    Some(iter.fold(first, |best, (idx, value)| {
        if value > best.1 {
            (idx, value)
        } else {
            best
        }
    }))
}
