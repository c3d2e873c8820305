//! Two-pointer join of ascending timestamp sequences.

use crate::stacking::error::{AlignmentError, Side};

/// Matches equal entries of two ascending sequences.
///
/// Returns two parallel index lists such that `a[ia[k]] == b[ib[k]]` for
/// every `k`. Entries without a counterpart are left out. The pointer into
/// `b` only moves forward, so both inputs must be sorted ascending; use
/// [`try_align`] when that is not already guaranteed.
///
/// ```
/// use qclcd_weather::align;
///
/// let (ia, ib) = align(&[1, 3, 5, 7], &[2, 3, 4, 7, 9]);
/// assert_eq!(ia, vec![1, 3]);
/// assert_eq!(ib, vec![1, 3]);
/// ```
pub fn align<T: Ord>(a: &[T], b: &[T]) -> (Vec<usize>, Vec<usize>) {
    let mut ia = Vec::new();
    let mut ib = Vec::new();
    let mut j = 0;
    for (i, value) in a.iter().enumerate() {
        while j < b.len() && b[j] < *value {
            j += 1;
        }
        if j == b.len() {
            break;
        }
        if b[j] == *value {
            ia.push(i);
            ib.push(j);
        }
    }
    (ia, ib)
}

/// [`align`], after checking that both inputs are sorted ascending.
pub fn try_align<T: Ord>(a: &[T], b: &[T]) -> Result<(Vec<usize>, Vec<usize>), AlignmentError> {
    if let Some(index) = first_unsorted(a) {
        return Err(AlignmentError::Unsorted {
            side: Side::Left,
            index,
        });
    }
    if let Some(index) = first_unsorted(b) {
        return Err(AlignmentError::Unsorted {
            side: Side::Right,
            index,
        });
    }
    Ok(align(a, b))
}

/// Position of the first element smaller than its predecessor.
fn first_unsorted<T: Ord>(values: &[T]) -> Option<usize> {
    values
        .windows(2)
        .position(|w| w[1] < w[0])
        .map(|i| i + 1)
}
