//! Index-preserving maps that run on rayon or inline.

use rayon::prelude::*;

/// Map every item into its own output slot, in parallel when asked.
///
/// The output has one entry per input, in input order, so callers can
/// index the result by position.
pub fn map_slots<T, R, F>(items: &[T], parallel: bool, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    if parallel {
        items.par_iter().map(f).collect()
    } else {
        items.iter().map(f).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_preserved() {
        let items: Vec<u32> = (0..1000).collect();
        let doubled = map_slots(&items, true, |v| v * 2);
        assert_eq!(doubled, map_slots(&items, false, |v| v * 2));
        assert_eq!(doubled[999], 1998);
    }
}
