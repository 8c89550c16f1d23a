//! Canonical display order of stems

use std::cmp::Ordering;

/// Default priority list, first shown first
pub const CANONICAL_STEM_ORDER: [&str; 6] = ["drums", "bass", "guitar", "piano", "vocals", "other"];

/// Rank of `name` in `order` (case-insensitive); unknown names rank last
pub fn stem_rank<S: AsRef<str>>(order: &[S], name: &str) -> usize {
    order
        .iter()
        .position(|known| known.as_ref().eq_ignore_ascii_case(name))
        .unwrap_or(order.len())
}

pub fn compare_stems<S: AsRef<str>>(order: &[S], a: &str, b: &str) -> Ordering {
    stem_rank(order, a).cmp(&stem_rank(order, b))
}

/// Stable sort by rank; unknown names keep their relative input order
pub fn sort_by_stem_order<T, S: AsRef<str>>(items: &mut [T], order: &[S], name: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| compare_stems(order, name(a), name(b)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order() {
        let mut names = vec!["vocals", "other", "drums", "piano", "bass", "guitar"];
        sort_by_stem_order(&mut names, &CANONICAL_STEM_ORDER, |n| *n);
        assert_eq!(names, CANONICAL_STEM_ORDER.to_vec());
    }

    #[test]
    fn test_unknown_last_and_stable() {
        let mut names = vec!["synth", "Vocals", "fx", "DRUMS", "brass"];
        sort_by_stem_order(&mut names, &CANONICAL_STEM_ORDER, |n| *n);
        assert_eq!(names, vec!["DRUMS", "Vocals", "synth", "fx", "brass"]);
    }

    #[test]
    fn test_rank() {
        assert_eq!(stem_rank(&CANONICAL_STEM_ORDER, "bass"), 1);
        assert_eq!(stem_rank(&CANONICAL_STEM_ORDER, "kazoo"), 6);
    }
}
