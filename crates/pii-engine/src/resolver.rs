//! Overlap resolution.
//!
//! Candidates are ordered by declared priority (descending), then start
//! offset, then registration order, and swept greedily: a candidate is
//! accepted only when its range shares no byte with anything accepted
//! before it. Declared priority alone decides contested ranges;
//! confidence plays no part at this layer.

use std::collections::BTreeMap;

use pii_patterns::PatternDescriptor;

use crate::types::Candidate;

/// Resolve overlaps. `seeds` are ranges already claimed by earlier
/// passes; candidates touching them are rejected. Returns accepted
/// candidates ordered by start offset.
pub(crate) fn resolve(
    mut candidates: Vec<Candidate>,
    active: &[PatternDescriptor],
    seeds: &[(usize, usize)],
) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        let pa = active[a.pattern].priority;
        let pb = active[b.pattern].priority;
        pb.cmp(&pa)
            .then(a.start.cmp(&b.start))
            .then(a.pattern.cmp(&b.pattern))
    });

    // Accepted ranges keyed by start; non-overlapping, so checking the
    // predecessor of the candidate end is enough.
    let mut ranges: BTreeMap<usize, usize> = seeds.iter().copied().collect();
    let mut accepted = Vec::new();
    for candidate in candidates {
        let conflict = ranges
            .range(..candidate.end)
            .next_back()
            .map(|(_, &end)| end > candidate.start)
            .unwrap_or(false);
        if !conflict {
            ranges.insert(candidate.start, candidate.end);
            accepted.push(candidate);
        }
    }

    accepted.sort_by_key(|c| c.start);
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use pii_patterns::{PatternCatalog, PatternSpec};

    fn candidate(pattern: usize, start: usize, end: usize) -> Candidate {
        Candidate {
            pattern,
            start,
            end,
            value: "x".repeat(end - start),
            confidence: 1.0,
        }
    }

    fn catalog(priorities: &[i32]) -> PatternCatalog {
        let specs: Vec<PatternSpec> = priorities
            .iter()
            .enumerate()
            .map(|(i, p)| PatternSpec::new(format!("kind{i}"), "x").with_priority(*p))
            .collect();
        PatternCatalog::empty().with_custom(&specs).unwrap()
    }

    #[test]
    fn test_higher_priority_wins_contested_range() {
        let catalog = catalog(&[10, 90]);
        let active: Vec<_> = catalog.iter().cloned().collect();
        // Low-priority candidate listed first; order must not matter.
        let accepted = resolve(
            vec![candidate(0, 0, 10), candidate(1, 5, 15)],
            &active,
            &[],
        );
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].pattern, 1);
    }

    #[test]
    fn test_equal_priority_earlier_start_wins() {
        let catalog = catalog(&[50, 50]);
        let active: Vec<_> = catalog.iter().cloned().collect();
        let accepted = resolve(
            vec![candidate(1, 3, 12), candidate(0, 0, 8)],
            &active,
            &[],
        );
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].start, 0);
    }

    #[test]
    fn test_tie_broken_by_registration_order() {
        let catalog = catalog(&[50, 50]);
        let active: Vec<_> = catalog.iter().cloned().collect();
        let accepted = resolve(
            vec![candidate(1, 0, 8), candidate(0, 0, 8)],
            &active,
            &[],
        );
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].pattern, 0);
    }

    #[test]
    fn test_adjacent_ranges_both_accepted() {
        let catalog = catalog(&[50, 50]);
        let active: Vec<_> = catalog.iter().cloned().collect();
        let accepted = resolve(
            vec![candidate(0, 0, 5), candidate(1, 5, 10)],
            &active,
            &[],
        );
        assert_eq!(accepted.len(), 2);
    }

    #[test]
    fn test_single_shared_byte_is_overlap() {
        let catalog = catalog(&[50, 50]);
        let active: Vec<_> = catalog.iter().cloned().collect();
        let accepted = resolve(
            vec![candidate(0, 0, 5), candidate(1, 4, 10)],
            &active,
            &[],
        );
        assert_eq!(accepted.len(), 1);
    }

    #[test]
    fn test_seeds_block_even_higher_priority() {
        let catalog = catalog(&[100]);
        let active: Vec<_> = catalog.iter().cloned().collect();
        let accepted = resolve(vec![candidate(0, 3, 9)], &active, &[(0, 5)]);
        assert!(accepted.is_empty());

        let accepted = resolve(vec![candidate(0, 5, 9)], &active, &[(0, 5)]);
        assert_eq!(accepted.len(), 1);
    }

    #[test]
    fn test_output_ordered_by_start() {
        let catalog = catalog(&[90, 50]);
        let active: Vec<_> = catalog.iter().cloned().collect();
        let accepted = resolve(
            vec![candidate(0, 20, 25), candidate(1, 0, 5), candidate(0, 10, 15)],
            &active,
            &[],
        );
        let starts: Vec<usize> = accepted.iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![0, 10, 20]);
    }

    #[test]
    fn test_contained_range_rejected() {
        let catalog = catalog(&[90, 10]);
        let active: Vec<_> = catalog.iter().cloned().collect();
        // A generic hit fully inside a higher-priority span.
        let accepted = resolve(
            vec![candidate(1, 4, 12), candidate(0, 0, 20)],
            &active,
            &[],
        );
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].pattern, 0);
    }
}
