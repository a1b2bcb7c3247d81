//! Multi-pass scan planning.
//!
//! When multi-pass detection is enabled, the active patterns are
//! partitioned into priority bands and each band is scanned as its own
//! pass. Ranges claimed by an earlier pass are seeded into the overlap
//! resolver of every later pass, so an earlier pass always keeps what
//! it found, whatever the priorities of later candidates. Credential
//! kinds are pinned to the first band regardless of their declared
//! priority.

use pii_patterns::PatternDescriptor;

/// One priority band. `min_priority` is inclusive; bands are tried in
/// order, so each band covers priorities below the previous band's
/// floor.
pub(crate) struct PassBand {
    pub name: &'static str,
    pub min_priority: i32,
    pub pinned_kinds: &'static [&'static str],
}

pub(crate) const PASS_BANDS: &[PassBand] = &[
    PassBand {
        name: "critical-credentials",
        min_priority: 90,
        pinned_kinds: &[
            "api_key",
            "aws_access_key",
            "aws_secret_key",
            "private_key",
        ],
    },
    PassBand {
        name: "high-confidence",
        min_priority: 70,
        pinned_kinds: &[],
    },
    PassBand {
        name: "standard-pii",
        min_priority: 30,
        pinned_kinds: &[],
    },
    PassBand {
        name: "low-priority",
        min_priority: i32::MIN,
        pinned_kinds: &[],
    },
];

/// Band a descriptor scans in, clamped so that when fewer than four
/// passes run, the last selected band absorbs everything below it.
pub(crate) fn band_index(descriptor: &PatternDescriptor, pass_count: usize) -> usize {
    let idx = PASS_BANDS
        .iter()
        .position(|band| band.pinned_kinds.contains(&descriptor.kind.as_str()))
        .or_else(|| {
            PASS_BANDS
                .iter()
                .position(|band| descriptor.priority >= band.min_priority)
        })
        .unwrap_or(PASS_BANDS.len() - 1);
    idx.min(pass_count.saturating_sub(1))
}

/// Partition active descriptors into per-pass groups. Entries are
/// indices into `active`, so candidates produced inside a pass keep the
/// same pattern index namespace as a single-pass scan.
pub(crate) fn partition(active: &[PatternDescriptor], pass_count: usize) -> Vec<Vec<usize>> {
    let mut passes = vec![Vec::new(); pass_count];
    for (idx, descriptor) in active.iter().enumerate() {
        passes[band_index(descriptor, pass_count)].push(idx);
    }
    passes
}
