//! Overlap resolution over raw automaton hits.
//!
//! Hits are grouped into connected overlap clusters (hits are nodes,
//! overlap is an edge) and a policy-specific selection rule runs inside
//! each cluster. Clusters are disjoint along the token axis, so selections
//! never interact across clusters and the final span list is emitted in
//! ascending start order.

use crate::artifact::payload::Payload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Left-to-right walk; on a start tie take the longest span, then skip
    /// everything the chosen span covers.
    LeftmostLongest,
    /// Left-to-right walk; on a start tie take the earliest-inserted
    /// pattern, then skip everything the chosen span covers.
    LeftmostFirst,
    /// Per overlap cluster, repeatedly take the highest-salience hit and
    /// discard only the hits overlapping it.
    SalienceMax,
    /// No resolution: every raw hit in automaton emission order.
    All,
}

impl MatchPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "leftmost_longest" => Some(Self::LeftmostLongest),
            "leftmost_first" => Some(Self::LeftmostFirst),
            "salience_max" => Some(Self::SalienceMax),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeftmostLongest => "leftmost_longest",
            Self::LeftmostFirst => "leftmost_first",
            Self::SalienceMax => "salience_max",
            Self::All => "all",
        }
    }
}

/// A raw automaton hit in token units, before overlap resolution.
#[derive(Debug, Clone)]
pub struct Hit {
    pub start: usize,
    pub end: usize,
    pub pattern_index: usize,
    pub payload: Payload,
}

impl Hit {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Hit) -> bool {
        !(self.end <= other.start || other.end <= self.start)
    }
}

/// Apply a policy to a hit set. `All` preserves emission order; the other
/// policies return non-overlapping spans in ascending start order.
pub fn resolve_overlaps(hits: Vec<Hit>, policy: MatchPolicy) -> Vec<Hit> {
    if hits.is_empty() || policy == MatchPolicy::All {
        return hits;
    }

    let mut sorted = hits;
    sorted.sort_by_key(|h| (h.start, h.end, h.pattern_index));

    let mut resolved = Vec::new();
    for cluster in clusters(&sorted) {
        match policy {
            MatchPolicy::LeftmostLongest => select_leftmost(cluster, &mut resolved, true),
            MatchPolicy::LeftmostFirst => select_leftmost(cluster, &mut resolved, false),
            MatchPolicy::SalienceMax => select_salience_max(cluster, &mut resolved),
            MatchPolicy::All => unreachable!(),
        }
    }

    resolved.sort_by_key(|h| (h.start, h.end, h.pattern_index));
    resolved
}

/// Split start-sorted hits into maximal connected overlap clusters.
fn clusters(sorted: &[Hit]) -> impl Iterator<Item = &[Hit]> {
    let mut boundaries = Vec::new();
    let mut cluster_start = 0;
    let mut max_end = 0;

    for (i, hit) in sorted.iter().enumerate() {
        if i > 0 && hit.start >= max_end {
            boundaries.push((cluster_start, i));
            cluster_start = i;
        }
        max_end = max_end.max(hit.end);
    }
    if !sorted.is_empty() {
        boundaries.push((cluster_start, sorted.len()));
    }

    boundaries.into_iter().map(move |(a, b)| &sorted[a..b])
}

/// Greedy left-to-right selection. `longest` picks the largest end among
/// hits sharing the cursor's start; otherwise the smallest pattern index
/// wins. Input is sorted by (start, end, pattern_index).
fn select_leftmost(cluster: &[Hit], out: &mut Vec<Hit>, longest: bool) {
    let mut cursor = 0;
    let mut i = 0;

    while i < cluster.len() {
        let hit = &cluster[i];
        if hit.start < cursor {
            i += 1;
            continue;
        }

        // All hits sharing this start.
        let group_end = cluster[i..]
            .iter()
            .position(|h| h.start != hit.start)
            .map(|off| i + off)
            .unwrap_or(cluster.len());

        let chosen = if longest {
            // Largest end; equal ends fall back to the earliest pattern.
            cluster[i..group_end]
                .iter()
                .max_by_key(|h| (h.end, std::cmp::Reverse(h.pattern_index)))
                .unwrap()
        } else {
            cluster[i..group_end]
                .iter()
                .min_by_key(|h| h.pattern_index)
                .unwrap()
        };

        cursor = chosen.end;
        out.push(chosen.clone());
        i = group_end;
    }
}

/// Highest salience first; ties broken by longer span, then smaller
/// pattern index. A pick removes only the hits overlapping it, so
/// non-overlapping remainder hits stay eligible.
fn select_salience_max(cluster: &[Hit], out: &mut Vec<Hit>) {
    let mut remaining: Vec<&Hit> = cluster.iter().collect();

    while !remaining.is_empty() {
        let best = remaining
            .iter()
            .copied()
            .max_by(|a, b| {
                a.payload
                    .salience
                    .partial_cmp(&b.payload.salience)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.len().cmp(&b.len()))
                    .then_with(|| b.pattern_index.cmp(&a.pattern_index))
                    .then_with(|| b.start.cmp(&a.start))
            })
            .unwrap()
            .clone();

        remaining.retain(|h| !h.overlaps(&best));
        out.push(best);
    }
}
