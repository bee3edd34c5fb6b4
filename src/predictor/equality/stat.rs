
use itertools::Itertools;

/// Container for [EqualityPredictor](super::EqualityPredictor) runtime stats.
#[derive(Clone, Debug)]
pub struct EqualityStats {
    /// Successful allocations
    pub alcs: usize,

    /// Failed allocations (every candidate slot was high-confidence)
    pub failed_alcs: usize,

    /// Allocation-driven decays applied to blocking entries
    pub alloc_decays: usize,

    /// Tag hits per component
    pub comp_hits: Vec<usize>,

    /// Tag misses per component
    pub comp_miss: Vec<usize>,

    /// Number of value commits
    pub commits: usize,

    /// Number of squashes
    pub squashes: usize,

    /// Number of speculative branches unwound across all squashes
    pub squashed_branches: usize,
}

impl EqualityStats {
    pub fn new(num_comp: usize) -> Self {
        Self {
            alcs: 0,
            failed_alcs: 0,
            alloc_decays: 0,
            comp_hits: vec![0; num_comp],
            comp_miss: vec![0; num_comp],
            commits: 0,
            squashes: 0,
            squashed_branches: 0,
        }
    }

    /// One-line summary for evaluation harnesses.
    pub fn summary(&self) -> String {
        let hits = self.comp_hits.iter().zip(self.comp_miss.iter())
            .enumerate()
            .map(|(i, (h, m))| format!("c{}: {}/{}", i, h, h + m))
            .join(", ");
        format!(
            "commits: {}, alcs: {} (+{} failed, {} decays), \
             squashes: {} ({} branches), hits: [{}]",
            self.commits, self.alcs, self.failed_alcs, self.alloc_decays,
            self.squashes, self.squashed_branches, hits,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn summary_covers_every_component() {
        let mut stat = EqualityStats::new(2);
        stat.commits = 10;
        stat.comp_hits[0] = 10;
        stat.comp_hits[1] = 4;
        stat.comp_miss[1] = 6;
        assert!(stat.summary().contains("c0: 10/10"));
        assert!(stat.summary().contains("c1: 4/10"));
    }
}
