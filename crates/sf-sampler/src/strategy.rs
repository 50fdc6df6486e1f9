//! Candidate input vectors.
//!
//! A `CandidateStream` is a deterministic sequence for a given seed, ranges and
//! planned sample count. The generator pulls from it in batches; batch sizes
//! never change which vector comes next.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sf_sim::VariableRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    /// Independent uniform draw per dimension.
    #[default]
    Uniform,
    /// Stratified blocks of `sample_count` points; a new block is shuffled
    /// once the previous one is used up.
    LatinHypercube,
    /// Evenly spaced lattice in lexicographic order, then uniform draws.
    Grid,
}

impl std::fmt::Display for SamplingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SamplingStrategy::Uniform => "uniform",
            SamplingStrategy::LatinHypercube => "latin_hypercube",
            SamplingStrategy::Grid => "grid",
        };
        f.write_str(name)
    }
}

/// Largest lattice enumerated before falling back to uniform draws.
const MAX_GRID_POINTS: usize = 1 << 24;

pub struct CandidateStream {
    strategy: SamplingStrategy,
    bounds: Vec<(f64, f64)>,
    rng: StdRng,
    block_size: usize,
    /// Shuffled strata per dimension for the current hypercube block.
    strata: Vec<Vec<usize>>,
    block_pos: usize,
    points_per_dim: usize,
    grid_total: usize,
    grid_pos: usize,
}

impl CandidateStream {
    /// `planned` is the target sample count; it sizes hypercube blocks and the
    /// grid resolution.
    pub fn new(
        strategy: SamplingStrategy,
        ranges: &[VariableRange],
        planned: usize,
        seed: u64,
    ) -> Self {
        let bounds: Vec<(f64, f64)> = ranges.iter().map(|r| (r.min, r.max)).collect();
        let planned = planned.max(1);
        let (points_per_dim, grid_total) = grid_shape(bounds.len(), planned);
        Self {
            strategy,
            bounds,
            rng: StdRng::seed_from_u64(seed),
            block_size: planned,
            strata: Vec::new(),
            block_pos: planned,
            points_per_dim,
            grid_total,
            grid_pos: 0,
        }
    }

    pub fn dimension(&self) -> usize {
        self.bounds.len()
    }

    /// Draw the next `n` candidates.
    pub fn next_batch(&mut self, n: usize) -> Vec<Vec<f64>> {
        (0..n).map(|_| self.next_candidate()).collect()
    }

    pub fn next_candidate(&mut self) -> Vec<f64> {
        match self.strategy {
            SamplingStrategy::Uniform => self.uniform(),
            SamplingStrategy::LatinHypercube => self.hypercube(),
            SamplingStrategy::Grid if self.grid_pos < self.grid_total => self.grid(),
            SamplingStrategy::Grid => self.uniform(),
        }
    }

    fn uniform(&mut self) -> Vec<f64> {
        let rng = &mut self.rng;
        self.bounds
            .iter()
            .map(|&(lo, hi)| rng.gen_range(lo..=hi))
            .collect()
    }

    fn hypercube(&mut self) -> Vec<f64> {
        if self.block_pos >= self.block_size {
            let n = self.block_size;
            let rng = &mut self.rng;
            self.strata = (0..self.bounds.len())
                .map(|_| {
                    let mut perm: Vec<usize> = (0..n).collect();
                    perm.shuffle(rng);
                    perm
                })
                .collect();
            self.block_pos = 0;
        }

        let n = self.block_size as f64;
        let pos = self.block_pos;
        self.block_pos += 1;

        let rng = &mut self.rng;
        self.bounds
            .iter()
            .zip(&self.strata)
            .map(|(&(lo, hi), perm)| {
                let offset: f64 = rng.gen_range(0.0..1.0);
                let unit = (perm[pos] as f64 + offset) / n;
                (lo + unit * (hi - lo)).clamp(lo, hi)
            })
            .collect()
    }

    fn grid(&mut self) -> Vec<f64> {
        let k = self.points_per_dim;
        let mut index = self.grid_pos;
        self.grid_pos += 1;

        // Last dimension varies fastest.
        let mut point = vec![0.0; self.bounds.len()];
        for (dim, &(lo, hi)) in self.bounds.iter().enumerate().rev() {
            let step = index % k;
            index /= k;
            point[dim] = lo + (hi - lo) * step as f64 / (k - 1) as f64;
        }
        point
    }
}

/// Points per dimension and total lattice size for `planned` samples: the
/// coarsest lattice with at least `planned` points, capped at
/// `MAX_GRID_POINTS`.
fn grid_shape(dims: usize, planned: usize) -> (usize, usize) {
    if dims == 0 {
        return (1, 1);
    }
    let mut k = 2;
    let mut total = match checked_pow(k, dims) {
        Some(total) if total <= MAX_GRID_POINTS => total,
        // Even a 2-point lattice is too large; go straight to uniform.
        _ => return (k, 0),
    };
    while total < planned {
        match checked_pow(k + 1, dims) {
            Some(next) if next <= MAX_GRID_POINTS => {
                k += 1;
                total = next;
            }
            _ => break,
        }
    }
    (k, total)
}

fn checked_pow(base: usize, exp: usize) -> Option<usize> {
    let exp = u32::try_from(exp).ok()?;
    base.checked_pow(exp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(name: &str, min: f64, max: f64) -> VariableRange {
        VariableRange {
            name: name.to_string(),
            min,
            max,
            observed_min: min,
            observed_max: max,
        }
    }

    #[test]
    fn uniform_stays_in_bounds() {
        let ranges = [range("a", -1.0, 1.0), range("b", 10.0, 20.0)];
        let mut stream = CandidateStream::new(SamplingStrategy::Uniform, &ranges, 50, 3);
        for c in stream.next_batch(200) {
            assert!((-1.0..=1.0).contains(&c[0]));
            assert!((10.0..=20.0).contains(&c[1]));
        }
    }

    #[test]
    fn batching_does_not_change_sequence() {
        let ranges = [range("a", 0.0, 1.0), range("b", 0.0, 1.0)];
        for strategy in [
            SamplingStrategy::Uniform,
            SamplingStrategy::LatinHypercube,
            SamplingStrategy::Grid,
        ] {
            let mut whole = CandidateStream::new(strategy, &ranges, 10, 42);
            let mut pieces = CandidateStream::new(strategy, &ranges, 10, 42);
            let a = whole.next_batch(30);
            let mut b = pieces.next_batch(7);
            b.extend(pieces.next_batch(1));
            b.extend(pieces.next_batch(22));
            assert_eq!(a, b, "{strategy}");
        }
    }

    #[test]
    fn hypercube_hits_every_stratum_once() {
        let ranges = [range("a", 0.0, 10.0), range("b", -5.0, 5.0)];
        let mut stream = CandidateStream::new(SamplingStrategy::LatinHypercube, &ranges, 10, 9);
        let block = stream.next_batch(10);
        for (dim, r) in ranges.iter().enumerate() {
            let mut seen = [false; 10];
            for c in &block {
                let stratum = (((c[dim] - r.min) / r.span()) * 10.0).floor() as usize;
                seen[stratum.min(9)] = true;
            }
            assert!(seen.iter().all(|&s| s), "dimension {dim}");
        }
    }

    #[test]
    fn grid_is_lexicographic_then_uniform() {
        let ranges = [range("a", 0.0, 1.0), range("b", 0.0, 2.0)];
        let mut stream = CandidateStream::new(SamplingStrategy::Grid, &ranges, 4, 1);
        let lattice = stream.next_batch(4);
        assert_eq!(
            lattice,
            vec![
                vec![0.0, 0.0],
                vec![0.0, 2.0],
                vec![1.0, 0.0],
                vec![1.0, 2.0]
            ]
        );
        let extra = stream.next_candidate();
        assert!((0.0..=1.0).contains(&extra[0]));
        assert!((0.0..=2.0).contains(&extra[1]));
    }

    #[test]
    fn grid_shape_caps_size() {
        assert_eq!(grid_shape(0, 10), (1, 1));
        assert_eq!(grid_shape(1, 10), (10, 10));
        assert_eq!(grid_shape(2, 10), (4, 16));
        let (_, total) = grid_shape(64, 100);
        assert_eq!(total, 0);
    }

    #[test]
    fn zero_dimensional_candidates_are_empty() {
        let mut stream = CandidateStream::new(SamplingStrategy::Grid, &[], 3, 0);
        assert_eq!(stream.next_batch(3), vec![Vec::<f64>::new(); 3]);
    }
}
