use log::info;

/// Depth calculates minimum, maximum, average and percentile of leaf-node
/// depths in the [`OrderedTree`](crate::OrderedTree). Root sits at depth 1.
#[derive(Clone, Debug, Default)]
pub struct Depth {
    samples: usize,
    min: usize,
    max: usize,
    total: usize,
    depths: Vec<u64>, // histogram, indexed by depth
}

impl Depth {
    pub(crate) fn new() -> Depth {
        Default::default()
    }

    pub(crate) fn sample(&mut self, depth: usize) {
        self.samples += 1;
        self.total += depth;
        if self.min == 0 || depth < self.min {
            self.min = depth
        }
        if depth > self.max {
            self.max = depth
        }
        if self.depths.len() <= depth {
            self.depths.resize(depth + 1, 0);
        }
        self.depths[depth] += 1;
    }

    /// Return number of leaf-nodes sampled.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Return minimum depth of a leaf-node.
    pub fn min(&self) -> usize {
        self.min
    }

    /// Return maximum depth of a leaf-node, same as tree height.
    pub fn max(&self) -> usize {
        self.max
    }

    /// Return the average depth of leaf-nodes.
    pub fn mean(&self) -> usize {
        if self.samples == 0 {
            0
        } else {
            self.total / self.samples
        }
    }

    /// Return depth as tuple of percentiles, each tuple provides
    /// (percentile, depth). Returned percentiles from 50 and above.
    pub fn percentiles(&self) -> Vec<(u8, usize)> {
        let mut percentiles: Vec<(u8, usize)> = vec![];
        let (mut acc, mut prev_perc) = (0_u64, 50_u8);
        let iter = self.depths.iter().enumerate().filter(|(_, &n)| n > 0);
        for (depth, samples) in iter {
            acc += *samples;
            let perc = ((acc as f64 / self.samples as f64) * 100_f64) as u8;
            if perc >= prev_perc {
                percentiles.push((perc, depth));
                prev_perc = perc;
            }
        }
        percentiles
    }

    /// Log depth statistics in human readable format.
    pub fn log(&self, prefix: &str) {
        info!(
            "{}depth (min, avg, max): {:?}",
            prefix,
            (self.min, self.mean(), self.max)
        );
        for (perc, depth) in self.percentiles().into_iter() {
            info!("{}  {} percentile = {}", prefix, perc, depth);
        }
    }
}

#[cfg(test)]
mod test {
    use super::Depth;

    #[test]
    fn test_depth_sample() {
        let mut depth = Depth::new();
        assert_eq!(depth.mean(), 0);
        assert!(depth.percentiles().is_empty());

        for d in [3, 3, 4, 4, 4, 5].iter() {
            depth.sample(*d);
        }
        assert_eq!(depth.samples(), 6);
        assert_eq!(depth.min(), 3);
        assert_eq!(depth.max(), 5);
        assert_eq!(depth.mean(), 3);
        assert_eq!(depth.percentiles(), vec![(83, 4), (100, 5)]);
        depth.log("test ");
    }
}
