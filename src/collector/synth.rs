//! Seeded sample dataset generation.

use crate::models::{Category, Dataset, Rating, Record};
use rand::distributions::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Bernoulli, Distribution, Exp, LogNormal, Poisson};
use tracing::debug;

/// Probability that a synthesized site is on green hosting.
pub const GREEN_PROBABILITY: f64 = 0.3;
/// Mean of the exponential emissions distribution, in grams.
pub const MEAN_GCO2E: f64 = 2.5;
/// Mean number of requests per page view.
pub const MEAN_REQUESTS: f64 = 50.0;

/// The six column distributions, built once per call.
struct Sampler {
    green: Bernoulli,
    gco2e: Exp<f64>,
    rating: WeightedIndex<f64>,
    size_mb: LogNormal<f64>,
    requests: Poisson<f64>,
}

impl Sampler {
    fn new() -> Self {
        // All parameters are constants inside their distribution's domain.
        Self {
            green: Bernoulli::new(GREEN_PROBABILITY).expect("valid green probability"),
            gco2e: Exp::new(1.0 / MEAN_GCO2E).expect("valid emission rate"),
            rating: WeightedIndex::new(Rating::ALL.iter().map(|r| r.weight()))
                .expect("valid rating weights"),
            size_mb: LogNormal::new(0.0, 1.0).expect("valid size parameters"),
            requests: Poisson::new(MEAN_REQUESTS).expect("valid request rate"),
        }
    }

    fn record<R: Rng>(&self, index: usize, rng: &mut R) -> Record {
        let green = self.green.sample(rng);
        let gco2e = self.gco2e.sample(rng);
        let rating = Rating::ALL[self.rating.sample(rng)];
        let category = Category::ALL[rng.gen_range(0..Category::ALL.len())];
        let size_mb = self.size_mb.sample(rng);
        let requests: f64 = self.requests.sample(rng);

        Record {
            url: format!("https://example{}.com", index),
            green,
            gco2e,
            rating,
            category,
            size_mb,
            requests: requests as u32,
        }
    }
}

/// Generate `size` records from a seeded generator.
///
/// Records are drawn one row at a time, so the dataset for a smaller size is
/// a prefix of the dataset for a larger size under the same seed.
pub fn synthesize(size: usize, seed: u64) -> Dataset {
    debug!("Synthesizing {} records with seed {}", size, seed);

    let sampler = Sampler::new();
    let mut rng = StdRng::seed_from_u64(seed);

    (0..size).map(|i| sampler.record(i, &mut rng)).collect()
}
