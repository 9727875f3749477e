use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Beta, Distribution};

/// Per-strategy RNG. Seeded explicitly in tests for determinism, seeded
/// from OS entropy in production.
pub fn new_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

pub fn random_pick(rng: &mut StdRng, ports: &[u16]) -> u16 {
    ports[rng.random_range(0..ports.len())]
}

/// Samples `Beta(alpha, beta)`. `alpha`/`beta` are always >= 1.0 in this
/// crate's usage (they start at the uniform prior and only grow), so the
/// distribution is always well-formed.
pub fn sample_beta(rng: &mut StdRng, alpha: f64, beta: f64) -> f64 {
    Beta::new(alpha, beta)
        .expect("alpha and beta are always positive")
        .sample(rng)
}
