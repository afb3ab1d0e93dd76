use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::{SystemTime, UNIX_EPOCH};
use types::SeedMode;

/// Concrete seed for a run. `TimeBased` reads the wall clock.
pub fn resolve_seed(mode: SeedMode) -> u64 {
    match mode {
        SeedMode::Fixed(seed) => seed,
        SeedMode::TimeBased => {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or_default();
            mix(nanos as u64 ^ (nanos >> 64) as u64)
        }
    }
}

pub fn rng_from_seed(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Seed of an independent stream derived from `base`, used to give parallel
/// workers their own generators while keeping runs reproducible.
pub fn stream_seed(base: u64, stream: u64) -> u64 {
    mix(base ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

// splitmix64 finaliser
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
