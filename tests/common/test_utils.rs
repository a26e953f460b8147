use rand::{Rng, SeedableRng, rngs::StdRng};
use std::{fs, path::PathBuf};

/// Temporary file removed when the guard goes out of scope
#[allow(dead_code)]
pub struct TestFile {
    path: PathBuf,
}

impl TestFile {
    /// Create a path in the temp dir based on the test name
    #[allow(dead_code)]
    pub fn new(test_name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "test_pbf_{}_{}.bin",
            test_name,
            std::process::id()
        ));
        Self { path }
    }

    #[allow(dead_code)]
    pub fn path(&self) -> PathBuf {
        self.path.clone()
    }
}

impl Drop for TestFile {
    fn drop(&mut self) {
        if self.path.exists() {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Deterministic, distinct keys: `prefix_000000`, `prefix_000001`, ...
#[allow(dead_code)]
pub fn generate_test_items(prefix: &str, count: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|i| format!("{prefix}_{i:06}").into_bytes())
        .collect()
}

/// Random keys of random length, reproducible through `seed`
#[allow(dead_code)]
pub fn random_keys(seed: u64, count: usize, max_len: usize) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let len = rng.random_range(0..=max_len);
            (0..len).map(|_| rng.random()).collect()
        })
        .collect()
}
