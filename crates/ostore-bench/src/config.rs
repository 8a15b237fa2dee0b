//! Configuration types for the benchmark driver.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Object sizes tested by default: 4 KB to 8 MB.
pub const DEFAULT_SIZES: [usize; 8] = [
    4 * 1024,
    16 * 1024,
    64 * 1024,
    256 * 1024,
    1024 * 1024,
    2 * 1024 * 1024,
    4 * 1024 * 1024,
    8 * 1024 * 1024,
];

pub const DEFAULT_ITERATIONS: usize = 100;

/// Seed of the default random payload.
pub const DEFAULT_SEED: u64 = 42;

/// Block region of the benchmark store (4 GiB, sparse).
pub const BENCH_BLOCK_SIZE: u64 = 4 * 1024 * 1024 * 1024;

/// Invalid benchmark settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid payload pattern '{0}' (expected fill[:<char>] or random[:<seed>])")]
    InvalidPayload(String),

    #[error("invalid object size '{0}' (expected bytes, optionally with a K or M suffix)")]
    InvalidSize(String),

    #[error("no object sizes given")]
    NoSizes,
}

/// Payload written to every object of a size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PayloadPattern {
    /// Every byte set to the same value.
    Fill(u8),
    /// Bytes from a `ChaCha8Rng` seeded with `seed`.
    Random { seed: u64 },
}

impl Default for PayloadPattern {
    fn default() -> Self {
        Self::Random { seed: DEFAULT_SEED }
    }
}

impl PayloadPattern {
    /// Build a payload of `size` bytes. Deterministic for a given pattern.
    pub fn generate(&self, size: usize) -> Vec<u8> {
        match *self {
            Self::Fill(byte) => vec![byte; size],
            Self::Random { seed } => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let mut payload = vec![0u8; size];
                rng.fill_bytes(&mut payload);
                payload
            }
        }
    }
}

impl std::fmt::Display for PayloadPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Fill(byte) if byte.is_ascii_graphic() => write!(f, "fill:{}", byte as char),
            Self::Fill(byte) => write!(f, "fill:0x{byte:02x}"),
            Self::Random { seed } => write!(f, "random:{seed}"),
        }
    }
}

impl FromStr for PayloadPattern {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidPayload(s.to_string());
        let (kind, arg) = match s.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg)),
            None => (s, None),
        };

        match (kind.to_ascii_lowercase().as_str(), arg) {
            ("fill", None) => Ok(Self::Fill(b'x')),
            ("fill", Some(arg)) => {
                if let Some(hex) = arg.strip_prefix("0x") {
                    u8::from_str_radix(hex, 16).map(Self::Fill).map_err(|_| invalid())
                } else if arg.len() == 1 && arg.is_ascii() {
                    Ok(Self::Fill(arg.as_bytes()[0]))
                } else {
                    Err(invalid())
                }
            }
            ("random", None) => Ok(Self::default()),
            ("random", Some(seed)) => seed
                .parse()
                .map(|seed| Self::Random { seed })
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for PayloadPattern {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PayloadPattern> for String {
    fn from(pattern: PayloadPattern) -> Self {
        pattern.to_string()
    }
}

/// Parse one size: plain bytes or a `K`/`KB`/`M`/`MB` suffix (powers of 1024).
pub fn parse_size(s: &str) -> Result<usize, ConfigError> {
    let invalid = || ConfigError::InvalidSize(s.to_string());
    let trimmed = s.trim();
    let upper = trimmed.to_ascii_uppercase();

    let (digits, multiplier) = if let Some(n) = upper.strip_suffix("MB").or_else(|| upper.strip_suffix('M')) {
        (n, 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("KB").or_else(|| upper.strip_suffix('K')) {
        (n, 1024)
    } else {
        (upper.as_str(), 1)
    };

    let value: usize = digits.trim().parse().map_err(|_| invalid())?;
    match value.checked_mul(multiplier) {
        Some(0) | None => Err(invalid()),
        Some(size) => Ok(size),
    }
}

/// Parse a comma-separated size list such as `4096,16K,1M`.
pub fn parse_sizes(list: &str) -> Result<Vec<usize>, ConfigError> {
    let sizes = list
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(parse_size)
        .collect::<Result<Vec<_>, _>>()?;

    if sizes.is_empty() {
        return Err(ConfigError::NoSizes);
    }
    Ok(sizes)
}

/// Benchmark configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenchmarkConfig {
    /// Object sizes in bytes, tested in order.
    pub sizes: Vec<usize>,
    /// Iterations per size.
    pub iterations: usize,
    pub payload: PayloadPattern,
    /// Compare read content with the written payload.
    pub verify: bool,
    /// Show a live progress bar on stderr.
    pub progress: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            sizes: DEFAULT_SIZES.to_vec(),
            iterations: DEFAULT_ITERATIONS,
            payload: PayloadPattern::default(),
            verify: false,
            progress: true,
        }
    }
}

impl BenchmarkConfig {
    /// Total number of write+read iterations across all sizes.
    pub fn total_iterations(&self) -> usize {
        self.sizes.len() * self.iterations
    }
}
