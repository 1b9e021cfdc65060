use rand::Rng;

/// Trait for generating short ids.
///
/// Implementations are pure generators that don't interact with storage.
/// Generated ids are dense enough that collisions are rare, but the
/// store's uniqueness constraint on `short` is the source of truth; the
/// insert path retries on a collision rather than trusting the generator.
pub trait Generator: Send + Sync + 'static {
    /// Produces a fresh URL-safe short id.
    fn generate(&self) -> String;
}

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default id length, matching the public short-URL shape `base/[A-Za-z0-9]{8}`.
pub const DEFAULT_ID_LEN: usize = 8;

/// Random alphanumeric id generator over the 62-character alphabet.
///
/// No cryptographic strength is required or implied.
#[derive(Debug, Clone)]
pub struct AlphaGenerator {
    len: usize,
}

impl AlphaGenerator {
    /// Creates a generator producing ids of the default length.
    pub fn new() -> Self {
        Self::with_len(DEFAULT_ID_LEN)
    }

    /// Creates a generator producing ids of `len` characters.
    pub fn with_len(len: usize) -> Self {
        Self { len }
    }
}

impl Default for AlphaGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for AlphaGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.len)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    }
}
