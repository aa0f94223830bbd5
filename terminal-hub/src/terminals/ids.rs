//! ID 生成
//!
//! Every random value the hub hands out comes from here: pairing codes,
//! terminal API keys, payment ids and record ids.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

pub const API_KEY_PREFIX: &str = "tkey_";
pub const PAYMENT_ID_PREFIX: &str = "tpay_";

/// API key entropy: 32 bytes → 64 hex chars
const API_KEY_BYTES: usize = 32;
/// Payment id entropy: 16 bytes → 32 hex chars
const PAYMENT_ID_BYTES: usize = 16;
/// Low bits of a record id reserved for the per-millisecond sequence
const SEQUENCE_BITS: u32 = 12;

struct Inner {
    rng: StdRng,
    last_id: i64,
}

/// Source of randomness for ids and secrets
pub struct IdGenerator {
    inner: Mutex<Inner>,
}

impl IdGenerator {
    /// OS-seeded generator
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic generator (tests)
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            inner: Mutex::new(Inner { rng, last_id: 0 }),
        }
    }

    /// Uniform 6-digit code, zero padded (000000..=999999)
    pub fn pairing_code(&self) -> String {
        let n: u32 = self.inner.lock().rng.gen_range(0..1_000_000);
        format!("{n:06}")
    }

    /// `tkey_` + 64 lowercase hex
    pub fn api_key(&self) -> String {
        format!("{API_KEY_PREFIX}{}", self.hex(API_KEY_BYTES))
    }

    /// `tpay_` + 32 lowercase hex
    pub fn payment_id(&self) -> String {
        format!("{PAYMENT_ID_PREFIX}{}", self.hex(PAYMENT_ID_BYTES))
    }

    /// Time-ordered positive record id, strictly increasing per generator
    pub fn record_id(&self) -> i64 {
        let candidate = shared::util::now_millis() << SEQUENCE_BITS;
        let mut inner = self.inner.lock();
        let id = candidate.max(inner.last_id + 1);
        inner.last_id = id;
        id
    }

    fn hex(&self, len: usize) -> String {
        let mut buf = vec![0u8; len];
        self.inner.lock().rng.fill_bytes(&mut buf);
        hex::encode(buf)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdGenerator").finish_non_exhaustive()
    }
}

/// `tkey_` followed by exactly 64 lowercase hex chars
pub fn is_api_key(value: &str) -> bool {
    value
        .strip_prefix(API_KEY_PREFIX)
        .is_some_and(|rest| is_lower_hex(rest, API_KEY_BYTES * 2))
}

/// `tpay_` followed by exactly 32 lowercase hex chars
pub fn is_payment_id(value: &str) -> bool {
    value
        .strip_prefix(PAYMENT_ID_PREFIX)
        .is_some_and(|rest| is_lower_hex(rest, PAYMENT_ID_BYTES * 2))
}

fn is_lower_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
