//! Serial number allocation.
//!
//! Certificate serials are 20 random bytes (160 bits, the common upper
//! bound CAs use) with the high bit of the first byte cleared so the value
//! is always DER-positive. TSA serials additionally need strict
//! monotonicity (RFC 3161 does not require it, but auditors expect it), so
//! they are built from a 64-bit atomic counter in the high bits and a
//! random suffix in the low bits.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::RngCore;

use crate::error::{CaError, Result};

const CERTIFICATE_SERIAL_LEN: usize = 20;

/// Allocates certificate serials and, separately, strictly monotonic
/// timestamp token serials.
#[derive(Debug, Default)]
pub struct SerialGenerator {
    tsa_counter: AtomicU64,
}

impl SerialGenerator {
    /// Create a generator with its TSA counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a generator whose TSA counter starts at `start`, for resuming
    /// after a restart against a persisted high-water mark.
    pub fn with_tsa_counter_start(start: u64) -> Self {
        Self {
            tsa_counter: AtomicU64::new(start),
        }
    }

    /// Allocate a fresh 20-byte certificate serial.
    ///
    /// DER integers are signed; a serial whose first byte has the high bit
    /// set would decode as negative, so the high bit is always cleared. If
    /// clearing it makes the leading byte zero, the byte is nudged to `0x01`
    /// so the serial never collapses to a shorter, all-zero-prefixed value.
    pub fn next_certificate_serial(&self) -> Result<Vec<u8>> {
        let mut bytes = [0u8; CERTIFICATE_SERIAL_LEN];
        rand::thread_rng().try_fill_bytes(&mut bytes).map_err(|e| {
            CaError::RandomSourceFailure(format!("failed to fill serial bytes: {e}"))
        })?;
        bytes[0] &= 0x7f;
        if bytes[0] == 0 {
            bytes[0] = 0x01;
        }
        Ok(bytes.to_vec())
    }

    /// Allocate a fresh TSA serial: an 8-byte monotonic counter value
    /// followed by 8 random bytes, so concurrent callers never collide and
    /// a total order is always recoverable from the leading bytes alone.
    pub fn next_tsa_serial(&self) -> Result<Vec<u8>> {
        let counter = self.tsa_counter.fetch_add(1, Ordering::SeqCst);
        let mut bytes = Vec::with_capacity(16);
        bytes.push(0x01); // leading sign-safe byte, high bit never set
        bytes.extend_from_slice(&counter.to_be_bytes());
        let mut suffix = [0u8; 7];
        rand::thread_rng().try_fill_bytes(&mut suffix).map_err(|e| {
            CaError::RandomSourceFailure(format!("failed to fill serial suffix: {e}"))
        })?;
        bytes.extend_from_slice(&suffix);
        Ok(bytes)
    }
}

/// Render a serial as lowercase hex, the form the Store indexes certificates by.
pub fn serial_to_hex(serial: &[u8]) -> String {
    hex::encode(serial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn certificate_serials_are_der_positive() {
        let generator = SerialGenerator::new();
        for _ in 0..200 {
            let serial = generator.next_certificate_serial().unwrap();
            assert_eq!(serial.len(), CERTIFICATE_SERIAL_LEN);
            assert_eq!(serial[0] & 0x80, 0, "high bit must be clear");
            assert_ne!(serial[0], 0, "leading byte must not be zero");
        }
    }

    #[test]
    fn certificate_serials_do_not_collide_across_many_draws() {
        let generator = SerialGenerator::new();
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let serial = generator.next_certificate_serial().unwrap();
            assert!(seen.insert(serial), "serial collision");
        }
    }

    #[test]
    fn tsa_serials_are_strictly_increasing() {
        let generator = SerialGenerator::new();
        let mut previous = generator.next_tsa_serial().unwrap();
        for _ in 0..100 {
            let next = generator.next_tsa_serial().unwrap();
            assert!(next > previous, "TSA serials must be strictly increasing");
            previous = next;
        }
    }

    #[test]
    fn tsa_counter_resumes_from_a_given_start() {
        let generator = SerialGenerator::with_tsa_counter_start(42);
        let serial = generator.next_tsa_serial().unwrap();
        let counter_bytes: [u8; 8] = serial[1..9].try_into().unwrap();
        assert_eq!(u64::from_be_bytes(counter_bytes), 42);
    }
}
