//! Fletcher checksums with 16, 32 and 64 bit results
//!
//! Input is consumed in words of `bits / 16` bytes, most significant byte
//! first. A trailing short word keeps the value of the bytes it has; it is
//! not padded. Both accumulators run modulo `2^(8 * word bytes) - 1` and the
//! result is `sum1 + sum2 * 2^(8 * word bytes)`.

use crate::{GxError, GxResult};

/// Checksum width
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FletcherWidth {
    Fletcher16 = 16,
    Fletcher32 = 32,
    Fletcher64 = 64,
}

impl FletcherWidth {
    /// Parse from a bit count
    pub fn from_bits(bits: u32) -> GxResult<Self> {
        match bits {
            16 => Ok(FletcherWidth::Fletcher16),
            32 => Ok(FletcherWidth::Fletcher32),
            64 => Ok(FletcherWidth::Fletcher64),
            other => Err(GxError::UnsupportedChecksumWidth(other)),
        }
    }

    #[inline]
    pub fn bits(self) -> u32 {
        self as u32
    }

    /// Bytes folded into each word
    #[inline]
    pub fn word_bytes(self) -> usize {
        (self.bits() / 16) as usize
    }

    /// Accumulator modulus, `2^(8 * word bytes) - 1`
    #[inline]
    pub fn modulus(self) -> u64 {
        (1u64 << (8 * self.word_bytes())) - 1
    }
}

/// Fletcher checksum of `input`
pub fn checksum_of(input: &[u8], width: FletcherWidth) -> u64 {
    let modulus = width.modulus();

    let (sum1, sum2) = input
        .chunks(width.word_bytes())
        .map(|word| word.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
        .fold((0u64, 0u64), |(sum1, sum2), word| {
            let sum1 = (sum1 + word) % modulus;
            (sum1, (sum2 + sum1) % modulus)
        });

    // modulus + 1 is at most 2^32, so this cannot overflow
    sum1 + sum2 * (modulus + 1)
}

/// Fletcher checksum with the width given as a bit count
pub fn checksum_with_bits(input: &[u8], bits: u32) -> GxResult<u64> {
    Ok(checksum_of(input, FletcherWidth::from_bits(bits)?))
}
