//! Random sim content
//!
//! Produces the raw text a flight sim would report for the built-in
//! variables: ten upper-case letters for the message, and non-negative
//! numbers formatted with thousands separators.

use gxsync_core::{GxError, GxResult, FIRST_LONG, FIRST_MESSAGE, FIRST_NUMBER};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Letters in a generated string
const ALPHABET_LEN: u32 = 26;

/// Seeded generator of sim values
pub struct ContentGenerator {
    rng: StdRng,
    /// Next variable to update
    cursor: usize,
}

impl ContentGenerator {
    /// Create a new generator with seed
    pub fn new(seed: u64) -> Self {
        ContentGenerator {
            rng: StdRng::seed_from_u64(seed),
            cursor: 0,
        }
    }

    /// Number in `[min, max)`
    pub fn random_int(&mut self, min: i32, max: i32) -> GxResult<i32> {
        if min >= max {
            return Err(GxError::InvalidArgument(format!(
                "empty range {}..{}",
                min, max
            )));
        }
        Ok(self.rng.gen_range(min..max))
    }

    /// Number in `[min, max)`
    pub fn random_long(&mut self, min: i64, max: i64) -> GxResult<i64> {
        if min >= max {
            return Err(GxError::InvalidArgument(format!(
                "empty range {}..{}",
                min, max
            )));
        }
        Ok(self.rng.gen_range(min..max))
    }

    /// `size` characters drawn from the 26 starting at `offset`
    pub fn random_string(&mut self, size: usize, offset: char) -> GxResult<String> {
        let first = offset as u32;
        let alphabet: Vec<char> = (first..first + ALPHABET_LEN)
            .map(char::from_u32)
            .collect::<Option<_>>()
            .ok_or_else(|| {
                GxError::InvalidArgument(format!("no 26 characters follow {:?}", offset))
            })?;

        Ok((0..size)
            .map(|_| alphabet[self.rng.gen_range(0..alphabet.len())])
            .collect())
    }

    pub fn next_message(&mut self) -> GxResult<String> {
        self.random_string(10, 'A')
    }

    pub fn next_number(&mut self) -> GxResult<String> {
        let value = self.random_int(0, i32::MAX)?;
        Ok(group_thousands(value as u64))
    }

    pub fn next_long(&mut self) -> GxResult<String> {
        let value = self.random_long(0, i64::MAX)?;
        Ok(group_thousands(value as u64))
    }

    /// Next `(name, raw value)` pair, cycling through the built-in variables
    pub fn next_update(&mut self) -> GxResult<(&'static str, String)> {
        let name = [FIRST_MESSAGE, FIRST_NUMBER, FIRST_LONG][self.cursor % 3];
        self.cursor += 1;

        let raw = match name {
            FIRST_MESSAGE => self.next_message()?,
            FIRST_NUMBER => self.next_number()?,
            _ => self.next_long()?,
        };
        Ok((name, raw))
    }
}

/// `1234567` as `1,234,567`
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
