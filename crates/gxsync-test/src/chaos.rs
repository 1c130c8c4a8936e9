//! Lossy block channel
//!
//! Simulates a link that damages blocks in transit:
//! - Single byte corruption, every Nth block
//! - Random corruption at a fixed rate
//! - Duplication

use std::collections::VecDeque;

use gxsync_wire::BLOCK_SIZE;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Channel configuration
#[derive(Clone, Debug)]
pub struct ChaosConfig {
    /// Corrupt every Nth block sent, 0 disables
    pub corrupt_every: u64,
    /// Probability of corrupting any other block (0.0 - 1.0)
    pub corrupt_rate: f64,
    /// Duplicate probability
    pub duplicate_prob: f64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        ChaosConfig {
            corrupt_every: 0,
            corrupt_rate: 0.0,
            duplicate_prob: 0.0,
        }
    }
}

impl ChaosConfig {
    /// Clean link
    pub fn clean() -> Self {
        ChaosConfig::default()
    }

    /// Damages every Nth block
    pub fn every(n: u64) -> Self {
        ChaosConfig {
            corrupt_every: n,
            ..ChaosConfig::default()
        }
    }

    /// Noisy link
    pub fn noisy() -> Self {
        ChaosConfig {
            corrupt_every: 0,
            corrupt_rate: 0.2,
            duplicate_prob: 0.05,
        }
    }
}

/// Flips one byte of a block
#[derive(Debug)]
pub struct Corruptor {
    rng: StdRng,
}

impl Corruptor {
    pub fn new(seed: u64) -> Self {
        Corruptor {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// XOR a random non-zero mask into a random byte, returning its index
    pub fn corrupt(&mut self, block: &mut [u8]) -> Option<usize> {
        if block.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..block.len());
        let mask: u8 = self.rng.gen_range(1..=u8::MAX);
        block[index] ^= mask;
        Some(index)
    }
}

/// Channel statistics
#[derive(Clone, Debug, Default)]
pub struct ChaosStats {
    pub blocks_sent: u64,
    pub blocks_delivered: u64,
    pub blocks_corrupted: u64,
    pub blocks_duplicated: u64,
}

impl ChaosStats {
    pub fn corruption_rate(&self) -> f64 {
        if self.blocks_sent == 0 {
            0.0
        } else {
            self.blocks_corrupted as f64 / self.blocks_sent as f64
        }
    }
}

/// One-way block channel with induced damage
pub struct ChaosChannel {
    config: ChaosConfig,
    rng: StdRng,
    corruptor: Corruptor,
    in_flight: VecDeque<[u8; BLOCK_SIZE]>,
    stats: ChaosStats,
}

impl ChaosChannel {
    /// Create a new channel with seed
    pub fn new(config: ChaosConfig, seed: u64) -> Self {
        ChaosChannel {
            config,
            rng: StdRng::seed_from_u64(seed),
            corruptor: Corruptor::new(seed.wrapping_add(1)),
            in_flight: VecDeque::new(),
            stats: ChaosStats::default(),
        }
    }

    /// Send a block into the channel
    pub fn send(&mut self, mut block: [u8; BLOCK_SIZE]) {
        self.stats.blocks_sent += 1;

        if self.should_corrupt() {
            self.corruptor.corrupt(&mut block);
            self.stats.blocks_corrupted += 1;
        }

        self.in_flight.push_back(block);

        if self.rng.gen::<f64>() < self.config.duplicate_prob {
            self.in_flight.push_back(block);
            self.stats.blocks_duplicated += 1;
        }
    }

    fn should_corrupt(&mut self) -> bool {
        let every = self.config.corrupt_every;
        if every > 0 && self.stats.blocks_sent % every == 0 {
            return true;
        }
        self.rng.gen::<f64>() < self.config.corrupt_rate
    }

    /// Take every block in flight
    pub fn deliver(&mut self) -> Vec<[u8; BLOCK_SIZE]> {
        let delivered: Vec<_> = self.in_flight.drain(..).collect();
        self.stats.blocks_delivered += delivered.len() as u64;
        delivered
    }

    pub fn stats(&self) -> &ChaosStats {
        &self.stats
    }

    pub fn config(&self) -> &ChaosConfig {
        &self.config
    }
}
