//! Sim/client exchange simulator
//!
//! Two peers, each with its own store and codec, joined by a chaos channel.
//! The sim publishes values, sends them as blocks and drives its variables
//! through the send/acknowledge cycle according to what the client received.

use std::sync::Arc;

use gxsync_core::{DataStatus, GxError, GxResult, Registry, Side, Trigger};
use gxsync_state::{
    DataStore, NumberFormat, Slot, StoreConfig, StoreOutcome, ValueIngest, VariableStore,
};
use gxsync_wire::BlockCodec;
use tracing::{debug, warn};

use crate::chaos::{ChaosChannel, ChaosConfig};

/// Exchange configuration
#[derive(Clone, Debug)]
pub struct ExchangeConfig {
    /// Damage applied by the channel
    pub chaos: ChaosConfig,
    /// Seed for the channel
    pub seed: u64,
    pub number_format: NumberFormat,
    /// Store limits on the client side
    pub client_store: StoreConfig,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        ExchangeConfig {
            chaos: ChaosConfig::clean(),
            seed: 0,
            number_format: NumberFormat::default(),
            client_store: StoreConfig::default(),
        }
    }
}

/// One side of the exchange
pub struct Peer {
    side: Side,
    store: DataStore,
    codec: BlockCodec,
    ingest: ValueIngest,
}

impl Peer {
    pub fn new(
        side: Side,
        registry: Arc<Registry>,
        format: NumberFormat,
        store_config: StoreConfig,
    ) -> Self {
        Peer {
            side,
            store: DataStore::with_config(Arc::clone(&registry), store_config),
            codec: BlockCodec::new(Arc::clone(&registry)),
            ingest: ValueIngest::new(registry, format),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn codec(&self) -> &BlockCodec {
        &self.codec
    }

    /// Publish a raw value from this side
    pub fn publish(&self, name: &str, raw: &str) -> GxResult<StoreOutcome> {
        self.ingest.publish(&self.store, self.side, name, raw)
    }
}

/// Result of sending one block
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Client stored the block; count of variables it applied
    Delivered(usize),
    /// Client discarded a damaged block
    Corrupted,
}

/// Exchange statistics
#[derive(Clone, Debug, Default)]
pub struct ExchangeStats {
    pub blocks_sent: u64,
    pub blocks_accepted: u64,
    pub blocks_rejected: u64,
    pub updates_acknowledged: u64,
    pub updates_failed: u64,
}

/// Sim to client exchange over a chaos channel
pub struct Exchange {
    registry: Arc<Registry>,
    sim: Peer,
    client: Peer,
    channel: ChaosChannel,
    stats: ExchangeStats,
}

impl Exchange {
    pub fn new(registry: Arc<Registry>, config: ExchangeConfig) -> Self {
        Exchange {
            sim: Peer::new(
                Side::Sim,
                Arc::clone(&registry),
                config.number_format.clone(),
                StoreConfig::default(),
            ),
            client: Peer::new(
                Side::Client,
                Arc::clone(&registry),
                config.number_format,
                config.client_store,
            ),
            channel: ChaosChannel::new(config.chaos, config.seed),
            registry,
            stats: ExchangeStats::default(),
        }
    }

    /// Exchange over the built-in registry
    pub fn builtin(config: ExchangeConfig) -> Self {
        Self::new(Arc::new(Registry::builtin()), config)
    }

    pub fn sim(&self) -> &Peer {
        &self.sim
    }

    pub fn client(&self) -> &Peer {
        &self.client
    }

    pub fn stats(&self) -> &ExchangeStats {
        &self.stats
    }

    pub fn channel(&self) -> &ChaosChannel {
        &self.channel
    }

    /// Send every block once
    pub fn transmit_all(&mut self) -> GxResult<Vec<Delivery>> {
        (1..=self.registry.number_of_blocks())
            .map(|block_number| self.transmit(block_number))
            .collect()
    }

    /// Send one block from sim to client
    ///
    /// Sim values waiting to go out are marked in flight, then acknowledged
    /// or, when the client discards the block or fails to store it, failed
    /// and re-armed for the next attempt.
    pub fn transmit(&mut self, block_number: u32) -> GxResult<Delivery> {
        let outgoing = self.pending_names(block_number)?;
        let store = self.sim.store();

        for name in &outgoing {
            store.set_trigger(Slot::Stored, name, Trigger::SimSendsUpdate)?;
            store.change_status(Slot::Stored, name, Side::Client.ack_trigger())?;
        }

        let block = self.sim.codec().make_block(block_number, store)?;
        self.channel.send(block);
        self.stats.blocks_sent += 1;

        let mut applied = None;
        let mut failure = None;
        for received in self.channel.deliver() {
            match self.client.codec().apply_block(&received, self.client.store()) {
                Ok(outcomes) => {
                    applied = Some(outcomes.len());
                }
                Err(err @ GxError::ChecksumMismatch { .. }) => {
                    warn!(block_number, %err, "client discarded block");
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        if let Some(err) = failure {
            warn!(block_number, %err, "client failed to apply block");
            self.fail_outgoing(&outgoing)?;
            return Err(err);
        }

        match applied {
            Some(count) => {
                let store = self.sim.store();
                for name in &outgoing {
                    store.change_status(Slot::Stored, name, Trigger::SimSendsUpdate)?;
                }
                self.stats.blocks_accepted += 1;
                self.stats.updates_acknowledged += outgoing.len() as u64;
                debug!(block_number, count, "block acknowledged");
                Ok(Delivery::Delivered(count))
            }
            None => {
                self.fail_outgoing(&outgoing)?;
                Ok(Delivery::Corrupted)
            }
        }
    }

    /// Mark in-flight values failed and arm them for the next send
    fn fail_outgoing(&mut self, outgoing: &[String]) -> GxResult<()> {
        let store = self.sim.store();
        for name in outgoing {
            store.set_trigger(Slot::Stored, name, Trigger::ClientUpdateFailed)?;
            store.change_status(Slot::Stored, name, Trigger::Reset)?;
            store.change_status(Slot::Stored, name, Trigger::SimSendsUpdate)?;
            store.change_status(Slot::Stored, name, Trigger::SimSendsUpdate)?;
        }
        self.stats.blocks_rejected += 1;
        self.stats.updates_failed += outgoing.len() as u64;
        Ok(())
    }

    /// Sim variables of a block waiting to be sent
    fn pending_names(&self, block_number: u32) -> GxResult<Vec<String>> {
        let names = self
            .registry
            .variables_in_block(block_number)
            .ok_or(GxError::BlockNotFound(block_number))?;

        let mut pending = Vec::new();
        for name in names {
            if let Some(variable) = self.sim.store().try_get(name)? {
                if variable.status() == DataStatus::FromSimToClient {
                    pending.push(name.clone());
                }
            }
        }
        Ok(pending)
    }
}
