//! Shared helpers for the integration tests.

use chrono::DateTime;

use accrue_core::coins::DecCoins;
use accrue_core::commission::ReallocatedCommissionRule;
use accrue_core::dec::Dec;
use accrue_core::error::DistributionError;
use accrue_core::kv::{KvStore, MemoryKv};
use accrue_core::params::{DistributionConfig, Params};
use accrue_core::testing::{MockStaking, RecordingLedger};
use accrue_core::traits::BlockInfo;
use accrue_core::types::Address;
use accrue_distribution::{Ctx, DelegationRewards, atomically, query_delegation_rewards};

pub use accrue_core::testing::addr;

/// Genesis time of every harness: 2023-11-14T00:00:00Z, a bucket boundary.
pub const GENESIS_SECS: i64 = 1_699_920_000;

pub const DAY: i64 = 86_400;

/// Install a tracing subscriber honouring `RUST_LOG`, falling back to
/// `level`. Safe to call from every test.
pub fn init_logging(level: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // A second init in the same process fails; the first subscriber stays.
    if format == "json" {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_test_writer())
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_test_writer())
            .try_init();
    }
}

/// [`init_logging`] with the level from the environment configuration.
pub fn init_logging_from_env() {
    let level = DistributionConfig::from_env()
        .map(|cfg| cfg.log_level)
        .unwrap_or_else(|_| "info".to_string());
    init_logging(&level, "text");
}

pub fn coins(denom: &str, amount: i64) -> DecCoins {
    DecCoins::single(denom, Dec::from_i64(amount))
}

/// Engine state plus in-memory collaborators, advanced block by block.
///
/// Each [`step`](Self::step) is one all-or-nothing accounting step: on
/// error both the store and the recorded transfers are rolled back.
pub struct Harness<S: KvStore = MemoryKv> {
    pub kv: S,
    pub staking: MockStaking,
    pub ledger: RecordingLedger,
    pub params: Params,
    pub clock: BlockInfo,
}

impl Harness<MemoryKv> {
    pub fn new(params: Params) -> Self {
        Self::with_store(MemoryKv::new(), params)
    }
}

impl<S: KvStore> Harness<S> {
    pub fn with_store(kv: S, params: Params) -> Self {
        let genesis = DateTime::from_timestamp(GENESIS_SECS, 0).unwrap_or_default();
        Self {
            kv,
            staking: MockStaking::new(),
            ledger: RecordingLedger::new(),
            params,
            clock: BlockInfo::new(1, genesis),
        }
    }

    /// Run one accounting step.
    pub fn step<T>(
        &mut self,
        f: impl FnOnce(&mut Ctx<'_>) -> Result<T, DistributionError>,
    ) -> Result<T, DistributionError> {
        let snapshot = self.ledger.clone();
        let staking = &self.staking;
        let ledger = &mut self.ledger;
        let clock = &self.clock;
        let params = &self.params;
        let result = atomically(&mut self.kv, |kv| {
            let mut ctx = Ctx::new(kv, staking, ledger, clock, params);
            f(&mut ctx)
        });
        if result.is_err() {
            self.ledger = snapshot;
        }
        result
    }

    /// Move to the next block, `secs` seconds later.
    pub fn next_block(&mut self, secs: i64) {
        let time = self.clock.time + chrono::Duration::seconds(secs);
        self.clock = BlockInfo::new(self.clock.height + 1, time);
    }

    pub fn create_validator(&mut self, val: Address, rule: ReallocatedCommissionRule) -> Result<(), DistributionError> {
        self.staking.add_validator(val, rule);
        self.step(|ctx| ctx.initialize_validator(&val))
    }

    /// Bond `tokens` from `del` to `val`, settling the validator's period
    /// first the way a delegation hook would.
    pub fn bond(
        &mut self,
        del: Address,
        val: Address,
        tokens: u64,
        referrer: Option<Address>,
    ) -> Result<(), DistributionError> {
        self.staking.delegate(del, val, tokens, referrer);
        self.step(|ctx| {
            ctx.increment_period(&val)?;
            ctx.initialize_delegation(&val, &del)
        })
    }

    /// Record a slash and then burn the tokens, in that order.
    pub fn slash(&mut self, val: Address, fraction: Dec) -> Result<(), DistributionError> {
        self.step(|ctx| ctx.record_slash(&val, fraction))?;
        self.staking.slash_tokens(&val, fraction);
        Ok(())
    }

    pub fn query(&mut self, val: &Address, del: &Address) -> Result<DelegationRewards, DistributionError> {
        query_delegation_rewards(&mut self.kv, &self.staking, &self.clock, &self.params, val, del)
    }

    /// Outstanding pool plus community pool, in `denom`.
    pub fn held(&mut self, val: &Address, denom: &str) -> Result<Dec, DistributionError> {
        self.step(|ctx| {
            let outstanding = ctx.outstanding_rewards(val)?.amount_of(denom);
            let community = ctx.community_pool()?.amount_of(denom);
            Ok(outstanding.checked_add(community)?)
        })
    }
}
