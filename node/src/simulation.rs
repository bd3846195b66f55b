//! # Devnet Simulation
//!
//! Drives a freshly deployed devnet through the full token-economy flow:
//!
//! 1. Fund the private sale and start it.
//! 2. Whitelist every trader and let each buy RTV with one of the three
//!    collateral assets, rotating WETH → USDT → MATIC.
//! 3. Onboard creators, each seeding its own pool with freshly minted RTV.
//! 4. Run `rounds` of randomized buy / redeem / swap traffic, with traders
//!    split across scoped worker threads that share the same contracts.
//! 5. Audit the market and the RTV ledger.
//!
//! Each worker draws from its own `StdRng` seeded from the run seed, so with a
//! single thread a seed fully determines the outcome.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Instant;

use anyhow::{ensure, Context, Result};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use retriever_contracts::creator_market::{AuditReport, CreatorTokenInfo, MarketError};
use retriever_contracts::devnet::Devnet;
use retriever_contracts::private_sale::{Purchase, SaleError};
use retriever_protocol::{Address, Amount};

use crate::cli::SimulateArgs;
use crate::metrics::EngineMetrics;

/// Sale ticket per collateral: symbol and the amount each trader spends.
/// USDT carries 6 decimals, so 500 USDT is 500 * 10^6 units.
const SALE_TICKETS: [(&str, u128); 3] = [
    ("WETH", 1_000_000_000_000_000_000),
    ("USDT", 500_000_000),
    ("MATIC", 1_000_000_000_000_000_000_000),
];

/// Bounds of a creator's seed liquidity, whole RTV.
const CREATOR_SEED_RANGE: std::ops::RangeInclusive<u64> = 1_000..=10_000;

/// Bounds of a single market buy, whole RTV.
const BUY_RANGE: std::ops::RangeInclusive<u64> = 1..=50;

// ---------------------------------------------------------------------------
// Configuration and report
// ---------------------------------------------------------------------------

/// Parameters of one simulation run.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Creators onboarded before trading.
    pub creators: usize,
    /// Whitelisted investors, who later trade.
    pub traders: usize,
    /// Trading rounds; each trader acts once per round.
    pub rounds: usize,
    /// Seed of every RNG in the run.
    pub seed: u64,
    /// Worker threads for the trading phase.
    pub threads: usize,
    /// RTV supply cap.
    pub max_supply: Amount,
}

impl From<&SimulateArgs> for SimulationConfig {
    fn from(args: &SimulateArgs) -> Self {
        Self {
            creators: args.creators,
            traders: args.traders,
            rounds: args.rounds,
            seed: args.seed,
            threads: args.threads,
            max_supply: Amount::from_whole(args.max_supply),
        }
    }
}

/// Outcome counts of the trading phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TradeTally {
    /// Committed buys.
    pub buys: u64,
    /// Committed redeems.
    pub redeems: u64,
    /// Committed swaps.
    pub swaps: u64,
    /// Trades any contract rejected.
    pub rejected: u64,
}

#[derive(Default)]
struct AtomicTally {
    buys: AtomicU64,
    redeems: AtomicU64,
    swaps: AtomicU64,
    rejected: AtomicU64,
}

impl AtomicTally {
    fn snapshot(&self) -> TradeTally {
        TradeTally {
            buys: self.buys.load(Ordering::Relaxed),
            redeems: self.redeems.load(Ordering::Relaxed),
            swaps: self.swaps.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Private-sale section of the report.
#[derive(Debug, Clone, Serialize)]
pub struct SaleSummary {
    /// RTV allocated to the sale.
    pub allocated: Amount,
    /// RTV still held by the sale.
    pub remaining: Amount,
    /// Receipts of every settled purchase.
    pub purchases: Vec<Purchase>,
    /// Collateral held by the sale after the purchase phase, by symbol.
    pub collateral_raised: BTreeMap<String, Amount>,
}

/// Creator-market section of the report.
#[derive(Debug, Clone, Serialize)]
pub struct MarketSummary {
    /// Final state of every creator pool.
    pub creators: Vec<CreatorTokenInfo>,
    /// Outcome counts of the trading phase.
    pub trades: TradeTally,
    /// Audit taken after trading.
    pub audit: AuditReport,
}

/// Everything a run produced, serialized as the command's stdout.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Seed the run used.
    pub seed: u64,
    /// Worker threads of the trading phase.
    pub threads: usize,
    /// Trading rounds run.
    pub rounds: usize,
    /// Address of the RTV ledger.
    pub rtv_address: Address,
    /// RTV supply cap.
    pub rtv_max_supply: Amount,
    /// RTV minted by the end of the run.
    pub rtv_total_supply: Amount,
    /// Whether the RTV holder balances sum to the total supply.
    pub ledger_consistent: bool,
    /// Private-sale outcome.
    pub sale: SaleSummary,
    /// Creator-market outcome.
    pub market: MarketSummary,
    /// Wall-clock start of the run.
    pub started_at: DateTime<Utc>,
    /// Run duration in milliseconds.
    pub elapsed_ms: u128,
}

// ---------------------------------------------------------------------------
// Error labels
// ---------------------------------------------------------------------------

/// Short metric label for a contract error.
trait ErrorKind {
    fn kind(&self) -> &'static str;
}

impl ErrorKind for MarketError {
    fn kind(&self) -> &'static str {
        match self {
            MarketError::Unauthorized { .. } => "unauthorized",
            MarketError::CreatorAlreadyExists(_) => "creator_already_exists",
            MarketError::CreatorNotFound(_) => "creator_not_found",
            MarketError::InsufficientCreatorTokenBalance { .. } => "insufficient_creator_token_balance",
            MarketError::ZeroAmount => "zero_amount",
            MarketError::DustAmount(_) => "dust_amount",
            MarketError::SelfSwap(_) => "self_swap",
            MarketError::InvariantViolated(_) => "invariant_violated",
            MarketError::Token(_) => "token",
            MarketError::Math(_) => "math",
        }
    }
}

impl ErrorKind for SaleError {
    fn kind(&self) -> &'static str {
        match self {
            SaleError::Unauthorized { .. } => "unauthorized",
            SaleError::NotRunning => "not_running",
            SaleError::AlreadyRunning => "already_running",
            SaleError::NotWhitelisted(_) => "not_whitelisted",
            SaleError::InsufficientAllocation { .. } => "insufficient_allocation",
            SaleError::UnsupportedAsset(_) => "unsupported_asset",
            SaleError::InvalidConfig(_) => "invalid_config",
            SaleError::ZeroAmount => "zero_amount",
            SaleError::Oracle(_) => "oracle",
            SaleError::Token(_) => "token",
            SaleError::Math(_) => "math",
        }
    }
}

/// Runs one contract call, recording latency and outcome.
fn observe<T, E>(metrics: &EngineMetrics, operation: &'static str, call: impl FnOnce() -> Result<T, E>) -> Result<T, E>
where
    E: ErrorKind + std::fmt::Display,
{
    let started = Instant::now();
    let result = call();
    let seconds = started.elapsed().as_secs_f64();
    match &result {
        Ok(_) => metrics.record_success(operation, seconds),
        Err(err) => {
            metrics.record_failure(operation, err.kind(), seconds);
            tracing::debug!(operation, error = %err, "operation rejected");
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Deploys a devnet and runs every phase against it.
///
/// # Errors
///
/// Fails if the configuration is degenerate, if setup calls that must
/// succeed (deployment, funding, onboarding) are rejected, or if the final
/// audit finds a pool that is not fully backed. Rejected trades are counted,
/// not returned.
pub fn run(config: &SimulationConfig, metrics: &EngineMetrics) -> Result<SimulationReport> {
    ensure!(config.creators > 0, "at least one creator is required");
    ensure!(config.threads > 0, "at least one worker thread is required");

    let started_at = Utc::now();
    let clock = Instant::now();
    let mut rng = StdRng::seed_from_u64(config.seed);

    let deployer = Address::derive("sim:deployer");
    let devnet = Devnet::deploy(deployer, config.max_supply).context("deploying devnet")?;
    devnet.fund_sale().context("funding the private sale")?;

    let traders: Vec<Address> = (0..config.traders)
        .map(|i| Address::derive(&format!("sim:trader:{i}")))
        .collect();

    let purchases = run_sale(&devnet, &traders, metrics)?;
    let creators = onboard_creators(&devnet, config.creators, &mut rng, metrics)?;
    for trader in &traders {
        devnet.rtv.approve(trader, &devnet.market.address(), Amount::MAX);
    }

    let tally = AtomicTally::default();
    let per_worker = traders.len().div_ceil(config.threads).max(1);
    tracing::info!(
        traders = traders.len(),
        creators = creators.len(),
        rounds = config.rounds,
        workers = traders.chunks(per_worker).len(),
        "trading started"
    );
    thread::scope(|scope| {
        for (worker, group) in traders.chunks(per_worker).enumerate() {
            let devnet = &devnet;
            let creators = &creators;
            let tally = &tally;
            let metrics = metrics.clone();
            let seed = config.seed.wrapping_add(worker as u64 + 1);
            let rounds = config.rounds;
            scope.spawn(move || {
                let mut rng = StdRng::seed_from_u64(seed);
                for _ in 0..rounds {
                    for trader in group {
                        trade_once(devnet, creators, trader, &mut rng, tally, &metrics);
                    }
                }
            });
        }
    });
    let trades = tally.snapshot();
    tracing::info!(
        buys = trades.buys,
        redeems = trades.redeems,
        swaps = trades.swaps,
        rejected = trades.rejected,
        "trading finished"
    );

    let audit = devnet.market.audit().context("auditing the creator market")?;
    let ledger_sum = devnet
        .rtv
        .balances()
        .values()
        .try_fold(Amount::ZERO, |acc, v| acc.checked_add(*v))
        .context("summing RTV balances")?;
    let rtv_total_supply = devnet.rtv.total_supply();
    let ledger_consistent = ledger_sum == rtv_total_supply;
    if !ledger_consistent {
        tracing::warn!(%ledger_sum, %rtv_total_supply, "RTV ledger does not sum to supply");
    }

    let mut collateral_raised = BTreeMap::new();
    for symbol in devnet.sale.accepted_assets() {
        let held = devnet.sale.collateral_balance(&symbol)?;
        collateral_raised.insert(symbol, held);
    }
    let remaining = devnet.sale.remaining_allocation();
    metrics.creators.set(creators.len() as i64);
    metrics.sale_remaining_allocation.set(whole_tokens(remaining));

    let creator_infos = creators
        .iter()
        .map(|(creator, _)| devnet.market.creator_token_info(creator))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SimulationReport {
        seed: config.seed,
        threads: config.threads,
        rounds: config.rounds,
        rtv_address: devnet.rtv.address(),
        rtv_max_supply: config.max_supply,
        rtv_total_supply,
        ledger_consistent,
        sale: SaleSummary {
            allocated: devnet.sale.tokens_allocated_for_sale(),
            remaining,
            purchases,
            collateral_raised,
        },
        market: MarketSummary {
            creators: creator_infos,
            trades,
            audit,
        },
        started_at,
        elapsed_ms: clock.elapsed().as_millis(),
    })
}

/// Whitelists every trader and has each buy one collateral ticket.
///
/// Purchases that the sale rejects (for instance once the allocation runs
/// out on a small cap) are logged and skipped.
fn run_sale(devnet: &Devnet, traders: &[Address], metrics: &EngineMetrics) -> Result<Vec<Purchase>> {
    for trader in traders {
        devnet.sale.whitelist(&devnet.deployer, trader)?;
    }
    devnet.sale.start_sale(&devnet.deployer)?;

    let mut purchases = Vec::with_capacity(traders.len());
    for (i, trader) in traders.iter().enumerate() {
        let (symbol, units) = SALE_TICKETS[i % SALE_TICKETS.len()];
        let amount = Amount::from_units(units);
        let token = devnet
            .collateral(symbol)
            .with_context(|| format!("devnet has no {symbol} collateral"))?;
        token.mint(&devnet.deployer, trader, amount)?;
        token.approve(trader, &devnet.sale.address(), amount);

        match observe(metrics, "sale_purchase", || devnet.sale.buy(trader, symbol, amount)) {
            Ok(purchase) => purchases.push(purchase),
            Err(err) => tracing::warn!(trader = %trader.short(), symbol, error = %err, "sale purchase rejected"),
        }
    }
    tracing::info!(
        filled = purchases.len(),
        remaining = %devnet.sale.remaining_allocation(),
        "private sale phase complete"
    );
    Ok(purchases)
}

/// Funds and self-onboards `count` creators. Returns (creator, token) pairs.
fn onboard_creators(
    devnet: &Devnet,
    count: usize,
    rng: &mut StdRng,
    metrics: &EngineMetrics,
) -> Result<Vec<(Address, Address)>> {
    let mut creators = Vec::with_capacity(count);
    for i in 0..count {
        let creator = Address::derive(&format!("sim:creator:{i}"));
        let seed = Amount::from_whole(rng.gen_range(CREATOR_SEED_RANGE));
        devnet
            .rtv
            .mint(&devnet.deployer, &creator, seed)
            .with_context(|| format!("minting seed liquidity for creator {i}"))?;
        devnet.rtv.approve(&creator, &devnet.market.address(), seed);
        let token = observe(metrics, "add_creator", || {
            devnet
                .market
                .add_creator(&creator, &creator, &format!("Creator {i}"), &format!("CR{i}"), seed)
        })
        .with_context(|| format!("onboarding creator {i}"))?;
        creators.push((creator, token));
    }
    Ok(creators)
}

/// One randomized market action for `trader`.
fn trade_once(
    devnet: &Devnet,
    creators: &[(Address, Address)],
    trader: &Address,
    rng: &mut StdRng,
    tally: &AtomicTally,
    metrics: &EngineMetrics,
) {
    let market = &devnet.market;
    let (creator, token) = creators[rng.gen_range(0..creators.len())];
    let percent = Amount::from_units(rng.gen_range(1..=100u128));
    let hundred = Amount::from_units(100);

    let outcome = match rng.gen_range(0..3u8) {
        0 => {
            let wanted = Amount::from_whole(rng.gen_range(BUY_RANGE));
            let amount = wanted.min(devnet.rtv.balance_of(trader));
            observe(metrics, "buy", || market.buy(trader, &creator, amount)).map(|_| &tally.buys)
        }
        1 => {
            let held = market.user_balance(&creator, trader).unwrap_or(Amount::ZERO);
            let amount = held.mul_div(percent, hundred).unwrap_or(Amount::ZERO);
            observe(metrics, "redeem", || market.redeem(trader, &creator, amount)).map(|_| &tally.redeems)
        }
        _ => {
            let (_, target) = creators[rng.gen_range(0..creators.len())];
            let held = market.user_balance(&creator, trader).unwrap_or(Amount::ZERO);
            let amount = held.mul_div(percent, hundred).unwrap_or(Amount::ZERO);
            observe(metrics, "swap", || market.swap(trader, &token, amount, &target)).map(|_| &tally.swaps)
        }
    };
    match outcome {
        Ok(counter) => counter.fetch_add(1, Ordering::Relaxed),
        Err(_) => tally.rejected.fetch_add(1, Ordering::Relaxed),
    };
}

/// Whole-token part of an 18-decimal amount, saturating at `i64::MAX`.
fn whole_tokens(amount: Amount) -> i64 {
    amount
        .as_u128()
        .map(|units| units / retriever_protocol::math::SCALE)
        .and_then(|whole| i64::try_from(whole).ok())
        .unwrap_or(i64::MAX)
}
