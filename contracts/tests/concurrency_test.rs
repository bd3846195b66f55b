//! Multi-threaded isolation tests.
//!
//! Many traders hammer the same pools, the same RTV ledger and the same sale
//! allocation from scoped threads. Nothing may deadlock, no value may be
//! created or lost, and the sale must never pay out past its allocation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use retriever_contracts::creator_market::{CreatorMarket, MarketError};
use retriever_contracts::devnet::Devnet;
use retriever_contracts::private_sale::SaleError;
use retriever_contracts::token::Token;
use retriever_protocol::{Address, Amount};

const THREADS: usize = 8;
const ROUNDS: usize = 200;

fn total_balances(token: &Token) -> Amount {
    token
        .balances()
        .values()
        .try_fold(Amount::ZERO, |acc, v| acc.checked_add(*v))
        .unwrap()
}

// ---------------------------------------------------------------------------
// Creator market
// ---------------------------------------------------------------------------

#[test]
fn concurrent_trades_and_crossing_swaps_stay_consistent() {
    let deployer = Address::derive("conc:deployer");
    let rtv = Arc::new(Token::retriever(
        Address::derive("conc:rtv"),
        deployer,
        Amount::from_whole(1_000_000_000),
    ));
    let market = CreatorMarket::new(Address::derive("conc:market"), deployer, rtv.clone());

    let mut tokens = Vec::new();
    for label in ["conc:a", "conc:b", "conc:c"] {
        let creator = Address::derive(label);
        let seed = Amount::from_whole(10_000);
        rtv.mint(&deployer, &creator, seed).unwrap();
        rtv.approve(&creator, &market.address(), seed);
        let token = market.add_creator(&deployer, &creator, label, "C", seed).unwrap();
        tokens.push((creator, token));
    }

    let traders: Vec<Address> = (0..THREADS)
        .map(|i| Address::derive(&format!("conc:trader{i}")))
        .collect();
    for trader in &traders {
        rtv.mint(&deployer, trader, Amount::from_whole(1_000)).unwrap();
        rtv.approve(trader, &market.address(), Amount::MAX);
    }
    let supply = rtv.total_supply();
    let successes = AtomicUsize::new(0);

    thread::scope(|scope| {
        for (i, trader) in traders.iter().enumerate() {
            let market = &market;
            let tokens = &tokens;
            let successes = &successes;
            scope.spawn(move || {
                for round in 0..ROUNDS {
                    let (creator, token) = tokens[(i + round) % tokens.len()];
                    // Even and odd threads swap in opposite directions.
                    let (_, other) = if i % 2 == 0 {
                        tokens[(i + round + 1) % tokens.len()]
                    } else {
                        tokens[(i + round + tokens.len() - 1) % tokens.len()]
                    };
                    let one = Amount::from_whole(1);
                    let result = match round % 3 {
                        0 => market.buy(trader, &creator, one).map(|_| ()),
                        1 => market.swap(trader, &token, one, &other).map(|_| ()),
                        _ => market.redeem(trader, &creator, one).map(|_| ()),
                    };
                    match result {
                        Ok(()) => {
                            successes.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(MarketError::InsufficientCreatorTokenBalance { .. }) => {}
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
            });
        }
    });

    assert!(successes.load(Ordering::Relaxed) > 0);
    let report = market.audit().unwrap();
    assert_eq!(report.base_balance, report.total_reserve);
    assert_eq!(rtv.total_supply(), supply);
    assert_eq!(total_balances(&rtv), supply);
}

#[test]
fn concurrent_onboarding_admits_each_creator_once() {
    let deployer = Address::derive("conc:deployer");
    let rtv = Arc::new(Token::retriever(
        Address::derive("conc:rtv2"),
        deployer,
        Amount::from_whole(1_000_000),
    ));
    let market = CreatorMarket::new(Address::derive("conc:market2"), deployer, rtv.clone());
    let creator = Address::derive("conc:contested");
    rtv.mint(&deployer, &creator, Amount::from_whole(100)).unwrap();
    rtv.approve(&creator, &market.address(), Amount::from_whole(100));

    let admitted = AtomicUsize::new(0);
    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                match market.add_creator(&creator, &creator, "c", "C", Amount::from_whole(10)) {
                    Ok(_) => {
                        admitted.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(MarketError::CreatorAlreadyExists(_)) => {}
                    Err(other) => panic!("unexpected error: {other}"),
                }
            });
        }
    });

    assert_eq!(admitted.load(Ordering::Relaxed), 1);
    assert_eq!(rtv.balance_of(&creator), Amount::from_whole(90));
    assert_eq!(market.audit().unwrap().total_reserve, Amount::from_whole(10));
}

// ---------------------------------------------------------------------------
// Private sale
// ---------------------------------------------------------------------------

#[test]
fn concurrent_buyers_never_overdraw_the_allocation() {
    // Cap of 100,000 leaves 10,000 RTV for sale; demand is 8 × 2 WETH = 19,200 RTV.
    let devnet = Devnet::deploy(Address::derive("conc:deployer"), Amount::from_whole(100_000)).unwrap();
    devnet.fund_sale().unwrap();
    let weth = devnet.collateral("WETH").unwrap().clone();

    let buyers: Vec<Address> = (0..THREADS)
        .map(|i| Address::derive(&format!("conc:buyer{i}")))
        .collect();
    for buyer in &buyers {
        devnet.sale.whitelist(&devnet.deployer, buyer).unwrap();
        weth.mint(&devnet.deployer, buyer, Amount::from_whole(2)).unwrap();
        weth.approve(buyer, &devnet.sale.address(), Amount::from_whole(2));
    }
    devnet.sale.start_sale(&devnet.deployer).unwrap();

    let filled = AtomicUsize::new(0);
    thread::scope(|scope| {
        for buyer in &buyers {
            let devnet = &devnet;
            let filled = &filled;
            scope.spawn(move || {
                for _ in 0..2 {
                    match devnet.sale.buy(buyer, "WETH", Amount::from_whole(1)) {
                        Ok(_) => {
                            filled.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(SaleError::InsufficientAllocation { .. }) => {}
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
            });
        }
    });

    // 10,000 / 1,200 = 8 fills, 400 RTV left over.
    assert_eq!(filled.load(Ordering::Relaxed), 8);
    assert_eq!(devnet.sale.remaining_allocation(), Amount::from_whole(400));
    assert_eq!(devnet.sale.collateral_balance("WETH").unwrap(), Amount::from_whole(8));
    assert_eq!(total_balances(&devnet.rtv), devnet.rtv.total_supply());
}
