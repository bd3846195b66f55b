// Creator-market benchmarks for Retriever.
//
// Covers a buy/redeem round trip on one pool and a swap between two pools,
// each against a freshly seeded market.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use retriever_contracts::creator_market::CreatorMarket;
use retriever_contracts::token::Token;
use retriever_protocol::{Address, Amount};

const SEED_WHOLE: u64 = 1_000_000;

fn seeded_market(creators: &[&str]) -> (Address, Arc<Token>, CreatorMarket, Vec<(Address, Address)>) {
    let deployer = Address::derive("bench:deployer");
    let rtv = Arc::new(Token::retriever(
        Address::derive("bench:rtv"),
        deployer,
        Amount::from_whole(1_000_000_000),
    ));
    let market = CreatorMarket::new(Address::derive("bench:market"), deployer, rtv.clone());
    let mut onboarded = Vec::new();
    for label in creators {
        let creator = Address::derive(label);
        let seed = Amount::from_whole(SEED_WHOLE);
        rtv.mint(&deployer, &creator, seed).unwrap();
        rtv.approve(&creator, &market.address(), seed);
        let token = market.add_creator(&deployer, &creator, label, label, seed).unwrap();
        onboarded.push((creator, token));
    }
    (deployer, rtv, market, onboarded)
}

fn bench_buy_redeem(c: &mut Criterion) {
    let (deployer, rtv, market, creators) = seeded_market(&["bench:creator"]);
    let (creator, _) = creators[0];
    let trader = Address::derive("bench:trader");
    rtv.mint(&deployer, &trader, Amount::from_whole(1_000)).unwrap();
    rtv.approve(&trader, &market.address(), Amount::MAX);

    c.bench_function("market/buy_then_redeem", |b| {
        b.iter(|| {
            let bought = market.buy(&trader, &creator, Amount::from_whole(1)).unwrap();
            market.redeem(&trader, &creator, bought.token_amount).unwrap();
        });
    });
}

fn bench_swap(c: &mut Criterion) {
    let (_, _, market, creators) = seeded_market(&["bench:a", "bench:b"]);
    let (a, token_a) = creators[0];
    let (_, token_b) = creators[1];

    c.bench_function("market/swap_pair", |b| {
        b.iter(|| {
            let there = market.swap(&a, &token_a, Amount::from_whole(1), &token_b).unwrap();
            market.swap(&a, &token_b, there.amount_out, &token_a).unwrap();
        });
    });
}

criterion_group!(benches, bench_buy_redeem, bench_swap);
criterion_main!(benches);
