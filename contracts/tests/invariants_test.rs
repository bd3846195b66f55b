//! Property tests for the accounting invariants.
//!
//! Random operation sequences are thrown at the RTV ledger and the creator
//! market; after every step the supply cap, holder sums and reserve
//! coverage must still hold, whether the step succeeded or not.

use std::sync::Arc;

use proptest::prelude::*;
use retriever_contracts::creator_market::CreatorMarket;
use retriever_contracts::token::{Token, TokenError};
use retriever_protocol::{Address, Amount};

const CREATORS: [&str; 3] = ["prop:creatorA", "prop:creatorB", "prop:creatorC"];
const TRADERS: [&str; 3] = ["prop:trader1", "prop:trader2", "prop:trader3"];

#[derive(Debug, Clone)]
enum Op {
    Buy { trader: usize, creator: usize, base: u128 },
    Redeem { trader: usize, creator: usize, tokens: u128 },
    Swap { trader: usize, from: usize, to: usize, tokens: u128 },
}

fn op() -> impl Strategy<Value = Op> {
    let amount = 1u128..5_000_000_000_000_000_000_000;
    prop_oneof![
        (0..3usize, 0..3usize, amount.clone()).prop_map(|(trader, creator, base)| Op::Buy { trader, creator, base }),
        (0..3usize, 0..3usize, amount.clone())
            .prop_map(|(trader, creator, tokens)| Op::Redeem { trader, creator, tokens }),
        (0..3usize, 0..3usize, 0..3usize, amount).prop_map(|(trader, from, to, tokens)| Op::Swap {
            trader,
            from,
            to,
            tokens
        }),
    ]
}

/// Helper: a market with three seeded creators and three funded traders.
fn seeded_market() -> (Arc<Token>, CreatorMarket, Vec<(Address, Address)>) {
    let deployer = Address::derive("prop:deployer");
    let rtv = Arc::new(Token::retriever(
        Address::derive("prop:rtv"),
        deployer,
        Amount::from_whole(1_000_000_000),
    ));
    let market = CreatorMarket::new(Address::derive("prop:market"), deployer, rtv.clone());

    let mut creators = Vec::new();
    for (i, label) in CREATORS.iter().enumerate() {
        let creator = Address::derive(label);
        let seed = Amount::from_whole(1_000 * (i as u64 + 1));
        rtv.mint(&deployer, &creator, seed).unwrap();
        rtv.approve(&creator, &market.address(), seed);
        let token = market.add_creator(&deployer, &creator, label, "PROP", seed).unwrap();
        creators.push((creator, token));
    }
    for label in TRADERS {
        let trader = Address::derive(label);
        rtv.mint(&deployer, &trader, Amount::from_whole(20_000)).unwrap();
        rtv.approve(&trader, &market.address(), Amount::MAX);
    }
    (rtv, market, creators)
}

fn ledger_sum(token: &Token) -> Amount {
    token
        .balances()
        .values()
        .try_fold(Amount::ZERO, |acc, v| acc.checked_add(*v))
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn supply_never_exceeds_cap(mints in proptest::collection::vec(0u64..400, 1..40)) {
        let deployer = Address::derive("prop:deployer");
        let cap = Amount::from_whole(5_000);
        let token = Token::retriever(Address::derive("prop:capped"), deployer, cap);
        let holder = Address::derive("prop:holder");

        for whole in mints {
            let before = token.total_supply();
            match token.mint(&deployer, &holder, Amount::from_whole(whole)) {
                Ok(()) => prop_assert!(token.total_supply() <= cap),
                Err(TokenError::SupplyCapExceeded { .. }) => {
                    prop_assert_eq!(token.total_supply(), before);
                }
                Err(other) => prop_assert!(false, "unexpected error {}", other),
            }
            prop_assert_eq!(ledger_sum(&token), token.total_supply());
        }
    }

    #[test]
    fn market_accounting_survives_any_sequence(ops in proptest::collection::vec(op(), 1..60)) {
        let (rtv, market, creators) = seeded_market();
        let supply = rtv.total_supply();

        for op in ops {
            let _ = match op {
                Op::Buy { trader, creator, base } => market
                    .buy(&Address::derive(TRADERS[trader]), &creators[creator].0, Amount::from_units(base))
                    .map(|_| ()),
                Op::Redeem { trader, creator, tokens } => market
                    .redeem(&Address::derive(TRADERS[trader]), &creators[creator].0, Amount::from_units(tokens))
                    .map(|_| ()),
                Op::Swap { trader, from, to, tokens } => market
                    .swap(
                        &Address::derive(TRADERS[trader]),
                        &creators[from].1,
                        Amount::from_units(tokens),
                        &creators[to].1,
                    )
                    .map(|_| ()),
            };

            let report = market.audit();
            prop_assert!(report.is_ok(), "audit failed: {:?}", report);
            let report = report.unwrap();
            prop_assert_eq!(report.base_balance, report.total_reserve);
            prop_assert_eq!(rtv.total_supply(), supply);
            prop_assert_eq!(ledger_sum(&rtv), supply);
        }
    }

    #[test]
    fn redeeming_a_buy_never_returns_more(
        seed_whole in 1u64..1_000_000,
        prior in 0u128..1_000_000_000_000_000_000_000,
        deposit in 1u128..1_000_000_000_000_000_000_000,
    ) {
        let deployer = Address::derive("prop:deployer");
        let rtv = Arc::new(Token::retriever(
            Address::derive("prop:rtv"),
            deployer,
            Amount::from_whole(1_000_000_000),
        ));
        let market = CreatorMarket::new(Address::derive("prop:market"), deployer, rtv.clone());
        let creator = Address::derive("prop:creator");
        let seed = Amount::from_whole(seed_whole);
        rtv.mint(&deployer, &creator, seed).unwrap();
        rtv.approve(&creator, &market.address(), seed);
        market.add_creator(&creator, &creator, "c", "C", seed).unwrap();

        // Move the pool off its seed ratio first.
        let early = Address::derive("prop:early");
        if prior > 0 {
            rtv.mint(&deployer, &early, Amount::from_units(prior)).unwrap();
            rtv.approve(&early, &market.address(), Amount::from_units(prior));
            if let Ok(bought) = market.buy(&early, &creator, Amount::from_units(prior)) {
                let _ = market.redeem(&early, &creator, Amount::from_units(bought.token_amount.as_u128().unwrap() / 3 + 1));
            }
        }

        let user = Address::derive("prop:user");
        let deposit = Amount::from_units(deposit);
        rtv.mint(&deployer, &user, deposit).unwrap();
        rtv.approve(&user, &market.address(), deposit);
        if let Ok(bought) = market.buy(&user, &creator, deposit) {
            match market.redeem(&user, &creator, bought.token_amount) {
                Ok(redeemed) => prop_assert!(redeemed.base_amount <= deposit),
                Err(err) => prop_assert!(
                    matches!(err, retriever_contracts::creator_market::MarketError::DustAmount(_)),
                    "unexpected error {}", err
                ),
            }
        }
        prop_assert!(rtv.balance_of(&user) <= deposit);
    }
}
