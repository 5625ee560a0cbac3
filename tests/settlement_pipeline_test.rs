use coinleague_settlement::config::Config;
use coinleague_settlement::domain::{Address, Decimal, GameId, WinnerRecord};
use coinleague_settlement::engine::{ClaimEligibility, LifecyclePhase};
use coinleague_settlement::error::{FeedFailure, SettlementError};
use coinleague_settlement::ledger::{
    MockLedger, MockPriceOracle, RawCoinFeed, RawGame, RawPlayer, RawWinner,
};
use coinleague_settlement::SettlementService;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

const GAME: GameId = GameId(1);

fn test_config() -> Config {
    Config {
        port: 0,
        ledger_rpc_url: "http://example.invalid".to_string(),
        oracle_rpc_url: "http://example.invalid".to_string(),
        price_fetch_concurrency: 4,
        ledger_retry_max_elapsed_ms: 10_000,
    }
}

fn hex(n: u8) -> String {
    format!("0x{:040x}", n)
}

fn addr(n: u8) -> Address {
    Address::from_str(&hex(n)).unwrap()
}

fn feed(i: u8) -> Address {
    addr(i)
}

fn player_addr(i: u8) -> Address {
    addr(0xa0 + i)
}

fn d(v: i64) -> Decimal {
    Decimal::from_i64(v)
}

fn raw_game(game_type: &str, started: bool, finished: bool) -> RawGame {
    RawGame {
        game_type: game_type.to_string(),
        duration: "3600".to_string(),
        start_timestamp: "1000".to_string(),
        abort_timestamp: "900".to_string(),
        amount_to_play: "1000000000000000000".to_string(),
        coin_to_play: hex(0),
        num_coins: "3".to_string(),
        num_players: "3".to_string(),
        total_amount_collected: "3000000000000000000".to_string(),
        started,
        finished,
        aborted: false,
        scores_done: false,
    }
}

fn raw_player(i: u8, captain: u8) -> RawPlayer {
    RawPlayer {
        player_address: hex(0xa0 + i),
        captain_coin: hex(captain),
        affiliate: hex(0),
        score: "0".to_string(),
    }
}

fn raw_feed(i: u8) -> RawCoinFeed {
    RawCoinFeed {
        feed: hex(i),
        start_price: "100".to_string(),
        end_price: "0".to_string(),
        score: "0".to_string(),
    }
}

/// Three players over four feeds, all starting at 100.
///
/// P1: captain F1, coins F2 F3. P2: captain F4, coins F1 F2. P3: captain F2, coins F3 F4.
fn three_player_ledger(game_type: &str) -> MockLedger {
    MockLedger::new()
        .with_game(GAME, raw_game(game_type, true, true))
        .with_player(GAME, raw_player(1, 1), vec![hex(2), hex(3)])
        .with_player(GAME, raw_player(2, 4), vec![hex(1), hex(2)])
        .with_player(GAME, raw_player(3, 2), vec![hex(3), hex(4)])
        .with_coin_feed(GAME, raw_feed(1))
        .with_coin_feed(GAME, raw_feed(2))
        .with_coin_feed(GAME, raw_feed(3))
        .with_coin_feed(GAME, raw_feed(4))
}

/// F1 +10%, F2 -10%, F3 flat, F4 +20%.
fn oracle() -> MockPriceOracle {
    MockPriceOracle::new()
        .with_price(feed(1), d(110))
        .with_price(feed(2), d(90))
        .with_price(feed(3), d(100))
        .with_price(feed(4), d(120))
}

fn service(ledger: &MockLedger, oracle: &MockPriceOracle) -> SettlementService {
    SettlementService::new(Arc::new(ledger.clone()), Arc::new(oracle.clone()), test_config())
}

fn ranked_addresses(settlement: &coinleague_settlement::Settlement) -> Vec<Address> {
    settlement
        .ranked_players
        .iter()
        .map(|r| r.player.address.clone())
        .collect()
}

#[tokio::test]
async fn test_high_game_ranks_and_scores() {
    let ledger = three_player_ledger("1");
    let oracle = oracle();
    let settlement = assert_ok!(
        service(&ledger, &oracle)
            .aggregate_settlement(GAME, &CancellationToken::new())
            .await
    );

    assert_eq!(settlement.phase, LifecyclePhase::Ended);
    assert!(!settlement.provisional);
    assert!(settlement.unscored_players.is_empty());
    assert_eq!(
        ranked_addresses(&settlement),
        vec![player_addr(2), player_addr(3), player_addr(1)]
    );

    let scores: Vec<Decimal> = settlement
        .ranked_players
        .iter()
        .map(|r| r.computed_score)
        .collect();
    // P2: 16666 * 1.2 = 19999, coins 9090 - 11111
    // P3: captain fell, no bonus: -11111 + 0 + 16666
    // P1: 9090 * 1.2 = 10908, coins -11111 + 0
    assert_eq!(scores, vec![d(17978), d(5555), d(-203)]);
    assert_eq!(settlement.ranked_players[0].captain_score, d(19999));
    assert_eq!(settlement.ranked_players[0].coins_score, d(-2021));
    assert_eq!(settlement.ranked_players[0].place, 0);
}

#[tokio::test]
async fn test_low_game_ranks_ascending_with_bonus_on_drops() {
    let ledger = three_player_ledger("2");
    let oracle = oracle();
    let settlement = assert_ok!(
        service(&ledger, &oracle)
            .aggregate_settlement(GAME, &CancellationToken::new())
            .await
    );

    assert_eq!(
        ranked_addresses(&settlement),
        vec![player_addr(1), player_addr(3), player_addr(2)]
    );
    let scores: Vec<Decimal> = settlement
        .ranked_players
        .iter()
        .map(|r| r.computed_score)
        .collect();
    assert_eq!(scores, vec![d(-2021), d(3333), d(14645)]);
}

#[tokio::test]
async fn test_each_distinct_feed_priced_once() {
    let ledger = three_player_ledger("1");
    let oracle = oracle();
    assert_ok!(
        service(&ledger, &oracle)
            .aggregate_settlement(GAME, &CancellationToken::new())
            .await
    );

    // F1 and F2 are each held by three players.
    for i in 1..=4 {
        assert_eq!(oracle.calls_for(&feed(i)), 1, "feed {}", i);
    }
    assert_eq!(oracle.total_calls(), 4);
}

#[tokio::test]
async fn test_round_trips_independent_of_player_count() {
    let small = three_player_ledger("1");
    let oracle = oracle();
    assert_ok!(
        service(&small, &oracle)
            .aggregate_settlement(GAME, &CancellationToken::new())
            .await
    );

    let mut large = MockLedger::new().with_game(GAME, raw_game("1", true, true));
    for i in 0..12u8 {
        let captain = i % 4 + 1;
        let coins = vec![hex((i + 1) % 4 + 1), hex((i + 2) % 4 + 1)];
        large = large.with_player(GAME, raw_player(i + 1, captain), coins);
    }
    for i in 1..=4 {
        large = large.with_coin_feed(GAME, raw_feed(i));
    }
    let settlement = assert_ok!(
        service(&large, &oracle)
            .aggregate_settlement(GAME, &CancellationToken::new())
            .await
    );

    assert_eq!(settlement.ranked_players.len(), 12);
    assert_eq!(small.round_trips(), large.round_trips());
    assert_eq!(large.round_trips(), 4);
}

#[tokio::test]
async fn test_zero_price_leaves_holders_unscored() {
    let ledger = three_player_ledger("1");
    let oracle = oracle().with_price(feed(3), d(0));
    let settlement = assert_ok!(
        service(&ledger, &oracle)
            .aggregate_settlement(GAME, &CancellationToken::new())
            .await
    );

    // F3 is held by P1 and P3.
    assert_eq!(ranked_addresses(&settlement), vec![player_addr(2)]);
    assert_eq!(settlement.unscored_players.len(), 2);
    for unscored in &settlement.unscored_players {
        assert_eq!(unscored.issues.len(), 1);
        assert_eq!(unscored.issues[0].feed, feed(3));
        assert_eq!(unscored.issues[0].failure, FeedFailure::DivisionByZero);
    }

    let f3 = &settlement.coin_feeds[&feed(3)];
    assert_eq!(f3.end_price, Some(d(0)));
    assert_eq!(f3.score, None);
    assert_eq!(settlement.coin_feeds[&feed(4)].score, Some(d(16666)));
}

#[tokio::test]
async fn test_oracle_outage_on_one_feed_is_partial() {
    let ledger = three_player_ledger("1");
    let oracle = oracle().with_failure(feed(4));
    let settlement = assert_ok!(
        service(&ledger, &oracle)
            .aggregate_settlement(GAME, &CancellationToken::new())
            .await
    );

    assert_eq!(ranked_addresses(&settlement), vec![player_addr(1)]);
    assert_eq!(settlement.unscored_players.len(), 2);
    assert!(matches!(
        settlement.unscored_players[0].issues[0].failure,
        FeedFailure::PriceUnavailable(_)
    ));
    assert_eq!(settlement.coin_feeds[&feed(4)].end_price, None);
}

#[tokio::test]
async fn test_repeated_passes_are_identical() {
    let ledger = three_player_ledger("1");
    let oracle = oracle();
    let svc = service(&ledger, &oracle);

    let first = assert_ok!(svc.aggregate_settlement(GAME, &CancellationToken::new()).await);
    let second = assert_ok!(svc.aggregate_settlement(GAME, &CancellationToken::new()).await);

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

/// P1 and P4 pick the same captain and coins, so they move identically.
fn four_player_ledger(join_order: &[u8]) -> MockLedger {
    let mut ledger = MockLedger::new().with_game(GAME, raw_game("1", true, true));
    for &i in join_order {
        let (captain, coins) = match i {
            1 | 4 => (1, vec![hex(2), hex(3)]),
            2 => (4, vec![hex(1), hex(2)]),
            _ => (2, vec![hex(3), hex(4)]),
        };
        ledger = ledger.with_player(GAME, raw_player(i, captain), coins);
    }
    for i in 1..=4 {
        ledger = ledger.with_coin_feed(GAME, raw_feed(i));
    }
    ledger
}

#[tokio::test]
async fn test_scores_independent_of_join_position() {
    let oracle = oracle();
    let forward = assert_ok!(
        service(&four_player_ledger(&[1, 2, 3, 4]), &oracle)
            .aggregate_settlement(GAME, &CancellationToken::new())
            .await
    );
    let reversed = assert_ok!(
        service(&four_player_ledger(&[4, 3, 2, 1]), &oracle)
            .aggregate_settlement(GAME, &CancellationToken::new())
            .await
    );

    let score_of = |settlement: &coinleague_settlement::Settlement, player: Address| {
        settlement
            .ranked_players
            .iter()
            .find(|r| r.player.address == player)
            .map(|r| r.computed_score)
    };
    for i in 1..=4 {
        assert_eq!(
            score_of(&forward, player_addr(i)),
            score_of(&reversed, player_addr(i)),
            "player {}",
            i
        );
    }
    assert_eq!(score_of(&forward, player_addr(1)), Some(d(-203)));
    assert_eq!(score_of(&forward, player_addr(4)), Some(d(-203)));

    // The tied pair ranks last, earlier joiner first.
    assert_eq!(
        ranked_addresses(&forward),
        vec![player_addr(2), player_addr(3), player_addr(1), player_addr(4)]
    );
    assert_eq!(
        ranked_addresses(&reversed),
        vec![player_addr(2), player_addr(3), player_addr(4), player_addr(1)]
    );
    for settlement in [&forward, &reversed] {
        let tied = &settlement.ranked_players[2..];
        assert!(tied[0].join_index < tied[1].join_index);
    }
}

#[tokio::test]
async fn test_result_independent_of_price_arrival_order() {
    let ledger = three_player_ledger("1");
    let fast_first = oracle()
        .with_delay(feed(1), Duration::from_millis(40))
        .with_delay(feed(2), Duration::from_millis(20));
    let slow_first = oracle()
        .with_delay(feed(3), Duration::from_millis(40))
        .with_delay(feed(4), Duration::from_millis(20));

    let a = assert_ok!(
        service(&ledger, &fast_first)
            .aggregate_settlement(GAME, &CancellationToken::new())
            .await
    );
    let b = assert_ok!(
        service(&ledger, &slow_first)
            .aggregate_settlement(GAME, &CancellationToken::new())
            .await
    );
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_failed_feed_is_retried_on_next_pass() {
    let ledger = three_player_ledger("1");
    let oracle = oracle().with_transient_failure(feed(4), 1, d(120));
    let svc = service(&ledger, &oracle);

    let first = assert_ok!(svc.aggregate_settlement(GAME, &CancellationToken::new()).await);
    assert_eq!(first.unscored_players.len(), 2);

    let second = assert_ok!(svc.aggregate_settlement(GAME, &CancellationToken::new()).await);
    assert!(second.unscored_players.is_empty());
    assert_eq!(oracle.calls_for(&feed(4)), 2);
}

#[tokio::test]
async fn test_started_game_is_provisional() {
    let ledger = MockLedger::new()
        .with_game(GAME, raw_game("1", true, false))
        .with_player(GAME, raw_player(1, 1), vec![hex(2), hex(3)])
        .with_coin_feed(GAME, raw_feed(1))
        .with_coin_feed(GAME, raw_feed(2))
        .with_coin_feed(GAME, raw_feed(3));
    let settlement = assert_ok!(
        service(&ledger, &oracle())
            .aggregate_settlement(GAME, &CancellationToken::new())
            .await
    );
    assert_eq!(settlement.phase, LifecyclePhase::Started);
    assert!(settlement.provisional);
    assert_eq!(settlement.ranked_players.len(), 1);
}

#[tokio::test]
async fn test_unknown_game() {
    let ledger = MockLedger::new();
    let err = assert_err!(
        service(&ledger, &oracle())
            .aggregate_settlement(GameId(404), &CancellationToken::new())
            .await
    );
    assert_eq!(err, SettlementError::GameNotFound(GameId(404)));
}

#[tokio::test]
async fn test_malformed_player_is_rejected() {
    // numCoins is 3, so every player needs two non-captain feeds.
    let ledger = MockLedger::new()
        .with_game(GAME, raw_game("1", true, true))
        .with_player(GAME, raw_player(1, 1), vec![hex(2)])
        .with_coin_feed(GAME, raw_feed(1))
        .with_coin_feed(GAME, raw_feed(2));
    let err = assert_err!(
        service(&ledger, &oracle())
            .aggregate_settlement(GAME, &CancellationToken::new())
            .await
    );
    assert!(matches!(err, SettlementError::MalformedRecord(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_ledger_outage_recovers_with_retry() {
    let ledger = three_player_ledger("1");
    ledger.set_unavailable(true);
    let svc = service(&ledger, &oracle());

    let err = assert_err!(svc.aggregate_settlement(GAME, &CancellationToken::new()).await);
    assert!(err.is_retryable());

    let toggle = ledger.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        toggle.set_unavailable(false);
    });

    let settlement = assert_ok!(
        svc.aggregate_settlement_with_retry(GAME, &CancellationToken::new())
            .await
    );
    assert_eq!(settlement.ranked_players.len(), 3);
}

#[tokio::test]
async fn test_cancellation_stops_in_flight_pricing() {
    let ledger = three_player_ledger("1");
    let oracle = oracle().with_delay(feed(1), Duration::from_secs(30));
    let svc = service(&ledger, &oracle);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        svc.aggregate_settlement(GAME, &cancel),
    )
    .await
    .expect("cancellation should end the pass promptly");
    assert_eq!(result, Err(SettlementError::Cancelled));
}

#[tokio::test]
async fn test_winner_sentinel_is_not_a_winner() {
    let ledger = three_player_ledger("1");
    let svc = service(&ledger, &oracle());

    let (winner, eligibility) = assert_ok!(
        svc.claim_status(GAME, &player_addr(1), &CancellationToken::new())
            .await
    );
    assert_eq!(winner, None);
    assert_eq!(eligibility, ClaimEligibility::NotWinner);
}

#[tokio::test]
async fn test_recorded_winner_can_claim() {
    let ledger = three_player_ledger("1").with_winner(
        GAME,
        player_addr(2),
        RawWinner {
            place: "0".to_string(),
            score: "17978".to_string(),
            winner_address: hex(0xa2),
            claimed: false,
        },
    );
    let svc = service(&ledger, &oracle());

    let (winner, eligibility) = assert_ok!(
        svc.claim_status(GAME, &player_addr(2), &CancellationToken::new())
            .await
    );
    assert_eq!(
        winner,
        Some(WinnerRecord {
            place: 0,
            score: d(17978),
            winner_address: player_addr(2),
            claimed: false,
        })
    );
    assert_eq!(eligibility, ClaimEligibility::Claimable { place: 0 });
}

#[tokio::test]
async fn test_lifecycle_report_for_overdue_game() {
    let ledger = MockLedger::new().with_game(GAME, raw_game("1", true, false));
    let svc = service(&ledger, &oracle());

    let report = assert_ok!(
        svc.lifecycle(
            GAME,
            coinleague_settlement::Timestamp::new(5_000),
            &CancellationToken::new()
        )
        .await
    );
    assert_eq!(report.phase, LifecyclePhase::Started);
    assert!(report.endable);
    assert!(!report.abortable);
}
