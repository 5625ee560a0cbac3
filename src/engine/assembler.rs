//! Normalizes raw ledger records into domain entities.

use crate::domain::{
    Address, CoinFeed, Decimal, Game, GameDirection, Player, Timestamp, WinnerRecord,
};
use crate::error::SettlementError;
use crate::ledger::{LedgerSnapshot, RawCoinFeed, RawPlayer, RawWinner};
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

fn malformed(msg: String) -> SettlementError {
    SettlementError::MalformedRecord(msg)
}

fn parse_amount(field: &str, raw: &str) -> Result<Decimal, SettlementError> {
    Decimal::from_ledger_int(raw).map_err(|e| malformed(format!("{}: {}", field, e)))
}

fn parse_i64(field: &str, raw: &str) -> Result<i64, SettlementError> {
    parse_amount(field, raw)?
        .to_i64()
        .ok_or_else(|| malformed(format!("{}: out of range: {}", field, raw)))
}

fn parse_u32(field: &str, raw: &str) -> Result<u32, SettlementError> {
    u32::try_from(parse_i64(field, raw)?)
        .map_err(|_| malformed(format!("{}: out of range: {}", field, raw)))
}

fn parse_address(field: &str, raw: &str) -> Result<Address, SettlementError> {
    Address::from_str(raw).map_err(|e| malformed(format!("{}: {}", field, e)))
}

/// Build the canonical [`Game`] from a ledger snapshot.
///
/// The feed set is the union of every player's captain and coin feeds, keyed by address.
/// Fails with `MalformedRecord` when the pieces do not fit together.
pub fn assemble_game(snapshot: &LedgerSnapshot) -> Result<Game, SettlementError> {
    let raw = &snapshot.game;

    let direction_code = parse_u32("gameType", &raw.game_type)?;
    let direction = u8::try_from(direction_code)
        .ok()
        .and_then(GameDirection::from_code)
        .ok_or_else(|| malformed(format!("gameType: unknown direction {}", raw.game_type)))?;

    let num_coins_per_player = parse_u32("numCoins", &raw.num_coins)?;
    if num_coins_per_player == 0 {
        return Err(malformed("numCoins: must be at least 1".to_string()));
    }

    if raw.finished && raw.aborted {
        return Err(malformed("game is both finished and aborted".to_string()));
    }
    if raw.finished && !raw.started {
        return Err(malformed("game is finished but never started".to_string()));
    }

    let coin_feeds = assemble_coin_feeds(&snapshot.coin_feeds)?;

    if snapshot.player_coin_feeds.len() != snapshot.players.len() {
        return Err(malformed(format!(
            "coin feed lists for {} players, but {} players",
            snapshot.player_coin_feeds.len(),
            snapshot.players.len()
        )));
    }

    let mut seen_players = HashSet::new();
    let mut players = Vec::with_capacity(snapshot.players.len());
    for (raw_player, raw_coins) in snapshot.players.iter().zip(&snapshot.player_coin_feeds) {
        let player = assemble_player(raw_player, raw_coins, num_coins_per_player, &coin_feeds)?;
        if !seen_players.insert(player.address.clone()) {
            return Err(malformed(format!("player {} joined twice", player.address)));
        }
        players.push(player);
    }

    Ok(Game {
        id: snapshot.game_id,
        direction,
        duration_secs: parse_i64("duration", &raw.duration)?,
        start_timestamp: Timestamp::new(parse_i64("startTimestamp", &raw.start_timestamp)?),
        abort_timestamp: Timestamp::new(parse_i64("abortTimestamp", &raw.abort_timestamp)?),
        entry_amount: parse_amount("amountToPlay", &raw.amount_to_play)?,
        entry_token: parse_address("coinToPlay", &raw.coin_to_play)?,
        num_coins_per_player,
        num_players_expected: parse_u32("numPlayers", &raw.num_players)?,
        total_amount_collected: parse_amount("totalAmountCollected", &raw.total_amount_collected)?,
        started: raw.started,
        finished: raw.finished,
        aborted: raw.aborted,
        scores_finalized: raw.scores_done,
        players,
        coin_feeds,
    })
}

fn assemble_coin_feeds(
    raw: &[RawCoinFeed],
) -> Result<BTreeMap<Address, CoinFeed>, SettlementError> {
    let mut feeds = BTreeMap::new();
    for raw_feed in raw {
        let address = parse_address("feed", &raw_feed.feed)?;
        let start_price = parse_amount("startPrice", &raw_feed.start_price)?;
        let end_price = parse_amount("endPrice", &raw_feed.end_price)?;
        let score = parse_amount("score", &raw_feed.score)?;

        // A zero end price means the ledger has not settled this feed yet.
        let mut feed = CoinFeed::new(address.clone(), start_price);
        if !end_price.is_zero() {
            feed.end_price = Some(end_price);
            feed.score = Some(score);
        }

        feeds.entry(address).or_insert(feed);
    }
    Ok(feeds)
}

fn assemble_player(
    raw: &RawPlayer,
    raw_coins: &[String],
    num_coins_per_player: u32,
    coin_feeds: &BTreeMap<Address, CoinFeed>,
) -> Result<Player, SettlementError> {
    let address = parse_address("playerAddress", &raw.player_address)?;
    let captain_coin = parse_address("captainCoin", &raw.captain_coin)?;

    let expected = (num_coins_per_player - 1) as usize;
    if raw_coins.len() != expected {
        return Err(malformed(format!(
            "player {} has {} coin feeds, expected {}",
            address,
            raw_coins.len(),
            expected
        )));
    }

    let mut seen = HashSet::new();
    let mut coins = Vec::with_capacity(raw_coins.len());
    for raw_coin in raw_coins {
        let coin = parse_address("coinFeed", raw_coin)?;
        if coin == captain_coin {
            return Err(malformed(format!(
                "player {} lists captain {} among coin feeds",
                address, coin
            )));
        }
        if !seen.insert(coin.clone()) {
            return Err(malformed(format!("player {} lists {} twice", address, coin)));
        }
        coins.push(coin);
    }

    let affiliate = parse_address("affiliate", &raw.affiliate)?;

    let player = Player {
        address,
        captain_coin,
        coin_feeds: coins,
        affiliate: (!affiliate.is_zero()).then_some(affiliate),
        raw_chain_score: parse_amount("score", &raw.score)?,
    };

    if let Some(unknown) = player.all_feeds().find(|feed| !coin_feeds.contains_key(*feed)) {
        return Err(malformed(format!(
            "player {} references unknown feed {}",
            player.address, unknown
        )));
    }

    Ok(player)
}

/// Normalize a winner record. The sentinel is kept; see [`WinnerRecord::into_resolved`].
pub fn assemble_winner(raw: &RawWinner) -> Result<WinnerRecord, SettlementError> {
    Ok(WinnerRecord {
        place: parse_u32("place", &raw.place)?,
        score: parse_amount("score", &raw.score)?,
        winner_address: parse_address("winnerAddress", &raw.winner_address)?,
        claimed: raw.claimed,
    })
}
