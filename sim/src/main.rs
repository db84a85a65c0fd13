use anyhow::Context;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use futures::executor::block_on;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use treasure_core::*;

mod render;

type Session = HuntSession<MemoryLedger, ContractTreasury<MemoryLedger>>;

/// Play a treasure hunt round against an in-memory ledger.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// What log level to use
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,

    /// TOML file with the hunt configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Force a seed instead of random
    #[arg(short, long)]
    seed: Option<u64>,

    /// Tile to reveal, as X,Y (repeatable)
    #[arg(long = "click", value_parser = parse_location)]
    clicks: Vec<Location>,

    /// Reveal this many random tiles after the explicit clicks
    #[arg(short, long, default_value_t = 0)]
    random_clicks: u16,

    /// Reveal fee charged by the contract, in aettos
    #[arg(long, default_value = "1000000000000000")]
    reveal_fee: Amount,

    /// Reward paid per treasure, in aettos
    #[arg(long, default_value = "5000000000000000")]
    reward: Amount,

    /// Starting balance of the player, in aettos
    #[arg(long, default_value = "100000000000000000")]
    player_funds: Amount,

    /// Starting balance of the treasury, in aettos
    #[arg(long, default_value = "1000000000000000000")]
    treasury_funds: Amount,
}

fn parse_location(s: &str) -> core::result::Result<Location, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {s:?}"))?;
    let x = x.trim().parse().map_err(|e| format!("bad x in {s:?}: {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad y in {s:?}: {e}"))?;
    Ok(Location::new(x, y))
}

fn time_seed() -> u64 {
    use web_time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(args.verbose.tracing_level_filter().into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("could not read {}", path.display()))?;
            HuntConfig::from_toml_str(&text).with_context(|| format!("could not load {}", path.display()))?
        }
        None => HuntConfig::default(),
    };
    let seed = args.seed.unwrap_or_else(time_seed);
    log::debug!("seed: {}", seed);

    let contract = ContractId::parse("ct_treasurehunt")?;
    let player = AccountId::parse("ak_player")?;
    let treasury = AccountId::parse("ak_treasury")?;
    let chain = MemoryChain::new(contract.clone(), treasury.clone(), args.reveal_fee, args.reward);
    chain.fund(&player, args.player_funds);
    chain.fund(&treasury, args.treasury_funds);

    let session = HuntSession::new(
        config,
        chain.connect(player.clone()),
        ContractTreasury::new(chain.connect(treasury.clone()), contract.clone()),
        player.clone(),
        contract,
        seed,
    )?;

    block_on(play(&session, &args, seed))?;

    println!();
    print!("{}", render::board(&session.board(), &session.bombs(), &chain.treasures()));
    println!("player balance:   {} AE", render::ae(chain.balance_of(&player)));
    println!("treasury balance: {} AE", render::ae(chain.balance_of(&treasury)));
    println!("fees collected:   {} AE", render::ae(chain.pool()));
    Ok(())
}

async fn play(session: &Session, args: &Args, seed: u64) -> anyhow::Result<()> {
    use rand::prelude::*;

    let treasures = session.start_round().await?;
    log::info!("{} treasures placed", treasures.len());
    let balance = session.refresh_balance().await?;
    println!("starting balance: {} AE", render::ae(balance));

    for &loc in &args.clicks {
        if !reveal(session, loc).await {
            return Ok(());
        }
    }

    let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(1));
    for _ in 0..args.random_clicks {
        let candidates: Vec<_> = session
            .board()
            .cells()
            .filter(|(_, state)| state.is_unrevealed())
            .map(|(loc, _)| loc)
            .collect();
        if candidates.is_empty() {
            break;
        }
        let pick = candidates[rng.random_range(0..candidates.len())];
        if !reveal(session, pick).await {
            break;
        }
    }
    Ok(())
}

/// Reveals one tile and reports it. Returns whether the round can go on.
async fn reveal(session: &Session, loc: Location) -> bool {
    match session.reveal_tile(loc).await {
        Ok(report) => {
            let balance = report
                .new_balance
                .map(render::ae)
                .unwrap_or_else(|| "unknown".to_string());
            println!("{loc}: {:?} (balance {balance} AE)", report.outcome);
            report.outcome != RevealOutcome::BombHit
        }
        Err(err) => {
            println!("{loc}: {err}");
            if err.funds_may_be_spent() {
                println!("{loc}: the reveal fee may already have been spent");
            }
            session.status().is_active()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_click_locations() {
        assert_eq!(parse_location("3,4"), Ok(Location::new(3, 4)));
        assert_eq!(parse_location(" 0 , 9 "), Ok(Location::new(0, 9)));
        assert!(parse_location("3").is_err());
        assert!(parse_location("3,-1").is_err());
        assert!(parse_location("x,1").is_err());
    }

    #[test]
    fn click_flags_reach_args() {
        let args = Args::try_parse_from(["treasure-sim", "--click", "1,2", "--click", "0,0", "--seed", "7"]).unwrap();

        assert_eq!(args.clicks, vec![Location::new(1, 2), Location::new(0, 0)]);
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.reveal_fee, Amount::from(1_000_000_000_000_000u64));
    }
}
