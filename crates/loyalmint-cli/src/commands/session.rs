//! Interactive session over the in-memory ledger.

use std::sync::Arc;

use clap::Args;
use loyalmint_core::sim::{InMemoryLedger, LocalWallet};
use loyalmint_core::{
    ActionOutcome, BalancePoller, ControllerSettings, LoyaltyConfig, ReconciliationController,
    RewardCatalog, TransactionRecord,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const HELP: &str = "\
commands:
  status [--json]            balance, tier, expiry and last failure
  mint                       pay the mint fee and mint points
  redeem                     quick-redeem the fixed amount
  reward <id>                redeem a catalog reward
  rewards                    list rewards and affordability
  draft <amount> <address>   fill the transfer draft
  transfer [<amount> <address>]
                             transfer points (defaults to the draft)
  sweep                      drop expired blocks into the history
  history                    transaction log, newest first
  address [<seed>]           wallet address, or another seed's address
  quit";

#[derive(Args)]
pub struct SessionArgs {
    /// Seed phrase for the local wallet
    #[arg(long, default_value = "loyalmint-demo")]
    seed: String,
    /// Points already on the ledger for this wallet
    #[arg(long, default_value = "0")]
    points: u64,
    /// Native balance funded to the wallet
    #[arg(long, default_value = "1000000000")]
    lamports: u64,
    /// Disable background balance polling
    #[arg(long)]
    no_poll: bool,
}

pub async fn run(args: SessionArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = LoyaltyConfig::load_or_default();
    let wallet = LocalWallet::from_seed(&args.seed);
    let owner = wallet.public_key();

    let ledger = Arc::new(InMemoryLedger::with_program(
        config.program_address()?,
        config.program.account_seed.clone(),
    ));
    ledger.fund(&owner, args.lamports);
    if args.points > 0 {
        ledger.set_points_for(&owner, &config.program.account_seed, args.points);
    }

    let controller = ReconciliationController::new(
        ledger,
        Arc::new(wallet),
        RewardCatalog::reference(),
        ControllerSettings::from(&config),
    );

    let poller = if args.no_poll {
        // No account until the first mint.
        if let Err(e) = controller.refresh_balance().await {
            debug!(error = %e, "initial balance read failed");
        }
        if let Ok(Some(lamports)) = controller.fetch_native_balance().await {
            controller.apply_native_balance(lamports);
        }
        None
    } else {
        Some(BalancePoller::spawn(controller.clone(), config.poll_interval()))
    };

    println!("wallet {}", owner.masked());
    println!("type `help` for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, rest)) = words.split_first() else {
            continue;
        };
        debug!(command, "session command");
        match command {
            "quit" | "exit" => break,
            "help" => println!("{HELP}"),
            "status" => print_status(&controller, rest.first() == Some(&"--json"))?,
            "mint" => report(controller.mint().await),
            "redeem" => report(controller.quick_redeem().await),
            "reward" => match rest.first() {
                Some(id) => report(controller.redeem_reward(id).await),
                None => println!("usage: reward <id>"),
            },
            "rewards" => {
                let snapshot = controller.snapshot();
                for view in &snapshot.rewards {
                    let mark = if view.affordable { "[x]" } else { "[ ]" };
                    println!(
                        "{mark} {:<12} {:>5} pts  {}",
                        view.reward.id, view.reward.points_cost, view.reward.name
                    );
                }
            }
            "draft" => match parse_transfer(rest) {
                Some((amount, recipient)) => {
                    controller.set_transfer_draft(amount, recipient);
                    println!("draft saved");
                }
                None => println!("usage: draft <amount> <address>"),
            },
            "transfer" => {
                if rest.is_empty() {
                    report(controller.submit_transfer_draft().await);
                } else {
                    match parse_transfer(rest) {
                        Some((amount, recipient)) => {
                            report(controller.transfer(amount, recipient).await)
                        }
                        None => println!("usage: transfer [<amount> <address>]"),
                    }
                }
            }
            "sweep" => match controller.sweep_expired() {
                Some(lapsed) => println!("{lapsed} points expired"),
                None => println!("nothing expired"),
            },
            "history" => print_history(&controller.history()),
            "address" => match rest.first() {
                Some(seed) => println!("{}", LocalWallet::from_seed(seed).public_key()),
                None => println!("{owner}"),
            },
            other => println!("unknown command: {other} (try `help`)"),
        }
    }

    if let Some(poller) = poller {
        poller.shutdown().await;
    }
    Ok(())
}

fn parse_transfer<'a>(rest: &[&'a str]) -> Option<(u64, &'a str)> {
    match rest {
        [amount, recipient] => Some((amount.parse().ok()?, recipient)),
        _ => None,
    }
}

fn report(result: loyalmint_core::error::Result<ActionOutcome>) {
    match result {
        Ok(outcome) => {
            match &outcome.description {
                Some(description) => println!("ok: {description}"),
                None => println!("ok: {} points", outcome.points),
            }
            println!("  signature {}", outcome.signature);
            match outcome.balance {
                Some(balance) => println!("  balance {balance}"),
                None => println!("  balance unavailable, showing last known value"),
            }
        }
        Err(e) => println!("error: {e}"),
    }
}

fn print_status(
    controller: &ReconciliationController,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = controller.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("balance   {} points", snapshot.balance);
    let tier = &snapshot.tier;
    match &tier.next {
        Some(next) => println!(
            "tier      {} (x{}), {} to {}",
            tier.current.name, snapshot.multiplier, tier.points_to_next, next.name
        ),
        None => println!("tier      {} (x{})", tier.current.name, snapshot.multiplier),
    }
    println!("active    {}", snapshot.active_points);
    println!("expiring  {}", snapshot.expiring_points);
    if let Some(lamports) = snapshot.native_lamports {
        println!("native    {lamports} lamports");
    }
    println!("state     {:?}", snapshot.state);
    if let Some(failure) = &snapshot.last_failure {
        println!("failure   {}", failure.message);
    }
    Ok(())
}

fn print_history(records: &[TransactionRecord]) {
    if records.is_empty() {
        println!("no transactions yet");
        return;
    }
    for record in records {
        println!(
            "{}  {:<8} {:>6}  {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.kind.as_str(),
            record.signed_display(),
            record.description.as_deref().unwrap_or("")
        );
    }
}
