//! Database inspection binary
//!
//! Prints an account and its most recent spins from a database directory
//! without modifying it. Safe to run next to a live server.

use clap::Parser;
use slotvault::storage::{RocksStore, Store};

#[derive(Parser, Debug)]
#[command(name = "slotvault-inspect")]
#[command(about = "Show a SlotVault account and its latest spins", long_about = None)]
struct Args {
    /// Login of the account to show
    login: String,

    /// Database directory
    #[arg(long, default_value = "./DB/slotvault_data")]
    db_path: String,

    /// Number of spins to list
    #[arg(long, default_value = "20")]
    spins: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let store = RocksStore::open_read_only(&args.db_path)?;

    let Some(user) = store.load_user(&args.login)? else {
        println!("No account with login {:?} in {}", args.login, args.db_path);
        return Ok(());
    };

    println!("Account {}", user.login);
    println!("   Id:      {}", user.id);
    println!("   Name:    {} {}", user.first_name, user.last_name);
    println!("   Balance: {}", user.balance);
    println!();

    let spins = store.list_spins(&user.id, args.spins, 0).await?;
    if spins.is_empty() {
        println!("No spins recorded");
        return Ok(());
    }

    println!("Latest {} spins (newest first):", spins.len());
    for spin in spins {
        println!(
            "   {}  {:<8} [{}]  bet {:>10}  result {:>+12}",
            spin.created_at.format("%Y-%m-%d %H:%M:%S%.6f"),
            spin.result,
            spin.combination,
            spin.bet_amount,
            spin.win_amount,
        );
    }

    Ok(())
}
