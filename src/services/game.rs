//! Game session orchestration: one spin is one unit of work

use crate::common::traits::{Ledger, SpinLog};
use crate::common::types::{NewSpin, Page, SpinRecord, User};
use crate::errors::{WalletError, WalletResult};
use crate::games::SlotMachine;
use crate::transaction::{TxRunner, TxScope};
use std::sync::Arc;
use tracing::{debug, info};

/// A committed spin and the balance it left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinReceipt {
    pub spin: SpinRecord,
    pub balance: i64,
}

#[derive(Clone)]
pub struct GameService {
    ledger: Arc<dyn Ledger>,
    spin_log: Arc<dyn SpinLog>,
    machine: SlotMachine,
    runner: TxRunner,
}

impl GameService {
    pub fn new(ledger: Arc<dyn Ledger>, spin_log: Arc<dyn SpinLog>, machine: SlotMachine, runner: TxRunner) -> Self {
        Self {
            ledger,
            spin_log,
            machine,
            runner,
        }
    }

    /// Spin as its own unit of work.
    pub async fn spin(&self, user: &User, bet_amount: i64) -> WalletResult<SpinReceipt> {
        self.spin_in(&mut TxScope::new(), user, bet_amount).await
    }

    /// Spin inside the caller's scope. Balance read, draw, balance write and
    /// history append either all commit or none do.
    pub async fn spin_in(&self, scope: &mut TxScope, user: &User, bet_amount: i64) -> WalletResult<SpinReceipt> {
        SlotMachine::validate_bet(bet_amount)?;

        let ledger = self.ledger.clone();
        let spin_log = self.spin_log.clone();
        let machine = self.machine.clone();
        let login = user.login.clone();
        let user_id = user.id;

        let receipt = self
            .runner
            .run(scope, move |scope| {
                Box::pin(async move {
                    let balance = ledger.get_balance(scope, &login).await?;
                    if balance < bet_amount {
                        return Err(WalletError::InsufficientFunds {
                            balance,
                            requested: bet_amount,
                        });
                    }

                    let draw = machine.spin(bet_amount)?;
                    let new_balance = balance
                        .checked_add(draw.payout)
                        .ok_or_else(|| WalletError::BalanceOverflow { login: login.clone() })?;

                    ledger.set_balance(scope, &login, new_balance).await?;

                    let spin = spin_log
                        .record_spin(
                            scope,
                            NewSpin {
                                user_id,
                                combination: draw.combination.to_string(),
                                result: draw.outcome,
                                bet_amount,
                                win_amount: draw.payout,
                            },
                        )
                        .await?;

                    debug!(
                        login = %login,
                        combination = %spin.combination,
                        outcome = %spin.result,
                        bet_amount,
                        win_amount = spin.win_amount,
                        "spin settled"
                    );

                    Ok::<_, WalletError>(SpinReceipt {
                        spin,
                        balance: new_balance,
                    })
                })
            })
            .await?;

        info!(login = %user.login, balance = receipt.balance, "spin committed");
        Ok(receipt)
    }

    pub async fn spin_history(&self, user: &User, page: Page) -> WalletResult<Vec<SpinRecord>> {
        self.spin_log.spin_history(&user.id, page).await
    }
}
