//! Game and wallet counters exported in Prometheus text format

use crate::errors::WalletError;
use crate::games::SpinOutcome;
use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

pub struct GameMetrics {
    start_time: Instant,
    http_requests_total: AtomicU64,
    spins_lose: AtomicU64,
    spins_win: AtomicU64,
    spins_super_win: AtomicU64,
    wagered_total: AtomicI64,
    paid_out_total: AtomicI64,
    deposits_total: AtomicU64,
    withdrawals_total: AtomicU64,
    business_failures_total: AtomicU64,
    internal_failures_total: AtomicU64,
    rate_limited_total: AtomicU64,
}

impl GameMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            http_requests_total: AtomicU64::new(0),
            spins_lose: AtomicU64::new(0),
            spins_win: AtomicU64::new(0),
            spins_super_win: AtomicU64::new(0),
            wagered_total: AtomicI64::new(0),
            paid_out_total: AtomicI64::new(0),
            deposits_total: AtomicU64::new(0),
            withdrawals_total: AtomicU64::new(0),
            business_failures_total: AtomicU64::new(0),
            internal_failures_total: AtomicU64::new(0),
            rate_limited_total: AtomicU64::new(0),
        }
    }

    pub fn record_request(&self) {
        self.http_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a committed spin. Only winnings count as paid out.
    pub fn record_spin(&self, outcome: SpinOutcome, bet_amount: i64, win_amount: i64) {
        let counter = match outcome {
            SpinOutcome::Lose => &self.spins_lose,
            SpinOutcome::Win => &self.spins_win,
            SpinOutcome::SuperWin => &self.spins_super_win,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.wagered_total.fetch_add(bet_amount, Ordering::Relaxed);
        if win_amount > 0 {
            self.paid_out_total.fetch_add(win_amount, Ordering::Relaxed);
        }
    }

    pub fn record_deposit(&self) {
        self.deposits_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_withdrawal(&self) {
        self.withdrawals_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, error: &WalletError) {
        if error.is_business() {
            self.business_failures_total.fetch_add(1, Ordering::Relaxed);
        } else {
            self.internal_failures_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn spins_total(&self) -> u64 {
        self.spins_lose.load(Ordering::Relaxed)
            + self.spins_win.load(Ordering::Relaxed)
            + self.spins_super_win.load(Ordering::Relaxed)
    }

    /// Generate Prometheus metrics format
    pub fn to_prometheus_format(&self) -> String {
        let mut output = String::new();

        counter(
            &mut output,
            "slotvault_http_requests_total",
            "Total number of HTTP requests",
            self.http_requests_total.load(Ordering::Relaxed),
        );

        let _ = write!(
            output,
            "# HELP slotvault_spins_total Committed spins by outcome\n\
             # TYPE slotvault_spins_total counter\n\
             slotvault_spins_total{{outcome=\"Lose\"}} {}\n\
             slotvault_spins_total{{outcome=\"Win\"}} {}\n\
             slotvault_spins_total{{outcome=\"SuperWin\"}} {}\n\n",
            self.spins_lose.load(Ordering::Relaxed),
            self.spins_win.load(Ordering::Relaxed),
            self.spins_super_win.load(Ordering::Relaxed),
        );

        counter(
            &mut output,
            "slotvault_wagered_total",
            "Sum of bet amounts in minor units",
            self.wagered_total.load(Ordering::Relaxed),
        );
        counter(
            &mut output,
            "slotvault_paid_out_total",
            "Sum of positive spin results in minor units",
            self.paid_out_total.load(Ordering::Relaxed),
        );
        counter(
            &mut output,
            "slotvault_deposits_total",
            "Completed deposits",
            self.deposits_total.load(Ordering::Relaxed),
        );
        counter(
            &mut output,
            "slotvault_withdrawals_total",
            "Completed withdrawals",
            self.withdrawals_total.load(Ordering::Relaxed),
        );

        let _ = write!(
            output,
            "# HELP slotvault_failures_total Failed operations by kind\n\
             # TYPE slotvault_failures_total counter\n\
             slotvault_failures_total{{kind=\"business\"}} {}\n\
             slotvault_failures_total{{kind=\"internal\"}} {}\n\n",
            self.business_failures_total.load(Ordering::Relaxed),
            self.internal_failures_total.load(Ordering::Relaxed),
        );

        counter(
            &mut output,
            "slotvault_rate_limited_total",
            "Requests rejected by the rate limiter",
            self.rate_limited_total.load(Ordering::Relaxed),
        );

        let _ = write!(
            output,
            "# HELP slotvault_uptime_seconds Process uptime\n\
             # TYPE slotvault_uptime_seconds gauge\n\
             slotvault_uptime_seconds {:.3}\n",
            self.start_time.elapsed().as_secs_f64()
        );

        output
    }
}

impl Default for GameMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn counter<V: std::fmt::Display>(output: &mut String, name: &str, help: &str, value: V) {
    let _ = write!(
        output,
        "# HELP {name} {help}\n# TYPE {name} counter\n{name} {value}\n\n"
    );
}
