//! Countdown-driven polling of the withdrawal feed.
//!
//! One task owns the reconciler and multiplexes the 1-second tick, operator
//! commands, fetch responses and the shutdown signal. Fetches and customer
//! name lookups run as spawned tasks and report back over channels, so a hung
//! request never stalls the countdown. Responses arriving after shutdown are
//! dropped with the channel.

use crate::{
    error::ReconcileError,
    page::PageSize,
    qr::QrPayload,
    reconciler::{FetchOutcome, FetchTicket, MemberLookup, WithdrawalReconciler},
    types::WithdrawalKey,
};
use client::{ClientError, MerchantApi};
use serde_json::Value;
use std::time::Duration;
use store::KeyValueStore;
use tokio::{
    sync::{mpsc, watch},
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

const TICK: Duration = Duration::from_secs(1);

/// Seconds-until-refresh countdown.
///
/// There is a single state, `Idle(countdown)`: a refresh fires on the tick
/// that sees the countdown at 1 and resets it to the full interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTimer {
    interval: u64,
    countdown: u64,
}

impl RefreshTimer {
    pub const fn new(interval_secs: u64) -> Self {
        let interval = if interval_secs == 0 { 1 } else { interval_secs };
        Self {
            interval,
            countdown: interval,
        }
    }

    /// Seconds until the next automatic refresh.
    pub const fn remaining(&self) -> u64 {
        self.countdown
    }

    pub const fn interval(&self) -> u64 {
        self.interval
    }

    /// Advance one second. Returns true when a refresh is due.
    pub const fn tick(&mut self) -> bool {
        if self.countdown <= 1 {
            self.countdown = self.interval;
            true
        } else {
            self.countdown -= 1;
            false
        }
    }

    /// Restart the countdown, e.g. after a manual refresh.
    pub const fn reset(&mut self) {
        self.countdown = self.interval;
    }
}

/// Operator requests handled by the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Refresh,
    NextPage,
    PreviousPage,
    GoToPage(usize),
    SetPageSize(PageSize),
    ShowQr(WithdrawalKey),
    /// Mark the open QR's withdrawal scanned and close it
    ConfirmQr,
    CloseQr,
    MarkDone(WithdrawalKey),
}

/// Something the observer may want to render or record.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopEvent {
    Tick { remaining: u64 },
    FetchIssued { seq: u64, show_loading: bool },
    Fetched { outcome: FetchOutcome, elapsed: Duration },
    FetchFailed { error: String, elapsed: Duration },
    PageChanged,
    QrShown(QrPayload),
    QrClosed,
    ScanDone(WithdrawalKey),
    CommandFailed(String),
}

type FetchResult = (FetchTicket, Result<Vec<Value>, ClientError>, Duration);
type LookupResult = (MemberLookup, Result<Value, ClientError>);

/// Senders handed to spawned requests.
struct Replies {
    fetches: mpsc::UnboundedSender<FetchResult>,
    lookups: mpsc::UnboundedSender<LookupResult>,
}

/// Owns a reconciler and runs its refresh cycle until shutdown.
pub struct RefreshLoop<A, S> {
    reconciler: WithdrawalReconciler<A, S>,
    timer: RefreshTimer,
    commands: mpsc::Receiver<Command>,
    shutdown: watch::Receiver<bool>,
    open_qr: Option<QrPayload>,
}

impl<A, S> RefreshLoop<A, S>
where
    A: MerchantApi + Clone + 'static,
    S: KeyValueStore,
{
    pub const fn new(
        reconciler: WithdrawalReconciler<A, S>,
        interval_secs: u64,
        commands: mpsc::Receiver<Command>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            reconciler,
            timer: RefreshTimer::new(interval_secs),
            commands,
            shutdown,
            open_qr: None,
        }
    }

    /// Run until the shutdown flag is set or its sender is dropped.
    ///
    /// Starts with a visible-loading fetch. Returns the reconciler so callers
    /// can inspect the final state.
    pub async fn run<F>(mut self, mut observer: F) -> WithdrawalReconciler<A, S>
    where
        F: FnMut(&WithdrawalReconciler<A, S>, &LoopEvent),
    {
        let (fetches, mut results) = mpsc::unbounded_channel::<FetchResult>();
        let (lookups, mut lookup_results) = mpsc::unbounded_channel::<LookupResult>();
        let replies = Replies { fetches, lookups };
        let mut ticker = time::interval_at(Instant::now() + TICK, TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval = self.timer.interval(), "Starting withdrawal refresh loop");
        self.spawn_fetch(true, &replies, &mut observer);

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;

                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let due = self.timer.tick();
                    observer(&self.reconciler, &LoopEvent::Tick { remaining: self.timer.remaining() });
                    if due {
                        self.spawn_fetch(false, &replies, &mut observer);
                    }
                }
                Some((ticket, result, elapsed)) = results.recv() => {
                    let event = match self.reconciler.apply_fetch(&ticket, result) {
                        Ok(outcome) => LoopEvent::Fetched { outcome, elapsed },
                        Err(e) => LoopEvent::FetchFailed { error: e.to_string(), elapsed },
                    };
                    observer(&self.reconciler, &event);
                }
                Some((lookup, result)) = lookup_results.recv() => {
                    self.apply_lookup(&lookup, result, &mut observer);
                }
                Some(command) = self.commands.recv() => {
                    self.handle(command, &replies, &mut observer);
                }
            }
        }

        info!("Withdrawal refresh loop stopped");
        self.reconciler
    }

    fn handle<F>(&mut self, command: Command, replies: &Replies, observer: &mut F)
    where
        F: FnMut(&WithdrawalReconciler<A, S>, &LoopEvent),
    {
        debug!(?command, "Handling command");

        match command {
            Command::Refresh => {
                self.timer.reset();
                self.spawn_fetch(true, replies, observer);
            }
            Command::NextPage => {
                if self.reconciler.next_page() {
                    observer(&self.reconciler, &LoopEvent::PageChanged);
                }
            }
            Command::PreviousPage => {
                if self.reconciler.previous_page() {
                    observer(&self.reconciler, &LoopEvent::PageChanged);
                }
            }
            Command::GoToPage(page) => {
                if self.reconciler.go_to_page(page) {
                    observer(&self.reconciler, &LoopEvent::PageChanged);
                }
            }
            Command::SetPageSize(size) => {
                self.reconciler.set_page_size(size);
                observer(&self.reconciler, &LoopEvent::PageChanged);
            }
            Command::ShowQr(key) => self.show_qr(&key, replies, observer),
            Command::ConfirmQr => match self.open_qr.take() {
                Some(payload) => {
                    self.reconciler.confirm_qr(&payload);
                    observer(&self.reconciler, &LoopEvent::ScanDone(payload.withdraw_key));
                }
                None => {
                    observer(
                        &self.reconciler,
                        &LoopEvent::CommandFailed("no QR is open".to_string()),
                    );
                }
            },
            Command::CloseQr => {
                if self.open_qr.take().is_some() {
                    observer(&self.reconciler, &LoopEvent::QrClosed);
                }
            }
            Command::MarkDone(key) => {
                self.reconciler.record_scan_done(&key);
                observer(&self.reconciler, &LoopEvent::ScanDone(key));
            }
        }
    }

    fn show_qr<F>(&mut self, key: &str, replies: &Replies, observer: &mut F)
    where
        F: FnMut(&WithdrawalReconciler<A, S>, &LoopEvent),
    {
        let payload = match self.reconciler.qr_payload(key) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key, error = %e, "Cannot show QR");
                observer(&self.reconciler, &LoopEvent::CommandFailed(e.to_string()));
                return;
            }
        };

        // Shown immediately; the name lookup only refines it.
        observer(&self.reconciler, &LoopEvent::QrShown(payload.clone()));

        match self.reconciler.begin_member_lookup(&payload) {
            Ok(Some(lookup)) => {
                let api = self.reconciler.api().clone();
                let lookups = replies.lookups.clone();
                tokio::spawn(async move {
                    let result = lookup.run(&api).await;
                    let _ = lookups.send((lookup, result));
                });
            }
            Ok(None) => {}
            Err(e) => warn!(key, error = %e, "Customer name lookup skipped"),
        }
        self.open_qr = Some(payload);
    }

    /// Refine the open QR with a finished name lookup.
    ///
    /// Results for a QR that has since been closed or replaced are dropped.
    fn apply_lookup<F>(
        &mut self,
        lookup: &MemberLookup,
        result: Result<Value, ClientError>,
        observer: &mut F,
    ) where
        F: FnMut(&WithdrawalReconciler<A, S>, &LoopEvent),
    {
        let Some(payload) = self
            .open_qr
            .as_mut()
            .filter(|payload| payload.withdraw_key == lookup.key)
        else {
            debug!(key = %lookup.key, "Dropping name lookup for closed QR");
            return;
        };

        let refined = match lookup.apply(payload, result) {
            Ok(changed) => changed,
            Err(ReconcileError::SecondaryLookupFailed(_)) => true,
            Err(e) => {
                warn!(key = %lookup.key, error = %e, "Customer name lookup failed");
                false
            }
        };
        if refined {
            let payload = payload.clone();
            observer(&self.reconciler, &LoopEvent::QrShown(payload));
        }
    }

    fn spawn_fetch<F>(&mut self, show_loading: bool, replies: &Replies, observer: &mut F)
    where
        F: FnMut(&WithdrawalReconciler<A, S>, &LoopEvent),
    {
        let ticket = match self.reconciler.begin_fetch(show_loading) {
            Ok(ticket) => ticket,
            Err(e) => {
                observer(
                    &self.reconciler,
                    &LoopEvent::FetchFailed {
                        error: e.to_string(),
                        elapsed: Duration::ZERO,
                    },
                );
                return;
            }
        };

        observer(
            &self.reconciler,
            &LoopEvent::FetchIssued {
                seq: ticket.seq,
                show_loading,
            },
        );

        let api = self.reconciler.api().clone();
        let results_tx = replies.fetches.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let result = ticket.run(&api).await;
            // The loop may be gone; then there is nothing left to update.
            let _ = results_tx.send((ticket, result, started.elapsed()));
        });
    }
}
