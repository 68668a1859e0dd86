//! The escrow store: a single escrow record kept in key/value storage.
//!
//! Every read is re-validated. Every failure is returned to the caller and
//! also kept in the shared [`EscrowState`] so views can display it. One
//! store is meant to be shared (behind an `Arc`) by all consumers, which
//! observe it through [`EscrowStore::subscribe`] or [`EscrowStore::changes`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::codec::{decode_record, encode_record};
use crate::config::StoreConfig;
use crate::notify::{NoopNotifier, NotificationKind, Notifier, NotifyError, SystemNotification};
use crate::stores::Storage;
use crate::{EscrowStatus, EscrowTransaction, Error, NewEscrow};

const DEFAULT_DISPUTE_MESSAGE: &str = "Your dispute has been submitted for review";

/// Snapshot published to every subscriber after each operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EscrowState {
    pub escrow: Option<EscrowTransaction>,
    /// Outcome of the most recent failed operation, cleared on success.
    pub error: Option<Error>,
    /// False until the first load or refresh has completed.
    pub loaded: bool,
}

impl EscrowState {
    pub fn is_active(&self) -> bool {
        self.escrow.as_ref().is_some_and(EscrowTransaction::is_active)
    }
}

pub struct EscrowStore {
    config: StoreConfig,
    storage: Arc<dyn Storage>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    state: watch::Sender<EscrowState>,
    /// Serializes read-modify-write sequences against storage
    write_lock: Mutex<()>,
}

impl EscrowStore {
    /// Creates a store with no escrow loaded yet. Call [`load`](Self::load)
    /// once before use.
    pub fn new(config: StoreConfig, storage: Arc<dyn Storage>) -> Self {
        let (state, _) = watch::channel(EscrowState::default());
        Self {
            config,
            storage,
            notifier: Arc::new(NoopNotifier),
            clock: Arc::new(SystemClock),
            state,
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn state(&self) -> EscrowState {
        self.state.borrow().clone()
    }

    pub fn escrow(&self) -> Option<EscrowTransaction> {
        self.state.borrow().escrow.clone()
    }

    pub fn error(&self) -> Option<Error> {
        self.state.borrow().error.clone()
    }

    /// True iff an escrow exists and is still `in_escrow`.
    pub fn is_active(&self) -> bool {
        self.state.borrow().is_active()
    }

    pub fn subscribe(&self) -> watch::Receiver<EscrowState> {
        self.state.subscribe()
    }

    /// Stream of state snapshots, starting with the current one.
    pub fn changes(&self) -> WatchStream<EscrowState> {
        WatchStream::new(self.state.subscribe())
    }

    /// Reads the escrow from storage.
    ///
    /// A missing value is not an error. A value that is not JSON, or does
    /// not describe a valid escrow, is removed from storage and reported.
    /// On any failure the in-memory state is left with no escrow.
    pub fn load(&self) -> Result<Option<EscrowTransaction>, Error> {
        let _guard = self.lock();
        self.read_from_storage()
    }

    /// Re-reads storage, e.g. after another process changed it. Same
    /// contract as [`load`](Self::load).
    pub fn refresh(&self) -> Result<Option<EscrowTransaction>, Error> {
        let _guard = self.lock();
        tracing::debug!(key = %self.config.storage_key, "refreshing escrow from storage");
        self.read_from_storage()
    }

    /// Places a new escrow in `in_escrow`, replacing any existing record.
    pub fn create(&self, input: NewEscrow) -> Result<EscrowTransaction, Error> {
        let record = {
            let _guard = self.lock();

            let amount = match input.validate() {
                Ok(amount) => amount,
                Err(err) => {
                    tracing::warn!(error = %err, "rejected escrow input");
                    return Err(self.record_error(err));
                }
            };

            let now = self.clock.now();
            let record = EscrowTransaction {
                id: new_escrow_id(now),
                buyer_id: input.buyer_id,
                seller_id: input.seller_id,
                account_id: input.account_id,
                listing_title: input.listing_title,
                amount,
                status: EscrowStatus::InEscrow,
                timestamp: now.timestamp_millis(),
                created_at: now,
                updated_at: now,
            };

            if let Some(existing) = self.escrow() {
                tracing::warn!(
                    escrow_id = %existing.id,
                    status = %existing.status,
                    "replacing existing escrow"
                );
            }

            self.persist(&record)?;
            self.state.send_modify(|state| {
                state.escrow = Some(record.clone());
                state.error = None;
            });
            tracing::info!(
                escrow_id = %record.id,
                amount = %record.amount,
                listing = %record.listing_title,
                "escrow created"
            );
            record
        };

        self.notify_created(&record);
        Ok(record)
    }

    /// Parses `status` and applies it with [`transition`](Self::transition).
    pub fn update_status(
        &self,
        status: &str,
        reason: Option<&str>,
    ) -> Result<EscrowTransaction, Error> {
        match status.parse::<EscrowStatus>() {
            Ok(status) => self.transition(status, reason),
            Err(err) => {
                tracing::warn!(status, "rejected unknown escrow status");
                Err(self.record_error(err))
            }
        }
    }

    /// Moves the current escrow to `status`. Only `status` and `updatedAt`
    /// change; `updatedAt` always moves forward.
    pub fn transition(
        &self,
        status: EscrowStatus,
        reason: Option<&str>,
    ) -> Result<EscrowTransaction, Error> {
        let record = {
            let _guard = self.lock();

            let Some(current) = self.escrow() else {
                return Err(self.record_error(Error::NoActiveEscrow));
            };
            let from = current.status;
            if !self.config.transition_policy.allows(from, status) {
                tracing::warn!(escrow_id = %current.id, %from, to = %status, "transition rejected");
                return Err(self.record_error(Error::TransitionNotAllowed { from, to: status }));
            }

            let updated_at = self.next_update_time(current.updated_at);
            let record = EscrowTransaction {
                status,
                updated_at,
                ..current
            };

            self.persist(&record)?;
            self.state.send_modify(|state| {
                state.escrow = Some(record.clone());
                state.error = None;
            });
            tracing::info!(escrow_id = %record.id, %from, to = %status, reason = ?reason, "escrow status updated");
            record
        };

        self.notify_status_change(&record, reason);
        Ok(record)
    }

    /// Buyer confirmed delivery of the account: release funds to the seller.
    pub fn confirm_delivery(&self) -> Result<EscrowTransaction, Error> {
        self.transition(EscrowStatus::Released, None)
    }

    pub fn raise_dispute(&self, reason: &str) -> Result<EscrowTransaction, Error> {
        self.transition(EscrowStatus::Disputed, Some(reason))
    }

    pub fn refund(&self) -> Result<EscrowTransaction, Error> {
        self.transition(EscrowStatus::Refunded, None)
    }

    /// Removes the escrow from storage and memory. Safe to call repeatedly;
    /// fails only if the storage medium rejects the removal.
    pub fn clear(&self) -> Result<(), Error> {
        {
            let _guard = self.lock();
            let key = &self.config.storage_key;
            if let Err(err) = self.storage.remove(key) {
                tracing::error!(key = %key, error = %err, "failed to clear escrow");
                return Err(self.record_error(err.into()));
            }
            self.state.send_modify(|state| {
                state.escrow = None;
                state.error = None;
            });
            tracing::info!(key = %key, "escrow cleared");
        }

        self.deliver(
            "escrow cleared",
            self.notifier
                .show_info("Escrow Cleared", "Escrow data has been cleared"),
        );
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn read_from_storage(&self) -> Result<Option<EscrowTransaction>, Error> {
        let key = &self.config.storage_key;
        let outcome = match self.storage.get(key) {
            Ok(None) => Ok(None),
            Ok(Some(raw)) => match decode_record(&raw) {
                Ok(record) => Ok(Some(record)),
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "discarding invalid stored escrow");
                    if let Err(remove_err) = self.storage.remove(key) {
                        tracing::error!(
                            key = %key,
                            error = %remove_err,
                            "failed to remove invalid stored escrow"
                        );
                    }
                    Err(err)
                }
            },
            Err(err) => {
                tracing::error!(key = %key, error = %err, "failed to read escrow");
                Err(Error::from(err))
            }
        };

        self.state.send_modify(|state| {
            state.loaded = true;
            match &outcome {
                Ok(escrow) => {
                    state.escrow = escrow.clone();
                    state.error = None;
                }
                Err(err) => {
                    state.escrow = None;
                    state.error = Some(err.clone());
                }
            }
        });
        outcome
    }

    /// Writes the record under the configured key. On failure the error is
    /// recorded and memory is left untouched.
    fn persist(&self, record: &EscrowTransaction) -> Result<(), Error> {
        let key = &self.config.storage_key;
        let written = encode_record(record)
            .and_then(|raw| self.storage.set(key, &raw).map_err(Error::from));
        if let Err(err) = written {
            tracing::error!(key = %key, escrow_id = %record.id, error = %err, "failed to persist escrow");
            return Err(self.record_error(err));
        }
        Ok(())
    }

    fn record_error(&self, err: Error) -> Error {
        self.state.send_modify(|state| state.error = Some(err.clone()));
        err
    }

    fn next_update_time(&self, previous: DateTime<Utc>) -> DateTime<Utc> {
        let now = self.clock.now();
        if now > previous {
            now
        } else {
            previous + Duration::milliseconds(1)
        }
    }

    fn notify_created(&self, record: &EscrowTransaction) {
        self.deliver(
            "payment secured",
            self.notifier.show_success(
                "Payment Secured",
                &format!(
                    "{} is now held in escrow for {}",
                    record.amount, record.listing_title
                ),
            ),
        );

        if !self.config.environment.is_production() {
            let notification = self.system_notification(
                "Escrow Active",
                format!(
                    "Escrow {} for {} is now active",
                    record.id, record.listing_title
                ),
                NotificationKind::Success,
            );
            self.deliver("escrow active", self.notifier.add_notification(notification));
        }
    }

    fn notify_status_change(&self, record: &EscrowTransaction, reason: Option<&str>) {
        let toast = match record.status {
            EscrowStatus::Released => Some(
                self.notifier
                    .show_success("Funds Released", "Payment has been released to the seller"),
            ),
            EscrowStatus::Disputed => Some(
                self.notifier
                    .show_error("Dispute Raised", reason.unwrap_or(DEFAULT_DISPUTE_MESSAGE)),
            ),
            EscrowStatus::Refunded => Some(
                self.notifier
                    .show_info("Refund Processed", "Funds have been returned to the buyer"),
            ),
            EscrowStatus::InEscrow => None,
        };
        if let Some(result) = toast {
            self.deliver("status toast", result);
        }

        if !self.config.environment.is_production() {
            let kind = match record.status {
                EscrowStatus::Released => NotificationKind::Success,
                EscrowStatus::Disputed => NotificationKind::Warning,
                EscrowStatus::Refunded | EscrowStatus::InEscrow => NotificationKind::Info,
            };
            let notification = self.system_notification(
                "Escrow Status Updated",
                format!("Escrow {} is now {}", record.id, record.status.label()),
                kind,
            );
            self.deliver("status change", self.notifier.add_notification(notification));
        }
    }

    fn system_notification(
        &self,
        title: &str,
        message: String,
        kind: NotificationKind,
    ) -> SystemNotification {
        SystemNotification {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            message,
            kind,
            timestamp: self.clock.now().timestamp_millis(),
            read: false,
        }
    }

    fn deliver(&self, what: &str, result: Result<(), NotifyError>) {
        if let Err(err) = result {
            tracing::warn!(notification = what, error = %err, "failed to deliver notification");
        }
    }
}

fn new_escrow_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("escrow_{}_{}", now.timestamp_millis(), &suffix[..8])
}
