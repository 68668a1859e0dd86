pub mod clock;
mod codec;
pub mod config;
mod dto;
mod engine;
mod error;
pub mod notify;
mod runner;
mod stores;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{decode_record, encode_record};
pub use config::{ConfigError, Environment, StoreConfig, TransitionPolicy};
pub use dto::{status_label, EscrowStatus, EscrowTransaction, NewEscrow};
pub use engine::{EscrowState, EscrowStore};
pub use error::{Error, StorageError};
pub use notify::{NoopNotifier, NotificationLog, Notifier, TracingNotifier};
pub use runner::{run, Command, USAGE};
pub use stores::{FileStorage, MemoryStorage, Storage};
