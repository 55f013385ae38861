//! Release watching: the check pipeline and its collaborators
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Scheduler  │────▶│   Checker   │────▶│ Dispatcher  │
//! │ (interval)  │     │(fetch/parse)│     │  (notify)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │                   │
//!                            ▼                   ▼
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │    Store    │◀────│  Notifier   │
//!                     │  (SQLite)   │     │ (transport) │
//!                     └─────────────┘     └─────────────┘
//! ```

pub mod checker;
pub mod notify;
pub mod scheduler;

pub use checker::{CheckError, CheckReport, ReleaseChecker};
pub use notify::{LogNotifier, NotificationDispatcher, Notifier, NotifyError};
