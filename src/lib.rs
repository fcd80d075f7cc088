//! Client-side calendar synchronization: an iCalendar (RFC 5545 + RFC 7986
//! + RFC 9074) codec plus a pending-operation store and bidirectional sync
//! reconciler for CalDAV collections.
//!
//! CalDAV service discovery, HTTP/TLS transport, XML parsing, on-disk
//! persistence, timezone database loading, and UI remain external
//! collaborators; this crate defines the trait boundaries they plug into
//! ([`sync::RemoteAdapter`], [`store::OperationStore`], [`time::Clock`])
//! and ships only an in-memory reference adapter for tests.

pub mod codec;
pub mod config;
pub mod error;
pub mod expand;
pub mod model;
pub mod store;
pub mod sync;
pub mod time;

pub use codec::{generate_calendar, parse_calendar, ParseResult};
pub use config::CalSyncConfig;
pub use error::CalSyncError;
pub use expand::expand_rrule_with_exdates;
pub use model::{ICalAlarm, ICalDateTime, ICalEvent, RRule};
pub use store::{InMemoryOperationStore, OperationKind, OperationStore, PendingOperation};
pub use sync::{Reconciler, RemoteAdapter};
pub use time::{Clock, SystemClock};
