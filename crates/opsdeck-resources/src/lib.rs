//! Opsdeck Resources - HTTP page sources for the dashboard lists
//!
//! Each resource implements [`opsdeck_query::PageSource`] over a shared
//! [`ApiClient`]:
//! - [`LogsSource`]: activity logs, offset-addressed
//! - [`TransfersSource`]: transfer requests with approve/reject actions
//! - [`UsersSource`]: registered users
//!
//! Tenant host and credentials come from a [`SessionProvider`].

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod client;
pub mod logs;
pub mod params;
pub mod session;
pub mod transfers;
pub mod users;

pub use client::ApiClient;
pub use logs::{LogEntry, LogStats, LogsSource};
pub use params::PaginationInfo;
pub use session::{SessionProvider, StaticSession, TenantConfig};
pub use transfers::{ExtractedData, TransferRequest, TransferStats, TransferStatus, TransfersSource};
pub use users::{RegisteredUser, UserStats, UsersSource};
