//! Linear issue tracker: domain types, the remote capability and its
//! GraphQL implementation, and the resilient facade callers use.

mod api_types;
pub mod client;
pub mod error;
pub mod facade;
pub mod remote;
pub mod types;

pub use client::LinearClient;
pub use error::{ClientErrorKind, FacadeError};
pub use facade::{CacheTtls, FacadeConfig, ResilientClient};
pub use remote::{LinearApi, RemoteError};
