//! Core type definitions.
//!
//! Target classification, address arithmetic and subnet expansion are pure
//! functions over these types; nothing here touches the network or disk.

pub mod address;
mod session_id;
pub mod subnet;
mod target;

pub use address::{AddressFamily, AddressRange};
pub use session_id::{SessionId, SessionIdError};
pub use subnet::{expand, subnet_range};
pub use target::{
    apex_domain, classify, parse_cidr, parse_ipv4, TargetKind, TargetRecord, TargetType,
};
