//! Domain types and models

pub mod member;
pub mod portal;
pub mod serde_helpers;
pub mod token;

pub use member::{sanitize_member_id, MemberId, MemberIdPolicy};
pub use portal::PortalAddress;
pub use token::{PreIssuedAuth, TokenGrant, TokenRecord};
