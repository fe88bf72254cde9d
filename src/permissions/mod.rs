//! Administrator checks for the destination channel.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let authority = AdminAuthority::new(channel, channel_id, ttl, owner_ids);
//!
//! if authority.is_admin(user_id).await? {
//!     // ...
//! }
//! ```

mod authority;

pub use authority::AdminAuthority;
