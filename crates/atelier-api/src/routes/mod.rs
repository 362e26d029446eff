//! # API Route Modules
//!
//! | Prefix            | Module       | Domain                       |
//! |-------------------|--------------|------------------------------|
//! | `/api/art/*`      | [`listings`] | Artwork registry             |
//! | `/api/escrow/*`   | [`escrows`]  | Escrow lifecycle, arbitration |

pub mod escrows;
pub mod listings;
