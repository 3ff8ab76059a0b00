//! On-chain and third-party collaborators used by the decision pipeline
//!
//! - `authority`: SPL mint/freeze authority lookup over RPC
//! - `rugcheck`: rug-check report verdict over HTTP
//! - `age`: quick rug-pull heuristic from the earliest mint activity
//! - `resolver`: transaction signature to asset resolution

mod age;
mod authority;
mod resolver;
mod rugcheck;

pub use age::*;
pub use authority::*;
pub use resolver::*;
pub use rugcheck::*;
