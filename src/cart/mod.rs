//! Cart Engine: one cart per user, reconciled against the live catalog on every read.

mod engine;
mod error;
mod locks;
mod model;

pub use engine::CartEngine;
pub use error::{CartError, CartResult};
pub use locks::UserLocks;
pub use model::{Cart, CartLine, CartView, LineKey, ProductRef, Reconciled, ResolvedCartLine};
