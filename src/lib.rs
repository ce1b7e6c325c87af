//! Property-based testing built around an integrated generation-and-shrinking
//! engine.
//!
//! Large values are generated from small ones, and the engine records where
//! every small value came from: each generation site is a node in a rose
//! tree, holding the atom it drew, the generator that ran there, and the
//! value currently accepted for it. When a property fails, sub-values are
//! shrunk individually, innermost first, without replaying the whole
//! generation.
//!
//! ```
//! use briar::*;
//!
//! let property = for_all(Gen::vec_of(Gen::int_range(0, 100), 10), |items| {
//!     items.iter().sum::<i64>() <= 100 * items.len() as i64
//! });
//! assert!(property.run(&Config::default().with_seed(42)).is_pass());
//! ```

pub mod data;
pub mod error;
pub mod gen;
pub mod property;
pub mod random;
pub mod rose;
pub mod shrink;

// Re-export the main types
pub use data::*;
pub use error::*;
pub use gen::*;
pub use property::*;
pub use random::*;
pub use rose::*;
pub use shrink::*;
