//! Error handling foundation for parley.
//!
//! Only the `Result` alias lives here. Each crate defines its own error enums
//! and layers context onto them with rootcause's `.context()` as they cross
//! crate boundaries.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
