//! URL handling for the crawler
//!
//! Every URL that enters the system is converted to a [`NormalizedUrl`], the
//! single identity key used by the frontier, the scheduler and the duplicate
//! checks.

mod normalize;

pub use normalize::NormalizedUrl;
