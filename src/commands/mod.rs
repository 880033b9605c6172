//! Command implementations for bundlepin CLI

pub mod extract;
pub mod helpers;
pub mod pin;
pub mod replace;
pub mod resolve;
pub mod version;
