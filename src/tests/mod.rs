//! tests/mod.rs

pub mod helpers;

mod delivery_tests;
mod import_tests;
