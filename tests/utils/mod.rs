#![allow(dead_code)] // Not every test binary uses every helper

mod assertions;
mod mocks;
mod setup;

pub use assertions::*;
pub use mocks::*;
pub use setup::*;
