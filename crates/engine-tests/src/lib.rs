#![allow(dead_code)]

pub mod fakes;
pub mod snapshot;
pub mod utils;
