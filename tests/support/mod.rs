#![allow(dead_code)]

pub mod fixture;

pub use fixture::{group_ids, Platform};

pub fn detector_binary() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_BIN_EXE_detector"))
}
