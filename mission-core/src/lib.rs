#![no_std]
#![allow(async_fn_in_trait)]

// Shared logic for the camera rig mission controller.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library. Hardware, storage, networking and time are reached
// through the traits in `io`, `log`, `link` and `clock`; the firmware and the
// emulator provide the concrete implementations.

pub mod clock;
pub mod config;
pub mod context;
pub mod dht;
pub mod environment;
pub mod illumination;
pub mod io;
pub mod link;
pub mod log;
pub mod mission;
pub mod phase;
pub mod release;
pub mod remote;
pub mod sim;
pub mod trigger;
