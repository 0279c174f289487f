//! Common test utilities for daemon integration tests
//!
//! Shared fakes (scripted provider and backend) and helpers for building
//! a router and driving it with `oneshot`.

#![allow(unused_imports)]

pub mod helpers;
pub mod mocks;

pub use helpers::*;
pub use mocks::*;
