//! Wire format shared between the kernel-side tracer and user space.

#![cfg_attr(not(any(feature = "user", test)), no_std)]

pub mod event;

#[cfg(any(feature = "user", test))]
pub mod decode;
#[cfg(any(feature = "user", test))]
pub mod error;

pub use event::*;
