//! # pixferry
//!
//! *Ferry pixels between the GUI, the image-processing library and the GPU.*
//!
//! Three layers of an imaging application rarely agree on how a pixel looks.
//! The display toolkit wants packed RGB. The processing library hands out
//! gray, BGR or BGRA with a row stride. The GPU wants packed RGB in
//! device-mapped memory that carries no metadata of its own. This crate
//! converts between them without corrupting channels or leaking buffers.
//!
//! ## Conversions
//!
//! - [`to_display`] — processing → display (gray replicated, BGR(A) reversed,
//!   alpha dropped)
//! - [`from_display`] / [`from_display_in_place`] — display → BGR processing,
//!   in place
//! - [`to_device`] — processing → device, through an injected
//!   [`DeviceAllocator`]
//! - [`from_device`] — device → BGR processing
//!
//! Device buffers live in a [`DeviceImage`] guard that releases them through
//! the allocator that produced them. [`HostMappedAllocator`] is a host-memory
//! allocator with byte accounting, for unified-memory devices and tests.
//!
//! ## Row kernels
//!
//! Channel reordering runs on [`garb`]'s SIMD kernels. The [`swizzle`]
//! module adds gray → RGB expansion (x86-64 AVX2 with scalar fallback).
//!
//! ## Feature flags
//!
//! - **`std`** (default) — links `std` and enables it in the dependencies.
//!   Without it the crate is `no_std` + `alloc`.
//! - **`rgb`** — typed pixel access on [`DisplayImage`] via `rgb::Rgb<u8>`.
//! - **`imgref`** — conversions to and from [`imgref`] images. Implies `rgb`.

#![no_std]
#![forbid(unsafe_code)]

#[cfg(any(test, feature = "std"))]
extern crate std;

extern crate alloc;

mod convert;
mod device;
mod error;
mod image;
pub mod swizzle;

pub use convert::*;
pub use device::*;
pub use error::*;
pub use image::{ChannelLayout, DisplayImage, ProcessingImage, ProcessingView};

#[cfg(feature = "imgref")]
pub mod imgref;
