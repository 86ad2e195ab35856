//! Capture pipeline for sitesnap.
//!
//! This crate provides the screenshot capture seam: a `Capturer` trait plus
//! the headless Chromium implementation the server drives on cache misses.

pub mod capture;

pub use capture::{CaptureError, CaptureOptions, Capturer, ChromiumCapturer};
