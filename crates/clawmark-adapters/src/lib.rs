// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery adapters for Clawmark.
//!
//! Each module implements [`clawmark_core::DeliveryAdapter`] for one
//! external system and exposes a zero-sized factory. HTTP adapters share a
//! 10 second request timeout; the SMTP adapter bounds each session at 15
//! seconds.

pub mod catalog;
pub mod email;
pub mod format;
pub mod github;
pub mod gitlab;
pub mod http;
pub mod lark;
pub mod slack;
pub mod telegram;
pub mod webhook;

pub use catalog::AdapterCatalog;
pub use http::truncate_chars;
