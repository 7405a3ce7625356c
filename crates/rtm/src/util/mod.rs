// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Small helpers shared across the runtime.

pub mod nvutil;
pub mod string_util;

pub use nvutil::{NVList, NameValue, NvValue};
