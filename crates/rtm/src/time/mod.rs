// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Time arithmetic and the periodic listener timer.

mod timer;
mod value;

pub use timer::{ListenerId, Timer, TimerListener};
pub use value::TimeValue;
