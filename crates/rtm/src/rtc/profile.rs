// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::port::PortProfile;
use crate::util::NVList;

/// Identity and ports of a component.
#[derive(Debug, Clone, Default)]
pub struct ComponentProfile {
    pub instance_name: String,
    pub type_name: String,
    pub description: String,
    pub version: String,
    pub vendor: String,
    pub category: String,
    pub port_profiles: Vec<PortProfile>,
    pub properties: NVList,
}
