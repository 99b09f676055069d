// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Sable Core
//!
//! Foundational crate of the Sable graphics stack. It defines the GCI
//! (Graphics Core Interface): the backend-agnostic pipeline state descriptor
//! taxonomy, the deduplicating descriptor cache, and the pipeline state
//! controller that tracks per-command-stream bindings.
//!
//! Concrete backends live in `sable-infra` and plug in through the trait
//! seams declared here.

#![warn(missing_docs)]

pub mod gci;
pub mod math;
pub mod utils;
