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

//! # Kiln Infra
//!
//! Concrete [`kiln_core::ProgramDevice`] implementations.
//!
//! The [`HeadlessDevice`] runs without a GPU. It validates shader text with a
//! small rule set, reports driver-style compile logs and records every call it
//! receives, which makes it the device used by the tools and the test suites.

#![warn(missing_docs)]

pub mod headless;

pub use headless::{DeviceCall, HeadlessDevice, LogFormat};
