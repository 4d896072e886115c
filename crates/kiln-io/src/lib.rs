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

//! # Kiln IO
//!
//! Storage and change-detection services for the shader pipeline.
//!
//! - [`FsSourceProvider`] and [`MemorySourceProvider`] implement
//!   [`kiln_core::SourceProvider`] over a directory and over an in-memory map.
//! - [`ChangeQueue`] is the thread-safe queue of changed shader paths that the
//!   repository drains once per frame.
//! - [`DirectoryWatcher`] feeds that queue from filesystem notifications.

#![warn(missing_docs)]

pub mod changes;
pub mod fs;
pub mod memory;
pub mod watcher;

pub use changes::{ChangeNotifier, ChangeQueue};
pub use fs::FsSourceProvider;
pub use memory::MemorySourceProvider;
pub use watcher::{DirectoryWatcher, WatchError};
