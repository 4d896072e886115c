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

//! The queue of changed shader paths shared between watchers and the repository.

use crossbeam_channel::{Receiver, Sender};
use kiln_core::normalize_path;
use std::collections::BTreeSet;

/// Producer side of a [`ChangeQueue`].
///
/// Cloneable and `Send`, so filesystem callbacks and tools running on other
/// threads can report changes.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: Sender<String>,
}

impl ChangeNotifier {
    /// Reports that the shader file at `path` changed.
    ///
    /// The path is normalized before being queued. Returns `false` if the
    /// queue has been dropped.
    pub fn notify(&self, path: &str) -> bool {
        let normalized = normalize_path(path);
        if normalized.is_empty() {
            return true;
        }
        self.sender.send(normalized).is_ok()
    }
}

/// Consumer side of the change queue, owned by the repository.
#[derive(Debug)]
pub struct ChangeQueue {
    sender: Sender<String>,
    receiver: Receiver<String>,
}

impl Default for ChangeQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeQueue {
    /// Creates an empty, unbounded queue.
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    /// Returns a new producer handle for this queue.
    pub fn notifier(&self) -> ChangeNotifier {
        ChangeNotifier {
            sender: self.sender.clone(),
        }
    }

    /// Returns `true` if nothing is waiting in the queue.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Takes every queued path without blocking, deduplicated.
    pub fn drain(&self) -> BTreeSet<String> {
        self.receiver.try_iter().collect()
    }
}
