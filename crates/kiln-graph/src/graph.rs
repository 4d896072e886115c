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

//! The interned source-file graph.

use crate::parse::parse_source;
use crate::resolved::ResolvedUnit;
use kiln_core::{normalize_path, DiagnosticLevel, DiagnosticSink, MacroDefinition, SourceProvider};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

/// Index of a [`SourceNode`] inside its [`SourceGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(usize);

impl SourceId {
    /// The raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// The parsed state of one shader file.
#[derive(Debug, Clone)]
pub struct SourceNode {
    path: String,
    text: String,
    version: String,
    dependencies: Vec<SourceId>,
    inclusions: BTreeSet<SourceId>,
    null_source: bool,
}

impl SourceNode {
    fn empty(path: String, version: &str) -> Self {
        Self {
            path,
            text: String::new(),
            version: version.to_string(),
            dependencies: Vec::new(),
            inclusions: BTreeSet::new(),
            null_source: true,
        }
    }

    /// The normalized path identifying this node.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The text with directives commented out.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The `#version` argument, or the graph's default.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Files this node includes, in include order.
    pub fn dependencies(&self) -> &[SourceId] {
        &self.dependencies
    }

    /// Files that include this node.
    pub fn inclusions(&self) -> &BTreeSet<SourceId> {
        &self.inclusions
    }

    /// `true` when the backing file could not be read on the last parse.
    pub fn is_null_source(&self) -> bool {
        self.null_source
    }
}

/// Arena of [`SourceNode`]s interned by normalized path.
///
/// Edges are stored as index sets on both ends and are kept symmetric: if A
/// depends on B, B's inclusions contain A. Nodes are never removed.
#[derive(Debug)]
pub struct SourceGraph {
    nodes: Vec<SourceNode>,
    index: HashMap<String, SourceId>,
    default_version: String,
}

impl SourceGraph {
    /// Creates an empty graph. Files without `#version` get `default_version`.
    pub fn new(default_version: impl Into<String>) -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            default_version: default_version.into(),
        }
    }

    /// The version used for files without a `#version` directive.
    pub fn default_version(&self) -> &str {
        &self.default_version
    }

    /// Number of interned nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up an interned node by path.
    pub fn find(&self, path: &str) -> Option<SourceId> {
        self.index.get(&normalize_path(path)).copied()
    }

    /// Returns the node behind `id`.
    ///
    /// # Panics
    /// If `id` came from another graph.
    pub fn node(&self, id: SourceId) -> &SourceNode {
        &self.nodes[id.0]
    }

    /// Iterates over every node with its id.
    pub fn iter(&self) -> impl Iterator<Item = (SourceId, &SourceNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (SourceId(index), node))
    }

    /// Returns the node for `path`, reading and parsing it on first reference.
    ///
    /// Included files are interned recursively. The node is registered before
    /// its includes are followed, so include cycles terminate here.
    pub fn get_or_create(
        &mut self,
        path: &str,
        provider: &dyn SourceProvider,
        sink: &dyn DiagnosticSink,
    ) -> SourceId {
        let path = normalize_path(path);
        if let Some(&id) = self.index.get(&path) {
            return id;
        }

        let id = SourceId(self.nodes.len());
        self.nodes
            .push(SourceNode::empty(path.clone(), &self.default_version));
        self.index.insert(path, id);
        self.load(id, provider, sink);
        id
    }

    /// Re-reads and re-parses a node in place, replacing its dependency edges.
    pub fn reparse(&mut self, id: SourceId, provider: &dyn SourceProvider, sink: &dyn DiagnosticSink) {
        let old = std::mem::take(&mut self.nodes[id.0].dependencies);
        for dependency in old {
            self.nodes[dependency.0].inclusions.remove(&id);
        }
        self.load(id, provider, sink);
    }

    fn load(&mut self, id: SourceId, provider: &dyn SourceProvider, sink: &dyn DiagnosticSink) {
        let path = self.nodes[id.0].path.clone();
        let source = match provider.read_source(&path) {
            Ok(source) => source,
            Err(e) => {
                sink.emit(
                    DiagnosticLevel::Error,
                    &format!("Shader source {path} could not be read: {e}"),
                );
                let node = &mut self.nodes[id.0];
                node.text.clear();
                node.version = self.default_version.clone();
                node.null_source = true;
                return;
            }
        };

        let parsed = parse_source(&source);
        if parsed.version_count > 1 {
            sink.emit(
                DiagnosticLevel::Warning,
                &format!("Shader source {path} contains multiple #version statements!"),
            );
        }
        if parsed.version.is_none() {
            sink.emit(
                DiagnosticLevel::Debug,
                &format!("Shader source {path} contains no #version statement!"),
            );
        }

        {
            let node = &mut self.nodes[id.0];
            node.text = parsed.text;
            node.version = parsed
                .version
                .unwrap_or_else(|| self.default_version.clone());
            node.null_source = false;
        }

        for include in &parsed.includes {
            let dependency = self.get_or_create(include, provider, sink);
            self.add_dependency(id, dependency);
        }
        log::trace!(
            "Parsed shader source {path} ({} includes)",
            self.nodes[id.0].dependencies.len()
        );
    }

    fn add_dependency(&mut self, from: SourceId, to: SourceId) {
        let node = &mut self.nodes[from.0];
        if !node.dependencies.contains(&to) {
            node.dependencies.push(to);
        }
        self.nodes[to.0].inclusions.insert(from);
    }

    /// Orders every node reachable from `entry` so that dependencies come
    /// before the files including them.
    ///
    /// Each node is ranked by the deepest include path reaching it and the
    /// order is a stable sort by descending rank over discovery order. A node
    /// reached again no deeper than before is not walked twice. Each include
    /// edge closing a cycle is reported once and only that branch is cut.
    pub fn flatten(&self, entry: SourceId, sink: &dyn DiagnosticSink) -> Vec<SourceId> {
        let mut walk = FlattenWalk::default();
        self.visit(entry, 0, None, &mut walk, sink);

        let FlattenWalk { depths, mut discovery, .. } = walk;
        discovery.sort_by_key(|id| std::cmp::Reverse(depths[id]));
        discovery
    }

    fn visit(
        &self,
        id: SourceId,
        depth: usize,
        includer: Option<SourceId>,
        walk: &mut FlattenWalk,
        sink: &dyn DiagnosticSink,
    ) {
        let previous = match walk.depths.get(&id) {
            Some(&recorded) => Some(recorded),
            None => {
                walk.discovery.push(id);
                None
            }
        };
        walk.depths.insert(id, previous.map_or(depth, |recorded| recorded.max(depth)));

        if walk.active.contains(&id) {
            if walk.reported_cycles.insert((includer, id)) {
                sink.emit(
                    DiagnosticLevel::Error,
                    &format!(
                        "Shader source file {} contains cyclical dependency!",
                        self.nodes[id.0].path
                    ),
                );
            }
            return;
        }
        // Everything below was already ranked from a path at least this deep.
        if previous.is_some_and(|recorded| recorded >= depth) {
            return;
        }

        walk.active.insert(id);
        for &dependency in &self.nodes[id.0].dependencies {
            self.visit(dependency, depth + 1, Some(id), walk, sink);
        }
        walk.active.remove(&id);
    }

    /// Returns `seeds` plus every node that transitively includes one of them.
    pub fn includers_closure(&self, seeds: impl IntoIterator<Item = SourceId>) -> BTreeSet<SourceId> {
        let mut closure = BTreeSet::new();
        let mut queue: VecDeque<SourceId> = seeds.into_iter().collect();
        while let Some(id) = queue.pop_front() {
            if closure.insert(id) {
                queue.extend(self.nodes[id.0].inclusions.iter().copied());
            }
        }
        closure
    }

    /// Flattens `entry` and assembles the text handed to the compiler.
    pub fn resolve(
        &self,
        entry: SourceId,
        shared_header: &str,
        macros: &[MacroDefinition],
        sink: &dyn DiagnosticSink,
    ) -> ResolvedUnit {
        let order = self.flatten(entry, sink);
        ResolvedUnit::assemble(
            self.nodes[entry.0].version(),
            shared_header,
            macros,
            order.iter().map(|&id| {
                let node = &self.nodes[id.0];
                (node.path(), node.text())
            }),
        )
    }
}

/// Bookkeeping for one [`SourceGraph::flatten`] traversal.
#[derive(Debug, Default)]
struct FlattenWalk {
    depths: HashMap<SourceId, usize>,
    discovery: Vec<SourceId>,
    active: HashSet<SourceId>,
    reported_cycles: HashSet<(Option<SourceId>, SourceId)>,
}
