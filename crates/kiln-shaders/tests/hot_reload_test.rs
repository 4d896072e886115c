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

use anyhow::Result;
use kiln_core::{RepositorySettings, ShaderStage, UniformValue};
use kiln_infra::{DeviceCall, HeadlessDevice};
use kiln_io::{FsSourceProvider, MemorySourceProvider};
use kiln_shaders::{PipelineDescriptor, ProgramState, RepositoryError, ShaderRepository};
use std::sync::Arc;
use tempfile::tempdir;

const VERTEX: &str = "#version 450\nvoid main() {}\n";
const FRAGMENT: &str = "#version 450\n#include \"lighting.glsl\"\nuniform float x;\nvoid main() {}\n";
const LIGHTING: &str = "#include \"math.glsl\"\nvec3 light();\n";
const MATH: &str = "float pi();\n";

fn memory_repository() -> (ShaderRepository, Arc<HeadlessDevice>, Arc<MemorySourceProvider>) {
    let device = Arc::new(HeadlessDevice::new());
    let provider = Arc::new(MemorySourceProvider::with_files([
        ("a.vert", VERTEX),
        ("a.frag", FRAGMENT),
        ("lighting.glsl", LIGHTING),
        ("math.glsl", MATH),
    ]));
    let repo = ShaderRepository::new(device.clone(), provider.clone(), RepositorySettings::default());
    (repo, device, provider)
}

fn count(calls: &[DeviceCall], predicate: impl Fn(&DeviceCall) -> bool) -> usize {
    calls.iter().filter(|call| predicate(call)).count()
}

#[test]
fn test_update_without_changes_is_a_no_op() {
    let (mut repo, device, _) = memory_repository();
    repo.get_or_create_program("a.frag", ShaderStage::Fragment, &[]);
    device.clear_calls();

    assert_eq!(repo.update(), 0);
    assert!(device.calls().is_empty());
}

#[test]
fn test_transitive_include_change_recompiles_once_and_dirties_pipelines() -> Result<()> {
    let (mut repo, device, provider) = memory_repository();
    let vertex = repo.get_or_create_program("a.vert", ShaderStage::Vertex, &[]);
    let fragment = repo.get_or_create_program("a.frag", ShaderStage::Fragment, &[]);
    let pipeline = repo.get_or_create_pipeline(PipelineDescriptor::graphics(vertex, fragment))?;
    repo.bind_pipeline(pipeline)?;
    let old_handle = repo.program(fragment).unwrap().handle();
    let compiles_before = repo.program(fragment).unwrap().compile_count();
    device.clear_calls();

    // --- math.glsl is included by lighting.glsl, which a.frag includes ---
    provider.set("math.glsl", "float pi();\nfloat tau();\n");
    let notifier = repo.change_notifier();
    notifier.notify("math.glsl");
    notifier.notify("./math.glsl");

    assert_eq!(repo.update(), 1);
    let program = repo.program(fragment).unwrap();
    assert_eq!(program.compile_count(), compiles_before + 1);
    assert_ne!(program.handle(), old_handle);
    let driver_source = device.program_source(program.handle().unwrap()).unwrap();
    assert!(driver_source.contains("float tau();"));
    assert!(old_handle.and_then(|h| device.program_source(h)).is_none());
    assert_eq!(repo.program(vertex).unwrap().compile_count(), 1);
    assert!(repo.pipeline(pipeline).unwrap().is_dirty());

    let calls = device.calls();
    assert_eq!(count(&calls, |c| matches!(c, DeviceCall::CreateProgram { .. })), 1);

    // --- The next bind rebuilds the pipeline against the new handle ---
    repo.bind_pipeline(pipeline)?;
    let pipeline_ref = repo.pipeline(pipeline).unwrap();
    assert!(!pipeline_ref.is_dirty());
    assert_eq!(pipeline_ref.build_count(), 2);
    let handle = pipeline_ref.handle().unwrap();
    assert_eq!(
        device.attached_program(handle, ShaderStage::Fragment),
        repo.program(fragment).unwrap().handle()
    );
    assert_eq!(device.bound_pipeline(), Some(handle));
    Ok(())
}

#[test]
fn test_every_macro_variant_of_an_affected_entry_is_recompiled() {
    let (mut repo, _, provider) = memory_repository();
    let plain = repo.get_or_create_program("a.frag", ShaderStage::Fragment, &[]);
    let fog = repo.get_or_create_program(
        "a.frag",
        ShaderStage::Fragment,
        &[kiln_core::MacroDefinition::new("FOG", "1")],
    );

    provider.set("lighting.glsl", "vec3 light();\n");
    repo.change_notifier().notify("lighting.glsl");
    assert_eq!(repo.update(), 2);
    assert_eq!(repo.program(plain).unwrap().compile_count(), 2);
    assert_eq!(repo.program(fog).unwrap().compile_count(), 2);

    // The edge to math.glsl is gone, so changing it no longer affects a.frag.
    repo.change_notifier().notify("math.glsl");
    assert_eq!(repo.update(), 0);
}

#[test]
fn test_uniforms_are_replayed_after_recompilation() {
    let (mut repo, device, provider) = memory_repository();
    let fragment = repo.get_or_create_program("a.frag", ShaderStage::Fragment, &[]);
    repo.program_mut(fragment).unwrap().set_float("x", 5.0);

    // --- Break the shader: the value stays cached while Invalid ---
    provider.set("a.frag", "#version 450\nuniform float x;\n#error broken\n");
    repo.change_notifier().notify("a.frag");
    repo.update();
    assert_eq!(repo.program(fragment).unwrap().state(), ProgramState::Invalid);

    // --- Fix it: the new handle receives x = 5 without the caller re-issuing it ---
    provider.set("a.frag", FRAGMENT);
    repo.change_notifier().notify("a.frag");
    device.clear_calls();
    repo.update();

    let handle = repo.program(fragment).unwrap().handle().unwrap();
    assert_eq!(device.uniform_value(handle, "x"), Some(UniformValue::Float(5.0)));
    assert!(device.calls().iter().any(|call| matches!(
        call,
        DeviceCall::SetUniform { program, value: UniformValue::Float(v), .. } if *program == handle && *v == 5.0
    )));
}

#[test]
fn test_removed_include_becomes_a_null_source() {
    let (mut repo, _, provider) = memory_repository();
    let fragment = repo.get_or_create_program("a.frag", ShaderStage::Fragment, &[]);
    let lighting = repo.graph().find("lighting.glsl").unwrap();

    provider.remove("lighting.glsl");
    repo.change_notifier().notify("lighting.glsl");
    assert_eq!(repo.update(), 1);

    let node = repo.graph().node(lighting);
    assert!(node.is_null_source());
    assert!(node.dependencies().is_empty());
    // a.frag never calls into the header, so it still compiles without it.
    assert!(repo.program(fragment).unwrap().is_valid());
}

#[test]
fn test_changes_to_unknown_files_are_ignored() {
    let (mut repo, device, _) = memory_repository();
    repo.get_or_create_program("a.frag", ShaderStage::Fragment, &[]);
    device.clear_calls();

    repo.change_notifier().notify("unrelated.glsl");
    assert_eq!(repo.update(), 0);
    assert!(device.calls().is_empty());
}

#[test]
fn test_filesystem_sources_reload_through_the_notifier() -> Result<()> {
    // --- 1. Setup: real shader files in a temporary directory ---
    let dir = tempdir()?;
    std::fs::write(dir.path().join("a.frag"), FRAGMENT)?;
    std::fs::write(dir.path().join("lighting.glsl"), "vec3 light();\n")?;

    let device = Arc::new(HeadlessDevice::new());
    let provider = Arc::new(FsSourceProvider::new(dir.path()));
    let mut repo = ShaderRepository::new(device.clone(), provider, RepositorySettings::default());
    let fragment = repo.get_or_create_program("a.frag", ShaderStage::Fragment, &[]);
    assert!(repo.program(fragment).unwrap().is_valid());

    // --- 2. Start watching and edit a file on disk ---
    repo.start_file_watcher(dir.path())?;
    assert!(repo.is_watching());
    std::fs::write(dir.path().join("lighting.glsl"), "#error edited\n")?;

    // --- 3. Report the change explicitly so the test does not race the watcher ---
    repo.change_notifier().notify("lighting.glsl");
    assert_eq!(repo.update(), 1);
    assert!(!repo.program(fragment).unwrap().is_valid());

    repo.stop_file_watcher();
    assert!(!repo.is_watching());
    Ok(())
}

#[test]
fn test_watching_a_missing_directory_fails() {
    let (mut repo, _, _) = memory_repository();
    let dir = tempdir().unwrap();
    let err = repo.start_file_watcher(dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, RepositoryError::Watch(_)));
}
