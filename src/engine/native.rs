// src/engine/native.rs

//! `script_type = "native"`: built-in actions selected by id.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{ModuleInfo, OperationSpec};
use crate::engine::collaborators::{Collaborators, NativeActionRequest};
use crate::errors::{EngineError, Result};
use crate::exec::ExecutionIo;
use crate::types::NativeActionId;

/// Native actions may only come from catalogs under a trusted root.
///
/// Both sides are canonicalized; anything that cannot be (no recorded
/// source, missing file) is refused.
pub fn check_provenance(operation: &OperationSpec, trusted_roots: &[PathBuf]) -> Result<()> {
    let name = operation.display_name();
    let Some(source) = operation.source_file.as_deref() else {
        return Err(EngineError::SecurityRejected(format!(
            "native operation '{name}' has no recorded catalog file"
        )));
    };
    let source = fs::canonicalize(source).map_err(|e| {
        EngineError::SecurityRejected(format!(
            "native operation '{name}': cannot resolve {}: {e}",
            source.display()
        ))
    })?;

    let trusted = trusted_roots
        .iter()
        .filter_map(|root| fs::canonicalize(root).ok())
        .any(|root| source.starts_with(&root));
    if !trusted {
        return Err(EngineError::SecurityRejected(format!(
            "native operation '{name}' was loaded from {}, which is outside the trusted operation roots",
            source.display()
        )));
    }
    debug!(operation = %name, source = %source.display(), "native provenance ok");
    Ok(())
}

/// Run one native action with already-resolved arguments.
pub async fn run_native_action(
    action: NativeActionId,
    module: &ModuleInfo,
    args: &[String],
    collaborators: &Collaborators,
    io: &mut ExecutionIo<'_>,
) -> Result<bool> {
    info!(%action, module = %module.id, ?args, "running native action");
    let request = NativeActionRequest {
        module_id: &module.id,
        module_root: &module.root,
        args,
    };
    let toolkit = collaborators.toolkit.as_ref();

    let ok = match action {
        NativeActionId::DownloadModuleGit => download_module_git(module, args, collaborators, io).await?,
        NativeActionId::DownloadModuleRegistry => {
            download_module_registry(args, collaborators, io).await?
        }
        NativeActionId::FormatExtract => toolkit.format_extract(request, io.sink).await?,
        NativeActionId::FormatConvert => toolkit.format_convert(request, io.sink).await?,
        NativeActionId::ValidateFiles => toolkit.validate_files(request, io.sink).await?,
        NativeActionId::RenameFolders => toolkit.rename_folders(request, io.sink).await?,
    };
    Ok(ok)
}

/// `args[0]` names the module to install (default: the running module).
/// The URL comes from the registry; an optional `args[1]` overrides it.
async fn download_module_git(
    module: &ModuleInfo,
    args: &[String],
    collaborators: &Collaborators,
    io: &mut ExecutionIo<'_>,
) -> Result<bool> {
    let target = args.first().map(String::as_str).unwrap_or(&module.id);
    let url = args
        .get(1)
        .cloned()
        .or_else(|| collaborators.registry.module_url(target))
        .ok_or_else(|| {
            EngineError::InvalidInput(format!("no download URL is registered for module '{target}'"))
        })?;

    let destination = collaborators.registry.module_root(target);
    if is_populated(&destination) {
        io.sink.warning(format!(
            "module '{target}' is already installed at {}",
            destination.display()
        ));
        return Ok(true);
    }
    create_parent(&destination)?;

    Ok(collaborators.git.clone_module(&url, &destination, io).await)
}

/// `args[0]` is the registry repository URL; an existing checkout is
/// updated instead of cloned.
async fn download_module_registry(
    args: &[String],
    collaborators: &Collaborators,
    io: &mut ExecutionIo<'_>,
) -> Result<bool> {
    let registry_root = collaborators.registry.registry_root();

    if registry_root.join(".git").exists() {
        return Ok(collaborators.git.update(&registry_root, io).await);
    }

    let Some(url) = args.first() else {
        return Err(EngineError::InvalidInput(
            "download_module_registry needs the registry URL as its first argument".to_string(),
        ));
    };
    if is_populated(&registry_root) {
        warn!(root = %registry_root.display(), "registry exists but is not a git checkout");
        io.sink.warning(format!(
            "{} exists and is not a git checkout; leaving it alone",
            registry_root.display()
        ));
        return Ok(false);
    }
    create_parent(&registry_root)?;

    Ok(collaborators.git.clone_module(url, &registry_root, io).await)
}

fn is_populated(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
