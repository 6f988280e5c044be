// src/engine/toolkit.rs

//! Built-in sandboxed file actions.
//!
//! These replace raw filesystem utilities (which the allow-list refuses):
//! every path is taken relative to the module root and may not leave it.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use globset::{Glob, GlobMatcher};
use tracing::{debug, info, warn};

use crate::engine::collaborators::{NativeActionRequest, NativeToolkit};
use crate::exec::{ControlEvent, EventSink};
use crate::types::BoxFuture;

#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinToolkit;

impl NativeToolkit for BuiltinToolkit {
    fn format_extract<'a>(
        &'a self,
        request: NativeActionRequest<'a>,
        sink: &'a mut dyn EventSink,
    ) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move { no_codec("format_extract", request, sink) })
    }

    fn format_convert<'a>(
        &'a self,
        request: NativeActionRequest<'a>,
        sink: &'a mut dyn EventSink,
    ) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move { no_codec("format_convert", request, sink) })
    }

    fn validate_files<'a>(
        &'a self,
        request: NativeActionRequest<'a>,
        sink: &'a mut dyn EventSink,
    ) -> BoxFuture<'a, Result<bool>> {
        let root = request.module_root.to_path_buf();
        let patterns = request.args.to_vec();
        Box::pin(async move {
            let report = tokio::task::spawn_blocking(move || validate_files(&root, &patterns))
                .await
                .context("validate_files worker panicked")??;

            for pattern in &report.unmatched {
                sink.error(format!("no file matches '{pattern}'"));
            }
            let ok = report.unmatched.is_empty();
            sink.on_event(ControlEvent::Print {
                message: format!(
                    "validated {} file(s) against {} pattern(s)",
                    report.matched_files,
                    report.patterns
                ),
                color: Some(if ok { "green" } else { "red" }.to_string()),
                newline: true,
            });
            Ok(ok)
        })
    }

    fn rename_folders<'a>(
        &'a self,
        request: NativeActionRequest<'a>,
        sink: &'a mut dyn EventSink,
    ) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move { rename_folders(request.module_root, request.args, sink) })
    }
}

fn no_codec(action: &str, request: NativeActionRequest<'_>, sink: &mut dyn EventSink) -> Result<bool> {
    debug!(action, module = %request.module_id, "no format codec configured");
    sink.error(format!(
        "{action}: no extractor is configured for module '{}'",
        request.module_id
    ));
    Ok(false)
}

/// Outcome of a `validate_files` walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub patterns: usize,
    pub matched_files: usize,
    /// Patterns that matched nothing.
    pub unmatched: Vec<String>,
}

/// Check that each glob pattern (relative to `root`) matches at least one
/// file.
pub fn validate_files(root: &Path, patterns: &[String]) -> Result<ValidationReport> {
    if patterns.is_empty() {
        bail!("validate_files needs at least one glob pattern");
    }
    let matchers: Vec<GlobMatcher> = patterns
        .iter()
        .map(|pat| {
            Glob::new(pat)
                .map(|glob| glob.compile_matcher())
                .with_context(|| format!("invalid glob pattern: {pat}"))
        })
        .collect::<Result<_>>()?;

    let mut hits = vec![0usize; matchers.len()];
    let mut matched_files = 0;
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = fs::read_dir(&dir).with_context(|| format!("reading {}", dir.display()))?;
        for entry in entries {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let path = entry.path();
            // Never follow links; they can loop or point outside `root`.
            if file_type.is_symlink() {
                debug!(path = %path.display(), "skipping symlink");
                continue;
            }
            if file_type.is_dir() {
                stack.push(path);
                continue;
            }
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            let rel_str = rel.to_string_lossy().replace('\\', "/");
            let mut any = false;
            for (matcher, count) in matchers.iter().zip(hits.iter_mut()) {
                if matcher.is_match(&rel_str) {
                    *count += 1;
                    any = true;
                }
            }
            if any {
                matched_files += 1;
            }
        }
    }

    let unmatched = patterns
        .iter()
        .zip(hits)
        .filter(|(_, count)| *count == 0)
        .map(|(pat, _)| pat.clone())
        .collect();

    Ok(ValidationReport {
        patterns: patterns.len(),
        matched_files,
        unmatched,
    })
}

/// Apply `from=to` renames inside `root`.
///
/// A pair whose source is gone but whose target exists counts as already
/// done. Any refused or failed pair makes the action fail; the remaining
/// pairs are still attempted.
pub fn rename_folders(root: &Path, pairs: &[String], sink: &mut dyn EventSink) -> Result<bool> {
    if pairs.is_empty() {
        bail!("rename_folders needs at least one from=to pair");
    }

    let mut ok = true;
    for pair in pairs {
        let Some((from, to)) = pair.split_once('=') else {
            sink.error(format!("rename_folders: expected from=to, got '{pair}'"));
            ok = false;
            continue;
        };
        let (Some(src), Some(dst)) = (contained(root, from.trim()), contained(root, to.trim())) else {
            sink.error(format!("rename_folders: '{pair}' escapes the module directory"));
            ok = false;
            continue;
        };

        match (src.exists(), dst.exists()) {
            (false, true) => {
                debug!(from = %src.display(), to = %dst.display(), "already renamed");
            }
            (false, false) => {
                sink.warning(format!("rename_folders: '{}' does not exist", from.trim()));
                ok = false;
            }
            (true, true) => {
                sink.error(format!("rename_folders: '{}' already exists", to.trim()));
                ok = false;
            }
            (true, false) => match move_dir(&src, &dst) {
                Ok(()) => info!(from = %src.display(), to = %dst.display(), "renamed"),
                Err(err) => {
                    warn!(from = %src.display(), to = %dst.display(), error = %err, "rename failed");
                    sink.error(format!("rename_folders: '{pair}' failed: {err:#}"));
                    ok = false;
                }
            },
        }
    }
    Ok(ok)
}

fn move_dir(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::rename(src, dst)
        .with_context(|| format!("renaming {} to {}", src.display(), dst.display()))
}

/// `root.join(rel)` if `rel` is relative and never climbs above `root`.
fn contained(root: &Path, rel: &str) -> Option<PathBuf> {
    if rel.is_empty() {
        return None;
    }
    let rel = Path::new(rel);
    let mut out = root.to_path_buf();
    for component in rel.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if out == root { None } else { Some(out) }
}
