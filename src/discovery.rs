//! Discovery Module
//!
//! Recursively scans a directory for parsed template ASTs (`*.json`) and
//! compiles each one in its own invocation. Results come back in path order.
//!
//! With a session-scoped registry the invocations share nothing and run in
//! parallel. With the process-wide registry an import in one file is visible
//! to every file compiled after it, so files are compiled one at a time in
//! path order to keep that visibility reproducible.

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::ast::SourceLocation;
use crate::compiler::{compile, CompileOptions};
use crate::loader::{JsonFileLoader, LoadError, TemplateLoader};
use crate::registry::RegistryScope;
use crate::validate::{CompilerError, ErrorKind};

#[derive(Debug)]
pub struct CompiledFile {
    pub source: PathBuf,
    pub output: Result<String, CompilerError>,
}

/// Compile every template AST under `dir`. A failing file does not stop the
/// batch; its error is returned in place of its output.
pub fn compile_directory(dir: &Path, options: &CompileOptions) -> Vec<CompiledFile> {
    let files = find_template_files(dir);
    match options.registry_scope {
        RegistryScope::Session => files
            .into_par_iter()
            .map(|source| compile_entry(source, options))
            .collect(),
        RegistryScope::Process => files
            .into_iter()
            .map(|source| compile_entry(source, options))
            .collect(),
    }
}

fn compile_entry(source: PathBuf, options: &CompileOptions) -> CompiledFile {
    let mut file_options = options.clone();
    file_options.file_path = source.to_string_lossy().to_string();
    let output = compile_file(&source, &file_options);
    if let Err(err) = &output {
        warn!(file = %source.display(), code = err.code(), "template failed to compile");
    }
    CompiledFile { source, output }
}

fn compile_file(path: &Path, options: &CompileOptions) -> Result<String, CompilerError> {
    let template = JsonFileLoader.load(path).map_err(|e| {
        let (kind, location) = match &e {
            LoadError::Io(_) => (ErrorKind::ReadFailed, SourceLocation::default()),
            LoadError::Json(json) => (
                ErrorKind::InvalidAst,
                SourceLocation {
                    line: json.line() as u32,
                    column: json.column() as u32,
                },
            ),
        };
        CompilerError::new(kind, e.to_string(), &options.file_path, &location)
    })?;
    compile(&template, options)
}

fn find_template_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    debug!(dir = %dir.display(), count = files.len(), "discovered templates");
    files
}
