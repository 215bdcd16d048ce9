//! Script build task
//!
//! Ordered entry list → one concatenated bundle → parse, transpile to the
//! configured target, minify and print with oxc → `main.min.js` plus an
//! optional source map. Runtime helpers needed by lowered syntax are written
//! in front of the bundle (see [`helpers`]).

pub mod helpers;

use crate::build::discovery::resolve_sources;
use crate::build::TaskContext;
use crate::error::{CompileError, TaskError};
use crate::output::{slash_path, write_artifact, Artifact, MapComment};
use crate::reload::ReloadEvent;
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_diagnostics::OxcDiagnostic;
use oxc_minifier::{CompressOptions, MangleOptions, Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_sourcemap::ConcatSourceMapBuilder;
use oxc_span::SourceType;
use oxc_transformer::{
    ESTarget, HelperLoaderMode, HelperLoaderOptions, TransformOptions, Transformer,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Source name used in maps when several files are concatenated.
const BUNDLE_SOURCE_NAME: &str = "concat.js";

/// One input file's position inside a [`Bundle`].
#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    name: String,
    start: usize,
}

/// Newline-joined script sources that remember where each file begins.
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    text: String,
    segments: Vec<Segment>,
}

impl Bundle {
    /// Concatenate `(name, code)` pairs in order, separated by newlines.
    pub fn concat<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut bundle = Bundle::default();
        for (name, code) in parts {
            if !bundle.segments.is_empty() {
                bundle.text.push('\n');
            }
            bundle.segments.push(Segment { name, start: bundle.text.len() });
            bundle.text.push_str(&code);
        }
        bundle
    }

    /// The concatenated source text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of files in the bundle.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check whether the bundle holds no files.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Name recorded in the source map for this bundle.
    pub fn source_name(&self) -> &str {
        match self.segments.as_slice() {
            [only] => &only.name,
            _ => BUNDLE_SOURCE_NAME,
        }
    }

    /// Map a byte offset in the bundle back to `(file, line, column)`, 1-indexed.
    pub fn locate(&self, offset: usize) -> Option<(&str, usize, usize)> {
        let segment = self.segments.iter().rev().find(|s| s.start <= offset)?;
        let before = self.text.get(segment.start..offset)?;
        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(newline) => before[newline + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };
        Some((&segment.name, line, column))
    }

    /// Turn an oxc diagnostic into a compile error pointing at the original file.
    fn compile_error(&self, diagnostic: &OxcDiagnostic) -> CompileError {
        let message = diagnostic.to_string();
        let offset = diagnostic.labels.as_ref().and_then(|labels| labels.first()).map(|l| l.offset());

        match offset.and_then(|o| self.locate(o)) {
            Some((file, line, column)) => CompileError::with_location(file, line, column, message),
            None => CompileError::new(self.source_name(), message),
        }
    }
}

/// How a bundle is compiled.
#[derive(Debug, Clone)]
pub struct ScriptOptions {
    /// Output language level, e.g. "es2015"
    pub target: String,
    /// Compress, mangle and print without whitespace
    pub minify: bool,
    /// Produce a source map
    pub sourcemaps: bool,
}

/// Build the configured script bundle.
pub async fn build_scripts(ctx: &TaskContext) -> Result<Vec<PathBuf>, TaskError> {
    let config = &ctx.config().scripts;
    let files = resolve_sources(ctx.project_root(), &config.entries)?;
    if files.is_empty() {
        return Err(TaskError::NoSources("script".to_string()));
    }

    let mut parts = Vec::with_capacity(files.len());
    for file in &files {
        let code = tokio::fs::read_to_string(file).await.map_err(|e| TaskError::io(file, e))?;
        parts.push((slash_path(ctx.relative(file)), code));
    }
    let bundle = Bundle::concat(parts);

    let options = ScriptOptions {
        target: config.target.clone(),
        minify: config.minify,
        sourcemaps: config.sourcemaps,
    };
    let artifact = compile_bundle(&bundle, &options).map_err(TaskError::Script)?;

    let out_dir = ctx.resolve_path(&config.out_dir);
    let written = write_artifact(&out_dir, &config.output, &artifact, MapComment::Js).await?;

    tracing::debug!("scripts: {} file(s) -> {}", bundle.len(), written[0].display());
    ctx.notifier().notify(ReloadEvent::Reload);
    Ok(written)
}

/// Parse, transpile, optionally minify, and print a bundle.
///
/// The minifier targets the same language level as the transpiler so it never
/// folds lowered code back into newer syntax.
pub fn compile_bundle(bundle: &Bundle, options: &ScriptOptions) -> Result<Artifact, CompileError> {
    let allocator = Allocator::default();
    let source_name = bundle.source_name().to_string();

    let target = ESTarget::from_str(&options.target).map_err(|e| {
        CompileError::new(&source_name, format!("invalid script target '{}': {}", options.target, e))
    })?;

    let parsed = Parser::new(&allocator, bundle.text(), SourceType::cjs()).parse();
    if let Some(error) = parsed.errors.first() {
        return Err(bundle.compile_error(error));
    }
    let mut program = parsed.program;
    let strict = program.directives.iter().any(|d| d.directive.as_str() == "use strict");

    let mut transform_options = TransformOptions::from(target);
    transform_options.helper_loader =
        HelperLoaderOptions { mode: HelperLoaderMode::External, ..HelperLoaderOptions::default() };

    let (symbols, scopes) =
        SemanticBuilder::new().build(&program).semantic.into_symbol_table_and_scope_tree();
    let transformed = Transformer::new(&allocator, Path::new(&source_name), &transform_options)
        .build_with_symbols_and_scopes(symbols, scopes, &mut program);
    if let Some(error) = transformed.errors.first() {
        return Err(bundle.compile_error(error));
    }

    // only place the transformer reports which helpers it called
    #[allow(deprecated)]
    let used: Vec<&'static str> = transformed.helpers_used.keys().map(|h| h.name()).collect();
    let prelude = helpers::prelude(used, strict)
        .map_err(|message| CompileError::new(&source_name, message))?;

    let symbol_table = if options.minify {
        let minifier_options = MinifierOptions {
            mangle: Some(MangleOptions::default()),
            compress: Some(CompressOptions { target, ..CompressOptions::default() }),
        };
        Minifier::new(minifier_options).build(&allocator, &mut program).symbol_table
    } else {
        None
    };

    let printed = Codegen::new()
        .with_options(CodegenOptions {
            minify: options.minify,
            source_map_path: options.sourcemaps.then(|| PathBuf::from(&source_name)),
            ..CodegenOptions::default()
        })
        .with_symbol_table(symbol_table)
        .build(&program);

    let Some(prelude) = prelude else {
        return Ok(Artifact { code: printed.code, map: printed.map.map(|map| map.to_json_string()) });
    };

    let shift = u32::try_from(prelude.matches('\n').count()).unwrap_or(u32::MAX);
    let map = printed.map.map(|map| {
        ConcatSourceMapBuilder::from_sourcemaps(&[(&map, shift)]).into_sourcemap().to_json_string()
    });
    Ok(Artifact { code: prelude + &printed.code, map })
}
