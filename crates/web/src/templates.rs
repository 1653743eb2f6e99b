use std::fmt::Write as _;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use minijinja::functions::Function;
use minijinja::value::{FunctionArgs, FunctionResult, Value, ValueKind};
use minijinja::{
    AutoEscape, Environment, ErrorKind, Output, State, UndefinedBehavior, escape_formatter,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::source::{ResourceLookup, ResourceSource};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    NotFound(String),
    #[error("template {0} is not valid utf-8")]
    Encoding(String),
    #[error("failed to compile template {alias}: {source}")]
    Compile {
        alias: String,
        #[source]
        source: minijinja::Error,
    },
    #[error("failed to render template {alias}: {source}")]
    Render {
        alias: String,
        #[source]
        source: minijinja::Error,
    },
}

/// Named functions made available inside a template.
///
/// Functions are bound when an alias is first compiled. Later calls for the
/// same alias reuse that compilation, so a different function set passed
/// afterwards is ignored.
#[derive(Clone, Default)]
pub struct TemplateFunctions {
    entries: Vec<(&'static str, Value)>,
}

impl TemplateFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F, Rv, Args>(mut self, name: &'static str, f: F) -> Self
    where
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.entries.push((name, Value::from_function(f)));
        self
    }

    fn install(&self, env: &mut Environment<'static>) {
        for (name, function) in &self.entries {
            env.add_global(*name, function.clone());
        }
    }
}

/// A parsed template, ready to execute.
pub struct CompiledTemplate {
    alias: String,
    env: Environment<'static>,
    created_at: DateTime<Utc>,
}

impl CompiledTemplate {
    fn compile(
        alias: &str,
        source: String,
        functions: &TemplateFunctions,
    ) -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_formatter(page_formatter);
        functions.install(&mut env);
        env.add_template_owned(alias.to_string(), source)
            .map_err(|source| TemplateError::Compile {
                alias: alias.to_string(),
                source,
            })?;
        Ok(Self {
            alias: alias.to_string(),
            env,
            created_at: Utc::now(),
        })
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn render_to<S: Serialize, W: io::Write>(&self, data: S, out: W) -> Result<(), TemplateError> {
        let render_err = |source| TemplateError::Render {
            alias: self.alias.clone(),
            source,
        };
        let template = self.env.get_template(&self.alias).map_err(render_err)?;
        template.render_to_write(data, out).map_err(render_err)?;
        Ok(())
    }
}

/// Prints booleans in lowercase and, under HTML auto-escaping, escapes only
/// `<>&"'` so paths in `href` and `class` attributes come out as written.
fn page_formatter(out: &mut Output, state: &State, value: &Value) -> Result<(), minijinja::Error> {
    let written = match value.kind() {
        ValueKind::Bool => out.write_str(if value.is_true() { "true" } else { "false" }),
        ValueKind::String if !value.is_safe() && matches!(state.auto_escape(), AutoEscape::Html) => {
            write_html(out, value.as_str().unwrap_or_default())
        }
        _ => return escape_formatter(out, state, value),
    };
    written.map_err(|_| minijinja::Error::new(ErrorKind::WriteFailure, "failed to write template output"))
}

fn write_html(out: &mut Output, text: &str) -> std::fmt::Result {
    let mut last = 0;
    for (idx, ch) in text.char_indices() {
        let escaped = match ch {
            '<' => "&lt;",
            '>' => "&gt;",
            '&' => "&amp;",
            '"' => "&quot;",
            '\'' => "&#x27;",
            _ => continue,
        };
        out.write_str(&text[last..idx])?;
        out.write_str(escaped)?;
        last = idx + 1;
    }
    out.write_str(&text[last..])
}

/// Compiles each alias at most once per process and hands out the shared
/// compiled form afterwards.
pub struct TemplateCache {
    source: Arc<ResourceSource>,
    compiled: DashMap<String, Arc<CompiledTemplate>>,
    compilations: AtomicUsize,
}

impl TemplateCache {
    pub fn new(source: Arc<ResourceSource>) -> Self {
        Self {
            source,
            compiled: DashMap::new(),
            compilations: AtomicUsize::new(0),
        }
    }

    /// Returns the compiled template for `alias`, compiling it on first use.
    ///
    /// The source is read before the entry is taken, so the shard lock is
    /// held only while the template is parsed.
    pub fn compiled(
        &self,
        alias: &str,
        functions: &TemplateFunctions,
    ) -> Result<Arc<CompiledTemplate>, TemplateError> {
        if let Some(hit) = self.compiled.get(alias) {
            debug!(alias, "template cache hit");
            return Ok(Arc::clone(hit.value()));
        }

        let text = self.load(alias)?;
        let entry = self
            .compiled
            .entry(alias.to_string())
            .or_try_insert_with(|| {
                self.compilations.fetch_add(1, Ordering::SeqCst);
                let compiled = CompiledTemplate::compile(alias, text, functions)?;
                info!(alias, "compiled template");
                Ok::<_, TemplateError>(Arc::new(compiled))
            })?;
        Ok(Arc::clone(entry.value()))
    }

    pub fn render_to<S: Serialize, W: io::Write>(
        &self,
        alias: &str,
        data: S,
        out: W,
        functions: &TemplateFunctions,
    ) -> Result<(), TemplateError> {
        let template = self.compiled(alias, functions).inspect_err(|err| {
            error!(alias, error = %err, "template unavailable");
        })?;
        template.render_to(data, out).inspect_err(|err| {
            error!(alias, error = %err, "template execution failed");
        })
    }

    pub fn render<S: Serialize>(
        &self,
        alias: &str,
        data: S,
        functions: &TemplateFunctions,
    ) -> Result<String, TemplateError> {
        let mut out = Vec::new();
        self.render_to(alias, data, &mut out, functions)?;
        String::from_utf8(out).map_err(|_| TemplateError::Encoding(alias.to_string()))
    }

    /// Number of parses performed so far.
    pub fn compile_count(&self) -> usize {
        self.compilations.load(Ordering::SeqCst)
    }

    fn load(&self, alias: &str) -> Result<String, TemplateError> {
        let bytes = self
            .source
            .template(alias)
            .ok_or_else(|| TemplateError::NotFound(alias.to_string()))?;
        String::from_utf8(bytes.to_vec()).map_err(|_| TemplateError::Encoding(alias.to_string()))
    }
}
