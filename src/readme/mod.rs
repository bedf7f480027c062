//! README rendering: a template plus `--define` values plus code snippets cut out of
//! source files, so version strings stay current and the examples shown are ones
//! that compile.

mod model;
mod render;
mod snippet;

pub use model::{Model, build_model, load_snippets, parse_definition};
pub use render::render;
pub use snippet::{Snippet, SnippetScanner};

use crate::logging::LogLevel;
use argh::FromArgs;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ReadmeError {
    #[error("malformed definition {0:?}; expected KEY=VALUE")]
    MalformedDefinition(String),
    #[error("invalid snippet source pattern {pattern:?}")]
    SnippetPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("failed to read snippet source {}", path.display())]
    SnippetSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read template {}", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to render template")]
    Render(#[from] minijinja::Error),
    #[error("failed to write {target}")]
    Output {
        target: String,
        #[source]
        source: io::Error,
    },
}

#[derive(FromArgs, Debug)]
/// Render a README template, interpolating `--define` values and code snippets
/// demarcated by `// README_SNIPPET <name>` lines in source files.
pub struct RenderReadme {
    #[argh(positional)]
    /// template file to render
    pub template: PathBuf,

    #[argh(option, short = 'o')]
    /// output file; standard output when omitted
    pub output: Option<PathBuf>,

    #[argh(option, long = "define")]
    /// define a model property as KEY=VALUE; may be repeated
    pub definitions: Vec<String>,

    #[argh(option)]
    /// wildcard pattern selecting the files snippets are read from
    pub snippet_sources: Option<String>,

    #[argh(option, default = "0")]
    /// number of characters to chop from the front of each snippet line
    pub snippet_chop: usize,

    #[argh(option)]
    /// log level: DEBUG, INFO, WARN or ERROR (default: RUST_LOG, else INFO)
    pub log_level: Option<LogLevel>,
}

impl RenderReadme {
    /// Build the model, render the template and write the result.
    pub fn run(&self) -> Result<(), ReadmeError> {
        let model = build_model(&self.definitions, self.snippet_sources.as_deref(), self.snippet_chop)?;
        let template = std::fs::read_to_string(&self.template).map_err(|source| ReadmeError::Template {
            path: self.template.clone(),
            source,
        })?;
        let rendering = render(&template, &model)?;
        write_output(self.output.as_deref(), &rendering)
    }
}

fn write_output(output: Option<&Path>, rendering: &str) -> Result<(), ReadmeError> {
    let target = output.map_or_else(|| "standard output".to_owned(), |p| p.display().to_string());
    let result = match output {
        Some(path) => File::create(path).and_then(|mut f| {
            writeln!(f, "{}", rendering)?;
            f.flush()
        }),
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", rendering).and_then(|()| stdout.flush())
        }
    };
    result.map_err(|source| ReadmeError::Output {
        target: target.clone(),
        source,
    })?;
    info!(%target, bytes = rendering.len() + 1, "README written");
    Ok(())
}
