use super::ReadmeError;
use super::snippet::Snippet;
use std::collections::BTreeMap;
use std::fs;

/// Flat name to text mapping handed to the template.
pub type Model = BTreeMap<String, String>;

/// Split `KEY=VALUE` on the first `=`.
pub fn parse_definition(definition: &str) -> Result<(String, String), ReadmeError> {
    definition
        .split_once('=')
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .ok_or_else(|| ReadmeError::MalformedDefinition(definition.to_owned()))
}

/// Load snippets from every file matching `pattern`.
///
/// Files are visited in the order the glob yields them (sorted by path). A pattern
/// matching nothing yields no snippets.
pub fn load_snippets(pattern: &str, chop: usize) -> Result<Vec<Snippet>, ReadmeError> {
    let paths = glob::glob(pattern).map_err(|source| ReadmeError::SnippetPattern {
        pattern: pattern.to_owned(),
        source,
    })?;

    let mut snippets = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| ReadmeError::SnippetSource {
            path: e.path().to_owned(),
            source: e.into_error(),
        })?;
        let source = fs::read_to_string(&path).map_err(|source| ReadmeError::SnippetSource {
            path: path.clone(),
            source,
        })?;
        let found = Snippet::extract(&source, chop);
        debug!(path = %path.display(), count = found.len(), "loaded snippets");
        snippets.extend(found);
    }
    Ok(snippets)
}

/// Combine `--define` values and snippets into one model.
///
/// Definitions go in first, then snippets; a later key silently replaces an earlier one.
pub fn build_model<S: AsRef<str>>(
    definitions: &[S],
    snippet_sources: Option<&str>,
    chop: usize,
) -> Result<Model, ReadmeError> {
    let mut model = Model::new();
    for definition in definitions {
        let (key, value) = parse_definition(definition.as_ref())?;
        model.insert(key, value);
    }
    if let Some(pattern) = snippet_sources {
        for snippet in load_snippets(pattern, chop)? {
            let (id, text) = snippet.into_parts();
            model.insert(id, text);
        }
    }
    debug!(keys = ?model.keys().collect::<Vec<_>>(), "model built");
    Ok(model)
}
