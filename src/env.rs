use std::collections::BTreeMap;
use std::env as stdenv;
use std::ffi::{OsStr, OsString};

/// Read-only view of the process environment owned by one fixture invocation.
///
/// Variables are captured once, up front; fixtures never read `std::env` directly,
/// so tests can hand them any environment they like. Names and values are kept as
/// the OS gave them, valid Unicode or not.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: BTreeMap<OsString, OsString>,
}

impl Environment {
    /// Capture the current process variables.
    pub fn capture() -> Self {
        Self::from_vars(stdenv::vars_os())
    }

    /// Build an environment from explicit pairs.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Get the value of a variable by its exact name.
    pub fn get_var(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars.get(key.as_ref()).map(OsString::as_os_str)
    }

    /// Every variable whose name equals `name` ignoring case, sorted by name.
    ///
    /// Names that are not valid Unicode are compared after lossy conversion.
    pub fn find_case_insensitive<'a>(&'a self, name: &str) -> Vec<(&'a OsStr, &'a OsStr)> {
        let wanted = name.to_lowercase();
        self.vars
            .iter()
            .filter(|(k, _)| k.to_string_lossy().to_lowercase() == wanted)
            .map(|(k, v)| (k.as_os_str(), v.as_os_str()))
            .collect()
    }

    /// All variables, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }
}
