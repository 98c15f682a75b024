use std::path::{Path, PathBuf};

/// A parsed connection string.
///
/// Resolves the caller-supplied token to a database file path while keeping
/// the verbatim string as the pool key. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionSpec {
    connection_string: String,
    database_path: PathBuf,
}

impl ConnectionSpec {
    /// Use the connection string verbatim as the database path.
    pub fn new(connection_string: impl Into<String>) -> Self {
        let connection_string = connection_string.into();
        let database_path = PathBuf::from(&connection_string);
        Self {
            connection_string,
            database_path,
        }
    }

    /// Resolve a relative connection string against an application data
    /// root (sandboxed platforms hand us one). Absolute paths, `:memory:`,
    /// and `file:` URIs are used verbatim.
    pub fn with_data_root(connection_string: impl Into<String>, root: impl AsRef<Path>) -> Self {
        let connection_string = connection_string.into();
        let database_path = if is_verbatim_token(&connection_string) {
            PathBuf::from(&connection_string)
        } else {
            root.as_ref().join(&connection_string)
        };
        Self {
            connection_string,
            database_path,
        }
    }

    /// The pool key: the connection string exactly as supplied.
    ///
    /// Two strings that alias the same file (relative vs. absolute, trailing
    /// separators) are distinct keys with independent connections and locks,
    /// so serialization guarantees do not span such aliases.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.connection_string
    }

    #[must_use]
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// The resolved filesystem path handed to the engine.
    #[must_use]
    pub fn database_path(&self) -> &Path {
        &self.database_path
    }
}

fn is_verbatim_token(token: &str) -> bool {
    token == ":memory:" || token.starts_with("file:") || Path::new(token).is_absolute()
}
