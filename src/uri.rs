//! Schema URIs and JSON Pointers
//!
//! A [`SchemaUri`] is a document location plus a JSON-Pointer fragment. The
//! pointer is kept as an ordered list of unescaped tokens so that equality is
//! structural rather than textual; escaping only happens at the string
//! boundary (`parse` / `Display`).

use std::fmt;

/// A JSON Pointer (RFC 6901) as a sequence of unescaped reference tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsonPointer {
    tokens: Vec<String>,
}

impl JsonPointer {
    /// The pointer addressing the document root.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a pointer from its fragment representation, e.g. `/a/b~1c`.
    ///
    /// An empty string is the root pointer. A missing leading `/` is
    /// tolerated and treated as if it were present.
    #[must_use]
    pub fn parse(fragment: &str) -> Self {
        if fragment.is_empty() {
            return Self::root();
        }
        let body = fragment.strip_prefix('/').unwrap_or(fragment);
        Self {
            tokens: body.split('/').map(Self::unescape).collect(),
        }
    }

    /// Return a new pointer with `token` (unescaped) appended.
    #[must_use]
    pub fn join(&self, token: &str) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(token.to_string());
        Self { tokens }
    }

    /// The unescaped reference tokens, in order.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Whether this is the root pointer.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Escape a single reference token (`~` → `~0`, `/` → `~1`).
    #[must_use]
    pub fn escape(token: &str) -> String {
        token.replace('~', "~0").replace('/', "~1")
    }

    fn unescape(token: &str) -> String {
        token.replace("~1", "/").replace("~0", "~")
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "/{}", Self::escape(token))?;
        }
        Ok(())
    }
}

/// A schema URI: a document location plus a JSON-Pointer fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SchemaUri {
    location: String,
    fragment: JsonPointer,
}

impl SchemaUri {
    /// Parse a URI string, splitting off the pointer fragment at `#`.
    #[must_use]
    pub fn parse(uri: &str) -> Self {
        match uri.split_once('#') {
            Some((location, fragment)) => Self {
                location: location.to_string(),
                fragment: JsonPointer::parse(fragment),
            },
            None => Self {
                location: uri.to_string(),
                fragment: JsonPointer::root(),
            },
        }
    }

    /// The document location (everything before the fragment).
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The JSON-Pointer fragment.
    #[must_use]
    pub fn pointer(&self) -> &JsonPointer {
        &self.fragment
    }

    /// Return a new URI with `token` appended to the pointer fragment.
    #[must_use]
    pub fn append(&self, token: &str) -> Self {
        Self {
            location: self.location.clone(),
            fragment: self.fragment.join(token),
        }
    }

    /// Resolve a reference string against this URI (RFC 3986 semantics for
    /// the subset a schema can contain: fragment-only, relative-path,
    /// absolute-path, or absolute).
    ///
    /// A fragment-only reference keeps the location and replaces the
    /// pointer; every other form replaces the pointer with the fragment of
    /// the reference (root if it has none).
    #[must_use]
    pub fn derive(&self, reference: &str) -> Self {
        if let Some(fragment) = reference.strip_prefix('#') {
            return Self {
                location: self.location.clone(),
                fragment: JsonPointer::parse(fragment),
            };
        }

        let (path, fragment) = match reference.split_once('#') {
            Some((path, fragment)) => (path, JsonPointer::parse(fragment)),
            None => (reference, JsonPointer::root()),
        };

        let location = if has_scheme(path) {
            path.to_string()
        } else if let Some(rest) = path.strip_prefix("//") {
            // Network-path reference: keep the base scheme.
            match self.location.split_once(':') {
                Some((scheme, _)) => format!("{scheme}://{rest}"),
                None => path.to_string(),
            }
        } else if path.starts_with('/') {
            format!("{}{}", authority_prefix(&self.location), path)
        } else {
            merge_relative(&self.location, path)
        };

        Self {
            location: remove_dot_segments(&location),
            fragment,
        }
    }
}

impl fmt::Display for SchemaUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.location, self.fragment)
    }
}

/// Whether `s` starts with a URI scheme (`scheme:`).
fn has_scheme(s: &str) -> bool {
    let Some((candidate, _)) = s.split_once(':') else {
        return false;
    };
    let mut chars = candidate.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// The `scheme://authority` prefix of a location, or everything up to the
/// path if the location has no authority.
fn authority_prefix(location: &str) -> &str {
    if let Some(after_scheme) = location.find("://").map(|i| i + 3) {
        match location[after_scheme..].find('/') {
            Some(slash) => &location[..after_scheme + slash],
            None => location,
        }
    } else {
        ""
    }
}

/// Merge a relative path reference with the base location.
fn merge_relative(base: &str, path: &str) -> String {
    let authority_end = base.find("://").map_or(0, |i| i + 3);
    match base[authority_end..].rfind('/') {
        Some(slash) => format!("{}/{}", &base[..authority_end + slash], path),
        None if authority_end > 0 => format!("{base}/{path}"),
        None => path.to_string(),
    }
}

/// Remove `.` and `..` segments from the path portion of a location.
fn remove_dot_segments(location: &str) -> String {
    let path_start = location
        .find("://")
        .map(|i| {
            let after = i + 3;
            location[after..]
                .find('/')
                .map_or(location.len(), |s| after + s)
        })
        .unwrap_or(0);
    let (prefix, path) = location.split_at(path_start);

    if !path.contains("/.") {
        return location.to_string();
    }

    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    format!("{}{}", prefix, out.join("/"))
}
