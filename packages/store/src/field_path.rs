//! Field-path expressions locating a value inside a collection.
//!
//! A field path is a dotted/bracketed string such as `user.settings[0].name`.  It is parsed into a
//! list of [`Accessor`]s and interpreted by a tree walker; it is never evaluated as code.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

/// Errors from parsing or applying a field path.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("field path is empty")]
    Empty,
    #[error("empty property name at position {position}")]
    EmptyProperty { position: usize },
    #[error("unclosed bracket starting at position {position}")]
    UnclosedBracket { position: usize },
    #[error("invalid array index at position {position}: {index:?}")]
    InvalidIndex { position: usize, index: String },
    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },
    #[error("cannot traverse {path:?}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("array index {index} is more than {max_gap} past the end of an array of length {len}")]
    IndexOutOfRange {
        index: usize,
        len: usize,
        max_gap: usize,
    },
}

/// One step of a field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Accessor {
    /// Object property: `.name`
    Property(String),
    /// Array index: `[0]`
    Index(usize),
}

impl Accessor {
    /// Kind of container this accessor reaches into.
    pub fn container_kind(&self) -> &'static str {
        match self {
            Accessor::Property(_) => "object",
            Accessor::Index(_) => "array",
        }
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Property(name) => write!(f, ".{}", name),
            Accessor::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// A parsed field path.
///
/// | Syntax | Meaning |
/// |--------|---------|
/// | `name` | Object property |
/// | `[n]` | Array index |
/// | `a.b` | Nested property |
/// | `a[n].b` | Property, index, property |
///
/// ```
/// use filedoc_store::{Accessor, FieldPath};
///
/// let path: FieldPath = "list[0].name".parse().unwrap();
/// assert_eq!(
///     path.accessors(),
///     &[
///         Accessor::Property("list".to_string()),
///         Accessor::Index(0),
///         Accessor::Property("name".to_string()),
///     ]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    accessors: Vec<Accessor>,
}

impl FieldPath {
    /// Whether `key` can be used as a single property name without parsing.
    pub fn is_simple(key: &str) -> bool {
        !key.contains(['.', '['])
    }

    /// A single-property path, built without going through the parser.
    pub fn property(name: impl Into<String>) -> Self {
        FieldPath {
            accessors: vec![Accessor::Property(name.into())],
        }
    }

    pub fn accessors(&self) -> &[Accessor] {
        &self.accessors
    }

    pub fn len(&self) -> usize {
        self.accessors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessors.is_empty()
    }

    /// Display form of the first `len` accessors, for error messages.
    pub fn prefix_string(&self, len: usize) -> String {
        FieldPath {
            accessors: self.accessors[..len.min(self.accessors.len())].to_vec(),
        }
        .to_string()
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        if s.is_empty() {
            return Err(Error::Empty);
        }

        let chars: Vec<char> = s.chars().collect();
        let mut accessors = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '[' => {
                    let start = i;
                    i += 1;
                    let index_start = i;
                    while i < chars.len() && chars[i] != ']' {
                        i += 1;
                    }
                    if i >= chars.len() {
                        return Err(Error::UnclosedBracket { position: start });
                    }

                    let index: String = chars[index_start..i].iter().collect();
                    if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
                        return Err(Error::InvalidIndex {
                            position: index_start,
                            index,
                        });
                    }
                    let parsed = index.parse::<usize>().map_err(|_| Error::InvalidIndex {
                        position: index_start,
                        index: index.clone(),
                    })?;
                    accessors.push(Accessor::Index(parsed));
                    i += 1; // Closing bracket
                }
                '.' => {
                    // A dot separates; it must follow an accessor and introduce a name.
                    if accessors.is_empty() {
                        return Err(Error::EmptyProperty { position: i });
                    }
                    i += 1;
                    let name_start = i;
                    while i < chars.len() && !matches!(chars[i], '.' | '[' | ']') {
                        i += 1;
                    }
                    if i == name_start {
                        return Err(Error::EmptyProperty { position: name_start });
                    }
                    accessors.push(Accessor::Property(chars[name_start..i].iter().collect()));
                }
                ']' => {
                    return Err(Error::UnexpectedChar {
                        ch: ']',
                        position: i,
                    })
                }
                ch => {
                    // Bare names are only valid at the start; afterwards they need a dot.
                    if !accessors.is_empty() {
                        return Err(Error::UnexpectedChar { ch, position: i });
                    }
                    let name_start = i;
                    while i < chars.len() && !matches!(chars[i], '.' | '[' | ']') {
                        i += 1;
                    }
                    accessors.push(Accessor::Property(chars[name_start..i].iter().collect()));
                }
            }
        }

        Ok(FieldPath { accessors })
    }
}

impl FromStr for FieldPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldPath::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, accessor) in self.accessors.iter().enumerate() {
            match accessor {
                Accessor::Property(name) if i == 0 => write!(f, "{}", name)?,
                other => write!(f, "{}", other)?,
            }
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D>(deserializer: D) -> Result<FieldPath, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;

        FieldPath::parse(&s).map_err(D::Error::custom)
    }
}
