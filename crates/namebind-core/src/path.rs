//! Logical paths, delegation tables, and the `NameTree` evaluator.
//!
//! A [`Path`] is the thing a caller asks to resolve. A [`Dtab`] rewrites
//! path prefixes into [`NameTree`]s, and [`NameTree::eval`] reduces a tree
//! down to the set of bound names it denotes (or nothing, if it denotes
//! failure).

use std::fmt;

/// A hierarchical logical service name: a non-empty-or-empty sequence of
/// path elements, compared structurally.
///
/// `Path` is immutable once built; all mutating-looking operations return a
/// new value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    elems: Vec<String>,
}

impl Path {
    /// The empty path, `/`.
    pub fn empty() -> Self {
        Path { elems: Vec::new() }
    }

    /// Parses a slash-separated path such as `/foo/bar`.
    ///
    /// A leading slash is optional; `foo/bar` and `/foo/bar` parse
    /// identically. Returns an error on an empty element (e.g. `//`).
    pub fn read(s: &str) -> Result<Self, PathParseError> {
        let trimmed = s.strip_prefix('/').unwrap_or(s);
        if trimmed.is_empty() {
            return Ok(Path::empty());
        }
        let elems: Vec<String> = trimmed.split('/').map(str::to_string).collect();
        if elems.iter().any(String::is_empty) {
            return Err(PathParseError(s.to_string()));
        }
        Ok(Path { elems })
    }

    /// Builds a path directly from its elements.
    pub fn from_elems<I, S>(elems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Path {
            elems: elems.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if this path starts with `prefix`.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.elems.len() >= prefix.elems.len() && self.elems[..prefix.elems.len()] == prefix.elems[..]
    }

    /// Strips `prefix` off the front, returning the remainder. `None` if
    /// this path does not start with `prefix`.
    pub fn strip_prefix(&self, prefix: &Path) -> Option<Path> {
        if !self.starts_with(prefix) {
            return None;
        }
        Some(Path {
            elems: self.elems[prefix.elems.len()..].to_vec(),
        })
    }

    /// Appends `other` after this path's elements.
    pub fn concat(&self, other: &Path) -> Path {
        let mut elems = self.elems.clone();
        elems.extend(other.elems.iter().cloned());
        Path { elems }
    }

    /// The individual elements of this path.
    pub fn elems(&self) -> &[String] {
        &self.elems
    }

    /// True for the empty path.
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elems.is_empty() {
            return write!(f, "/");
        }
        for elem in &self.elems {
            write!(f, "/{elem}")?;
        }
        Ok(())
    }
}

/// Error parsing a [`Path`] or [`Dtab`] from its string form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid path syntax: {0:?}")]
pub struct PathParseError(String);

/// A tree of bindings: the result of rewriting a path through a [`Dtab`],
/// before it is reduced to a set of names by [`NameTree::eval`].
///
/// Generic over the leaf payload `T` so the same shape serves both
/// `NameTree<Path>` (a dtab's rewrite target, possibly still unresolved)
/// and `NameTree<BoundName>` (fully bound, ready to evaluate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTree<T> {
    /// No binding: evaluates to nothing.
    Neg,
    /// Evaluation failed outright (distinct from `Neg`, which means "no
    /// match", vs. an explicit failure signal from a namer).
    Fail,
    /// Evaluation is still pending.
    Empty,
    /// A concrete value.
    Leaf(T),
    /// Evaluates to the union of every non-negative child.
    Union(Vec<NameTree<T>>),
    /// Like `Union`, but each child carries a relative weight used by the
    /// load balancer below (not interpreted here).
    Weighted(Vec<(f64, NameTree<T>)>),
    /// Evaluates to nothing, regardless of the child's value.
    Alt(Vec<NameTree<T>>),
}

impl<T: Clone + PartialEq> NameTree<T> {
    /// Reduces this tree to the set of leaves it denotes.
    ///
    /// - `Neg`, `Fail`, `Empty` contribute nothing.
    /// - `Leaf(v)` contributes `v`.
    /// - `Union` concatenates every child's evaluation.
    /// - `Weighted` behaves like `Union` for membership purposes; weights
    ///   are carried by the load balancer layer, not interpreted here.
    /// - `Alt` evaluates its children in order, taking the first whose
    ///   evaluation is non-empty (first-match, not union).
    pub fn eval(&self) -> Vec<T> {
        match self {
            NameTree::Neg | NameTree::Fail | NameTree::Empty => Vec::new(),
            NameTree::Leaf(v) => vec![v.clone()],
            NameTree::Union(children) => children.iter().flat_map(NameTree::eval).collect(),
            NameTree::Weighted(children) => {
                children.iter().flat_map(|(_, c)| c.eval()).collect()
            }
            NameTree::Alt(children) => {
                for child in children {
                    let evaluated = child.eval();
                    if !evaluated.is_empty() {
                        return evaluated;
                    }
                }
                Vec::new()
            }
        }
    }

    /// True if this tree is structurally `Neg` or `Fail` (explicit
    /// negative/failure), as opposed to an empty union.
    pub fn is_negative(&self) -> bool {
        matches!(self, NameTree::Neg | NameTree::Fail)
    }
}

/// A single delegation rule: `prefix => tree`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dentry {
    /// The path prefix this rule rewrites.
    pub prefix: Path,
    /// The tree new lookups under `prefix` are rewritten to.
    pub tree: NameTree<Path>,
}

/// An ordered delegation table: a list of [`Dentry`] rewrite rules.
///
/// Two dtabs compose by concatenation (`base.concat(&local)`), with
/// earlier entries taking precedence during lookup. Lookup itself is pure
/// in `(table, path)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dtab {
    entries: Vec<Dentry>,
}

impl Dtab {
    /// The empty delegation table.
    pub fn empty() -> Self {
        Dtab { entries: Vec::new() }
    }

    /// Parses a semicolon-separated list of `prefix=>leafpath` rules.
    ///
    /// Only leaf-to-leaf rewrites are accepted from text form; richer
    /// trees (unions, weights) are built programmatically via
    /// [`Dtab::from_entries`].
    pub fn read(s: &str) -> Result<Self, PathParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Dtab::empty());
        }
        let mut entries = Vec::new();
        for clause in s.split(';') {
            let clause = clause.trim();
            if clause.is_empty() {
                continue;
            }
            let (prefix_str, tree_str) = clause
                .split_once("=>")
                .ok_or_else(|| PathParseError(clause.to_string()))?;
            let prefix = Path::read(prefix_str.trim())?;
            let tree_str = tree_str.trim();
            let tree = if tree_str == "/$/nil" {
                NameTree::Neg
            } else if tree_str == "/$/fail" {
                NameTree::Fail
            } else {
                NameTree::Leaf(Path::read(tree_str)?)
            };
            entries.push(Dentry { prefix, tree });
        }
        Ok(Dtab { entries })
    }

    /// Builds a dtab directly from a list of rules.
    pub fn from_entries(entries: Vec<Dentry>) -> Self {
        Dtab { entries }
    }

    /// True if this table has no rules.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The rules in this table, in precedence order.
    pub fn entries(&self) -> &[Dentry] {
        &self.entries
    }

    /// Concatenates `self` ahead of `other`: `self`'s rules take
    /// precedence, matching Finagle's `base ++ local` composition.
    pub fn concat(&self, other: &Dtab) -> Dtab {
        let mut entries = self.entries.clone();
        entries.extend(other.entries.iter().cloned());
        Dtab { entries }
    }

    /// Rewrites `path` through this table's first matching rule, if any.
    ///
    /// Returns `NameTree::Leaf(path)` unchanged (no match: the path binds
    /// to itself) unless some rule's prefix matches, in which case the
    /// remainder is spliced onto every leaf of the matching rule's tree.
    pub fn bind(&self, path: &Path) -> NameTree<Path> {
        for entry in &self.entries {
            if let Some(rest) = path.strip_prefix(&entry.prefix) {
                return splice(&entry.tree, &rest);
            }
        }
        NameTree::Leaf(path.clone())
    }
}

fn splice(tree: &NameTree<Path>, rest: &Path) -> NameTree<Path> {
    match tree {
        NameTree::Neg => NameTree::Neg,
        NameTree::Fail => NameTree::Fail,
        NameTree::Empty => NameTree::Empty,
        NameTree::Leaf(p) => NameTree::Leaf(p.concat(rest)),
        NameTree::Union(children) => {
            NameTree::Union(children.iter().map(|c| splice(c, rest)).collect())
        }
        NameTree::Weighted(children) => NameTree::Weighted(
            children
                .iter()
                .map(|(w, c)| (*w, splice(c, rest)))
                .collect(),
        ),
        NameTree::Alt(children) => NameTree::Alt(children.iter().map(|c| splice(c, rest)).collect()),
    }
}

// `NameTree`'s `Weighted` variant carries `f64` weights, which do not
// implement `Hash`, so `Dtab` cannot derive it. Its canonical rendering is
// a pure function of its structure, so hashing that string instead keeps
// the `Hash`/`Eq` contract (equal dtabs render identically) at the cost of
// coarser discrimination between distinct `Union`/`Weighted`/`Alt` trees,
// which `Display` already collapses to `(...)`. Good enough to key
// `namebind-binding`'s `DtabCache` by effective dtab.
impl std::hash::Hash for Dtab {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl fmt::Display for Dtab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .entries
            .iter()
            .map(|e| match &e.tree {
                NameTree::Neg => format!("{}=>/$/nil", e.prefix),
                NameTree::Fail => format!("{}=>/$/fail", e.prefix),
                NameTree::Leaf(p) => format!("{}=>{p}", e.prefix),
                _ => format!("{}=>(...)", e.prefix),
            })
            .collect();
        write!(f, "{}", rendered.join(";"))
    }
}
