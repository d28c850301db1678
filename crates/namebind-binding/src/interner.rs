//! Canonicalizes resolved paths into shared [`BoundName`] identities.
//!
//! Different effective dtabs frequently rewrite a path down to the same
//! leaf (or the same multi-member union): interning keeps those resolutions
//! sharing one `BoundName` identity so `NameCache` sees one key instead of
//! several equivalent ones, and so the downstream stack (including its
//! `FailFastFactory`) is built once rather than once per dtab.

use std::collections::HashMap;

use parking_lot::Mutex;

use namebind_core::{BoundName, Path};

/// Interns resolved [`Path`]s (and sets of them) into stable [`BoundName`]
/// identities, so repeated resolutions that land on the same target share
/// cache identity instead of minting a fresh one every time.
pub struct NameInterner {
    singles: Mutex<HashMap<Path, BoundName>>,
    unions: Mutex<HashMap<Vec<Path>, BoundName>>,
}

impl NameInterner {
    /// Builds an empty interner.
    pub fn new() -> Self {
        NameInterner {
            singles: Mutex::new(HashMap::new()),
            unions: Mutex::new(HashMap::new()),
        }
    }

    /// Interns a single resolved path, returning its stable identity.
    pub fn intern(&self, path: &Path) -> BoundName {
        let mut singles = self.singles.lock();
        if let Some(name) = singles.get(path) {
            return name.clone();
        }
        let name = BoundName::new(path.to_string(), synthesize_addresses(path));
        singles.insert(path.clone(), name.clone());
        name
    }

    /// Interns a set of resolved paths as one synthesised aggregate name,
    /// whose address set is the union of its members' (spec.md §4.4,
    /// "`Some(S), |S|>1` -> `Ok(union_name(S))`").
    ///
    /// Member order does not affect identity: the set is canonicalized
    /// (sorted, deduplicated) before being looked up or interned.
    pub fn intern_union(&self, paths: &[Path]) -> BoundName {
        let mut key: Vec<Path> = paths.to_vec();
        key.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
        key.dedup();

        if key.len() == 1 {
            return self.intern(&key[0]);
        }

        let mut unions = self.unions.lock();
        if let Some(name) = unions.get(&key) {
            return name.clone();
        }

        let members: Vec<BoundName> = key.iter().map(|p| self.intern(p)).collect();
        let label = members
            .iter()
            .map(|m| m.label().to_string())
            .collect::<Vec<_>>()
            .join("+");
        let addresses: Vec<String> = members
            .iter()
            .flat_map(|m| m.addresses().iter().cloned())
            .collect();
        let name = BoundName::new(label, addresses);
        unions.insert(key, name.clone());
        name
    }
}

impl Default for NameInterner {
    fn default() -> Self {
        Self::new()
    }
}

/// Recognizes the `/$/inet/HOST/PORT` shape and synthesises a `HOST:PORT`
/// address from it; any other path shape carries no inferred address (the
/// core has no general notion of what a resolved path denotes — see
/// SPEC_FULL.md's data-model Non-goals).
fn synthesize_addresses(path: &Path) -> Vec<String> {
    match path.elems() {
        [scheme, kind, host, port] if scheme == "$" && kind == "inet" => {
            vec![format!("{host}:{port}")]
        }
        _ => Vec::new(),
    }
}
