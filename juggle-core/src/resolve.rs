//! Struct field resolution.
//!
//! Maps source keys to destination fields for a struct shape: embedded
//! fields are expanded breadth-first, shallower fields shadow deeper ones,
//! and equally-shallow same-name candidates annihilate unless exactly one of
//! them carries a tag-derived name. Resolution is a pure function of the
//! shape and is memoized per shape identity in a [`FieldCache`].

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::shape::{Def, ShapeId, ShapeRef, strip_pointers};

/// A resolved, addressable field of a struct shape.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldEntry {
    /// The name source keys are matched against.
    pub name: String,
    /// Declared-field indices from the struct's slot down to the field,
    /// through embedded substructures. Pointer hops along the way are
    /// implied by the shapes and allocated on demand during decode.
    pub path: Vec<usize>,
    /// Whether the name came from a tag rather than the identifier.
    pub renamed: bool,
    /// Embedding depth; 0 for directly declared fields.
    pub depth: usize,
}

/// One candidate produced by the breadth-first scan, before conflict
/// resolution.
struct Candidate {
    entry: FieldEntry,
}

struct Scan {
    shape: ShapeRef,
    path: Vec<usize>,
}

/// Compute the resolved field list of a struct shape.
///
/// Returns an empty list for non-struct shapes. The result is deterministic:
/// entries appear in breadth-first discovery order.
pub fn resolve(shape: &ShapeRef) -> Vec<FieldEntry> {
    let root = strip_pointers(shape);
    if !matches!(root.def, Def::Struct(_)) {
        return Vec::new();
    }

    let mut candidates: Vec<Candidate> = Vec::new();
    let mut visited: HashSet<ShapeId> = HashSet::new();
    let mut next: Vec<Scan> = vec![Scan {
        shape: root.clone(),
        path: Vec::new(),
    }];
    let mut depth = 0usize;

    while !next.is_empty() {
        let current = std::mem::take(&mut next);
        for scan in current {
            let struct_shape = strip_pointers(&scan.shape);
            if !visited.insert(struct_shape.id()) {
                continue;
            }
            let Def::Struct(def) = &struct_shape.def else {
                continue;
            };
            for (index, field) in def.fields.iter().enumerate() {
                if field.ignored {
                    continue;
                }
                let mut path = scan.path.clone();
                path.push(index);
                let expandable = field.embedded
                    && field.rename.is_none()
                    && matches!(strip_pointers(&field.shape).def, Def::Struct(_));
                if expandable {
                    next.push(Scan {
                        shape: field.shape.clone(),
                        path,
                    });
                    continue;
                }
                candidates.push(Candidate {
                    entry: FieldEntry {
                        name: field.name().to_string(),
                        path,
                        renamed: field.rename.is_some(),
                        depth,
                    },
                });
            }
        }
        depth += 1;
    }

    select_dominant(candidates)
}

/// Apply shadowing and annihilation: for each name, keep the unique
/// shallowest candidate, or the unique tag-renamed one among equally shallow
/// candidates; otherwise the name is unresolvable and all its candidates are
/// dropped.
fn select_dominant(candidates: Vec<Candidate>) -> Vec<FieldEntry> {
    let mut by_name: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, c) in candidates.iter().enumerate() {
        by_name.entry(c.entry.name.as_str()).or_default().push(i);
    }

    let mut keep: Vec<bool> = vec![false; candidates.len()];
    for indices in by_name.values() {
        let min_depth = indices
            .iter()
            .map(|&i| candidates[i].entry.depth)
            .min()
            .expect("name group is non-empty");
        let shallowest: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| candidates[i].entry.depth == min_depth)
            .collect();
        if shallowest.len() == 1 {
            keep[shallowest[0]] = true;
            continue;
        }
        let renamed: Vec<usize> = shallowest
            .iter()
            .copied()
            .filter(|&i| candidates[i].entry.renamed)
            .collect();
        if renamed.len() == 1 {
            keep[renamed[0]] = true;
        }
        // Zero or several renamed candidates at the same depth: the name
        // annihilates, nothing deeper can claim it either.
    }

    candidates
        .into_iter()
        .enumerate()
        .filter_map(|(i, c)| keep[i].then_some(c.entry))
        .collect()
}

/// Match a source key against resolved entries: exact name first, then an
/// ASCII case-insensitive fallback, earliest-discovered entry winning ties.
pub fn find_field<'a>(entries: &'a [FieldEntry], key: &str) -> Option<&'a FieldEntry> {
    if let Some(entry) = entries.iter().find(|e| e.name == key) {
        return Some(entry);
    }
    entries.iter().find(|e| e.name.eq_ignore_ascii_case(key))
}

/// Append-only memo of resolved field lists, keyed by struct shape identity.
///
/// Entries are immutable once written. Resolution is pure and deterministic,
/// so a race between two first-time computations of the same shape just
/// recomputes an equal list; whichever write lands first is kept.
pub struct FieldCache {
    inner: RwLock<HashMap<ShapeId, Arc<[FieldEntry]>>>,
}

impl Default for FieldCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldCache {
    /// An empty cache.
    pub fn new() -> Self {
        FieldCache {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// The resolved field list for `shape`, computing and memoizing it on
    /// first encounter.
    pub fn entries(&self, shape: &ShapeRef) -> Arc<[FieldEntry]> {
        let key = strip_pointers(shape).id();
        if let Some(hit) = self.inner.read().expect("field cache poisoned").get(&key) {
            return hit.clone();
        }
        let computed: Arc<[FieldEntry]> = resolve(shape).into();
        let mut guard = self.inner.write().expect("field cache poisoned");
        guard.entry(key).or_insert(computed).clone()
    }
}
