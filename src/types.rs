use std::collections::{BTreeMap, BTreeSet};

use crate::Sym;
use crate::utils::disp_iter;

/// Name of the root type, implicitly declared in every domain.
pub const OBJECT: &str = "object";

/// Type hierarchy of a domain, as a map from each type to its direct subtypes.
///
/// Types declared without a parent are keys with no children; `a b - t` adds `a` and `b`
/// to the children of `t`.
#[derive(Clone, Debug)]
pub struct TypeHierarchy {
    types: BTreeMap<Sym, Vec<Sym>>,
    /// child -> parent
    parents: hashbrown::HashMap<Sym, Sym>,
}

impl Default for TypeHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for TypeHierarchy {
    fn eq(&self, other: &Self) -> bool {
        self.types == other.types
    }
}

impl TypeHierarchy {
    pub fn new() -> Self {
        let mut types = BTreeMap::new();
        types.insert(Sym::from(OBJECT), Vec::new());
        TypeHierarchy {
            types,
            parents: Default::default(),
        }
    }

    /// Declares `name`, as a subtype of `parent` if one is given.
    pub fn add_type(&mut self, name: impl Into<Sym>, parent: Option<Sym>) {
        let name = name.into();
        match parent {
            Some(parent) => {
                let children = self.types.entry(parent.clone()).or_default();
                if !children.contains(&name) {
                    children.push(name.clone());
                }
                self.parents.insert(name, parent);
            }
            None => {
                self.types.entry(name).or_default();
            }
        }
    }

    /// Direct subtypes of `parent`, if it was declared as a key.
    pub fn children(&self, parent: &str) -> Option<&[Sym]> {
        self.types.get(parent).map(|c| c.as_slice())
    }

    pub fn parent(&self, tpe: &str) -> Option<&Sym> {
        self.parents.get(tpe)
    }

    /// All declared types, keys and children alike.
    pub fn type_names(&self) -> BTreeSet<&Sym> {
        self.types.iter().flat_map(|(k, children)| std::iter::once(k).chain(children)).collect()
    }

    pub fn contains(&self, tpe: &str) -> bool {
        self.types.contains_key(tpe) || self.parents.contains_key(tpe)
    }

    /// Returns true if the hierarchy has nothing beyond the implicit `object` type.
    pub fn is_trivial(&self) -> bool {
        self.types.len() == 1 && self.children(OBJECT).is_some_and(|c| c.is_empty())
    }

    /// Every type is a subtype of itself and of `object`.
    pub fn is_subtype_of(&self, a: &str, b: &str) -> bool {
        if a == b || b == OBJECT {
            true
        } else if let Some(parent) = self.parents.get(a) {
            self.is_subtype_of(parent.canonical_str(), b)
        } else {
            false
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Sym, &[Sym])> + '_ {
        self.types.iter().map(|(k, v)| (k, v.as_slice()))
    }
}

impl std::fmt::Display for TypeHierarchy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        disp_iter(
            f,
            self.types.iter().map(|(parent, children)| {
                let children: Vec<_> = children.iter().map(|c| c.to_string()).collect();
                format!("{parent} <- [{}]", children.join(", "))
            }),
            "\n",
        )
    }
}
