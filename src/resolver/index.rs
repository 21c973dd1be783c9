use std::collections::HashMap;

use crate::extract::ExtractedUnit;
use crate::graph::node::SymbolId;

/// Read-only lookup tables over every declared symbol of a run.
///
/// Built once, by a single writer, after all units are extracted and numbered;
/// then shared by reference with the parallel resolve phase.
#[derive(Debug, Default)]
pub struct GlobalIndex {
    /// Qualified name -> symbols bearing it, ascending by id.
    by_qualified: HashMap<String, Vec<SymbolId>>,
    /// Simple name -> symbols declared directly in a unit's module, ascending by id.
    by_name: HashMap<String, Vec<SymbolId>>,
    /// Qualified name per id, for descending through dotted names.
    qualified: Vec<String>,
}

impl GlobalIndex {
    /// Index `units`, whose local symbols start at the matching entry of `bases`.
    pub fn build(units: &[ExtractedUnit], bases: &[u32]) -> Self {
        let total: usize = units.iter().map(|u| u.symbols.len()).sum();
        let mut index = GlobalIndex {
            by_qualified: HashMap::with_capacity(total),
            by_name: HashMap::new(),
            qualified: Vec::with_capacity(total),
        };

        for (unit, &base) in units.iter().zip(bases) {
            debug_assert_eq!(base as usize, index.qualified.len(), "bases must be dense");
            for (local, symbol) in unit.symbols.iter().enumerate() {
                let id = SymbolId(base + local as u32);
                index
                    .by_qualified
                    .entry(symbol.qualified_name.clone())
                    .or_default()
                    .push(id);
                if symbol.parent == Some(0) {
                    index
                        .by_name
                        .entry(symbol.name.clone())
                        .or_default()
                        .push(id);
                }
                index.qualified.push(symbol.qualified_name.clone());
            }
        }
        index
    }

    pub fn by_qualified(&self, qualified_name: &str) -> &[SymbolId] {
        self.by_qualified
            .get(qualified_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn by_name(&self, name: &str) -> &[SymbolId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn qualified_name(&self, id: SymbolId) -> Option<&str> {
        self.qualified.get(id.index()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.qualified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.qualified.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::config::EngineConfig;
    use crate::extract::extract;
    use crate::language::LanguageKind;
    use crate::parser::{analyze, parse};

    fn unit(path: &str, src: &str) -> ExtractedUnit {
        let tree = parse(src, LanguageKind::Python).unwrap();
        let facts = analyze(&tree);
        extract(Path::new(path), &tree, facts, &EngineConfig::default())
    }

    #[test]
    fn test_ids_follow_bases() {
        let units = vec![
            unit("a.py", "def f():\n    pass\n"),
            unit("b.py", "def f():\n    pass\nclass K:\n    def m(self):\n        pass\n"),
        ];
        let index = GlobalIndex::build(&units, &[0, 2]);
        assert_eq!(index.len(), 6);
        assert_eq!(index.by_qualified("b.f"), &[SymbolId(3)]);
        assert_eq!(index.by_name("f"), &[SymbolId(1), SymbolId(3)]);
        // methods are not top-level
        assert!(index.by_name("m").is_empty());
        assert_eq!(index.qualified_name(SymbolId(5)), Some("b.K.m"));
    }
}
