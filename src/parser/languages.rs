use tree_sitter::Language;

use crate::language::LanguageKind;

/// Return the tree-sitter [`Language`] for a language kind, or `None` when the kind
/// is handled by the heuristic adapter.
///
/// # Grammar selection rules
/// - `TypeScript` -> TypeScript grammar (`LANGUAGE_TYPESCRIPT`)
/// - `Tsx`        -> TSX grammar        (`LANGUAGE_TSX`)
///   These MUST be different: the TypeScript grammar cannot parse JSX, and the TSX grammar
///   breaks angle-bracket type assertions (`<T>expr`). Mixing them causes parse errors.
/// - `JavaScript` -> JavaScript grammar, which also covers JSX.
pub fn tree_sitter_language(kind: LanguageKind) -> Option<Language> {
    match kind {
        LanguageKind::Python => Some(tree_sitter_python::LANGUAGE.into()),
        LanguageKind::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
        LanguageKind::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        LanguageKind::Tsx => Some(tree_sitter_typescript::LANGUAGE_TSX.into()),
        LanguageKind::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
        LanguageKind::PlainText => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_grammar_kind_has_a_language() {
        for kind in [
            LanguageKind::Python,
            LanguageKind::JavaScript,
            LanguageKind::TypeScript,
            LanguageKind::Tsx,
            LanguageKind::Rust,
        ] {
            assert!(tree_sitter_language(kind).is_some(), "{:?}", kind);
        }
        assert!(tree_sitter_language(LanguageKind::PlainText).is_none());
    }
}
