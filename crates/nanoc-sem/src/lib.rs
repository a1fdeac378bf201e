//! Attaches a symbol table to every scope-defining node in a parsed program.
//!
//! A scope is introduced by the body of an `if`, `else`, `while`, or `for`,
//! plus the program root. The builder walks the tree depth-first, declaring
//! `Variable` nodes, resolving bare identifier references against the
//! enclosing scope chain, and recursing into child scopes where the
//! grammar's shape says one begins.
//!
//! # Examples
//!
//! ```
//! use nanoc_lex::Lexer;
//! use nanoc_par::Parser;
//! use nanoc_sem::SymbolTableBuilder;
//! use nanoc_util::Interner;
//!
//! let mut interner = Interner::new();
//! let tokens = Lexer::new(&mut interner).tokenize("byte x = 5;").unwrap();
//! let (ast, root) = Parser::parse_program(tokens).unwrap();
//! let annotated = SymbolTableBuilder::build(&ast, root, &interner).unwrap();
//! assert_eq!(annotated.forest.iter().count(), 1);
//! ```

pub mod scope;

use nanoc_par::ast::{Ast, GrammarSymbol, NodeId};
use nanoc_lex::{TokenKind, TokenValue};
use nanoc_util::diagnostic::Handler;
use nanoc_util::error::{SemaError, SemaResult};
use nanoc_util::Interner;

use scope::{ScopeForest, ScopeId};

/// The result of annotating a program: the original scopes plus a map from
/// every scope-defining node to the table it owns.
#[derive(Debug)]
pub struct Annotated {
    pub forest: ScopeForest,
    pub node_scope: nanoc_util::FxHashMap<NodeId, ScopeId>,
    pub root_scope: ScopeId,
}

/// Builds a [`ScopeForest`] over a parsed program.
pub struct SymbolTableBuilder<'a> {
    ast: &'a Ast,
    interner: &'a Interner,
    forest: ScopeForest,
    node_scope: nanoc_util::FxHashMap<NodeId, ScopeId>,
}

impl<'a> SymbolTableBuilder<'a> {
    pub fn build(ast: &'a Ast, root: NodeId, interner: &'a Interner) -> SemaResult<Annotated> {
        let mut builder = SymbolTableBuilder {
            ast,
            interner,
            forest: ScopeForest::new(),
            node_scope: nanoc_util::FxHashMap::default(),
        };
        let root_scope = builder.forest.new_scope(None);
        builder.node_scope.insert(root, root_scope);
        builder.visit(root, root_scope)?;

        Ok(Annotated {
            forest: builder.forest,
            node_scope: builder.node_scope,
            root_scope,
        })
    }

    /// Runs the builder and additionally surfaces unread/unwritten
    /// declarations as warnings on `handler`. Never fails on those — only
    /// the fatal conditions in [`SemaError`] abort the build.
    pub fn build_with_diagnostics(
        ast: &'a Ast,
        root: NodeId,
        interner: &'a Interner,
        handler: &mut Handler,
    ) -> SemaResult<Annotated> {
        let annotated = Self::build(ast, root, interner)?;
        for (_, table) in annotated.forest.iter() {
            for (_name, entry) in table.entries() {
                if !entry.is_read_from {
                    handler.warn("declared variable is never read");
                }
                if !entry.is_written_to {
                    handler.warn("declared variable is never written");
                }
            }
        }
        Ok(annotated)
    }

    fn visit(&mut self, node: NodeId, scope: ScopeId) -> SemaResult<()> {
        let n = self.ast.get(node);
        if n.is_leaf() {
            // A bare identifier reached without an enclosing Assign node is
            // a read (e.g. the condition of an if/while, an operand).
            self.reference(node, scope, false)?;
            return Ok(());
        }

        match n.label {
            GrammarSymbol::Terminal(TokenKind::Assign) => {
                let children = self.ast.children(node);
                self.visit_lhs(children[0], scope)?;
                self.visit(children[1], scope)?;
            }
            GrammarSymbol::Terminal(TokenKind::If) => {
                let children = self.ast.children(node).to_vec();
                self.visit(children[0], scope)?;
                let body_scope = self.forest.new_scope(Some(scope));
                self.node_scope.insert(children[1], body_scope);
                self.visit(children[1], body_scope)?;
                // A third child is the else arm, whose block scopes on its own.
                if let Some(&else_node) = children.get(2) {
                    self.visit(else_node, scope)?;
                }
            }
            GrammarSymbol::Terminal(TokenKind::Else) => {
                let children = self.ast.children(node).to_vec();
                let else_scope = self.forest.new_scope(Some(scope));
                self.node_scope.insert(children[0], else_scope);
                self.visit(children[0], else_scope)?;
            }
            GrammarSymbol::Terminal(TokenKind::While) => {
                let children = self.ast.children(node).to_vec();
                self.visit(children[0], scope)?;
                let body_scope = self.forest.new_scope(Some(scope));
                self.node_scope.insert(children[1], body_scope);
                self.visit(children[1], body_scope)?;
            }
            GrammarSymbol::Terminal(TokenKind::For) => {
                let children = self.ast.children(node).to_vec();
                // ForInit's statements run in the enclosing scope: the loop
                // variable is expected to already be declared there.
                self.visit(children[0], scope)?;
                let body_scope = self.forest.new_scope(Some(scope));
                self.node_scope.insert(children[1], body_scope);
                self.visit(children[1], body_scope)?;
            }
            _ => {
                for child in self.ast.children(node).to_vec() {
                    self.visit(child, scope)?;
                }
            }
        }
        Ok(())
    }

    /// The left child of an assignment is either a fresh `Variable`
    /// declaration or a write to an already-declared identifier.
    fn visit_lhs(&mut self, node: NodeId, scope: ScopeId) -> SemaResult<()> {
        let n = self.ast.get(node);
        match n.label {
            GrammarSymbol::NonTerminal(nanoc_par::grammar::NonTerminal::Variable) => {
                self.declare(node, scope)
            }
            GrammarSymbol::Terminal(TokenKind::Identifier) => self.reference(node, scope, true),
            _ => unreachable!("assignment target is always a Variable or bare identifier"),
        }
    }

    fn declare(&mut self, node: NodeId, scope: ScopeId) -> SemaResult<()> {
        let children = self.ast.children(node);
        let name_tok = self.ast.get(*children.last().expect("Variable always has a name")).token().unwrap();
        let name = ident_symbol(name_tok);
        // The only data type this language has is `byte`; it's one of the
        // interner's pre-seeded keywords, so a plain lookup always finds it.
        let data_type = self.interner.get("byte").expect("\"byte\" is pre-interned");
        self.forest
            .declare(scope, name, data_type)
            .map_err(|_| SemaError::DuplicateDeclaration {
                name: self.interner.resolve(name).to_string(),
            })
    }

    fn reference(&mut self, node: NodeId, scope: ScopeId, is_write: bool) -> SemaResult<()> {
        let tok = self.ast.get(node).token().expect("identifier leaf");
        if tok.kind != TokenKind::Identifier {
            return Ok(());
        }
        let name = ident_symbol(tok);
        if self.forest.resolve(scope, name).is_none() {
            let name = self.interner.resolve(name).to_string();
            return Err(if is_write {
                SemaError::UndeclaredWrite { name }
            } else {
                SemaError::UndeclaredRead { name }
            });
        }
        if is_write {
            self.forest.mark_written(scope, name);
        } else {
            self.forest.mark_read(scope, name);
        }
        Ok(())
    }
}

fn ident_symbol(tok: &nanoc_lex::Token) -> nanoc_util::Symbol {
    match tok.value {
        TokenValue::Ident(s) => s,
        _ => unreachable!("declaration and reference tokens always carry an interned identifier"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanoc_lex::Lexer;
    use nanoc_par::Parser;
    use nanoc_util::Interner;

    fn annotate(src: &str) -> SemaResult<Annotated> {
        let mut interner = Interner::new();
        let tokens = Lexer::new(&mut interner).tokenize(src).unwrap();
        let (ast, root) = Parser::parse_program(tokens).unwrap();
        SymbolTableBuilder::build(&ast, root, &interner)
    }

    #[test]
    fn single_declaration_succeeds() {
        assert!(annotate("byte x = 5;").is_ok());
    }

    #[test]
    fn reading_before_declaration_fails() {
        let err = annotate("byte x = y;").unwrap_err();
        assert!(matches!(err, SemaError::UndeclaredRead { .. }));
    }

    #[test]
    fn redeclaration_in_same_scope_fails() {
        let err = annotate("byte x = 0; byte x = 1;").unwrap_err();
        assert!(matches!(err, SemaError::DuplicateDeclaration { .. }));
    }

    #[test]
    fn if_body_gets_its_own_child_scope() {
        let annotated = annotate("byte x = 1; if (x) { byte y = 2; };").unwrap();
        assert!(annotated.forest.iter().count() >= 2);
    }

    #[test]
    fn shadowing_a_variable_inside_a_while_body_is_allowed() {
        assert!(annotate("byte x = 1; while (x) { byte x = 0; };").is_ok());
    }

    #[test]
    fn variable_declared_inside_if_is_invisible_outside() {
        let err = annotate("byte x = 1; if (x) { byte y = 2; }; y = 3;").unwrap_err();
        assert!(matches!(err, SemaError::UndeclaredWrite { .. }));
    }

    #[test]
    fn then_and_else_bodies_scope_independently() {
        // The same name declared in both arms is two distinct entries.
        let src = "byte x = 1; if (x) { byte y = 2; } else { byte y = 3; };";
        assert!(annotate(src).is_ok());
    }

    #[test]
    fn else_body_cannot_see_then_body_declarations() {
        let err = annotate("byte x = 1; if (x) { byte y = 2; } else { y = 3; };").unwrap_err();
        assert!(matches!(err, SemaError::UndeclaredWrite { .. }));
    }
}
