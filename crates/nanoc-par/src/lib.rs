//! Recursive grammar-driven parser.
//!
//! Unlike a hand-written predictive or Pratt parser, this engine is data
//! driven: [`grammar::Grammar`] holds, for every non-terminal, an ordered
//! list of alternative rules, and [`Parser::parse`] tries each alternative
//! in turn, backtracking on failure. Matching a rule produces a flat list of
//! resolved elements (tokens and child nodes); [`Parser::collapse`] then
//! decides the resulting node's label and children following the rules
//! below.
//!
//! # Node-collapse rules
//!
//! - Skip terminals (parens, braces, semicolons) are dropped.
//! - At most one "node-label terminal" (an operator, a keyword, assignment)
//!   may remain; it becomes the node's label and everything else becomes a
//!   child. Two is an error.
//! - With no node-label terminal and exactly one remaining element, that
//!   element is returned directly — this is how a precedence layer
//!   disappears when its operator form isn't used.
//! - With no node-label terminal and more than one remaining element, the
//!   rule's own non-terminal becomes the label.
//!
//! # Examples
//!
//! ```
//! use nanoc_lex::Lexer;
//! use nanoc_par::Parser;
//! use nanoc_util::Interner;
//!
//! let mut interner = Interner::new();
//! let tokens = Lexer::new(&mut interner).tokenize("byte x = 5;").unwrap();
//! let (ast, root) = Parser::parse_program(tokens).unwrap();
//! assert!(!ast.children(root).is_empty());
//! ```

pub mod ast;
pub mod grammar;

use nanoc_lex::Token;
use nanoc_util::error::{ParseError, ParseResult};

use ast::{Ast, AstNode, AstNodeData, GrammarSymbol, NodeId};
use grammar::{is_node_label_terminal, is_skip_terminal, Grammar, NonTerminal};

enum Element {
    Tok(Token),
    Node(NodeId),
}

/// Drives the grammar over a fixed token sequence, building an [`Ast`].
pub struct Parser {
    grammar: Grammar,
    tokens: Vec<Token>,
    ast: Ast,
}

impl Parser {
    /// Parses `tokens` from the `Block` start symbol, requiring every token
    /// to be consumed.
    pub fn parse_program(tokens: Vec<Token>) -> ParseResult<(Ast, NodeId)> {
        let mut parser = Parser {
            grammar: Grammar::new(),
            tokens,
            ast: Ast::new(),
        };
        let (root, _consumed) = parser.parse(NonTerminal::Block, 0, false)?;
        Ok((parser.ast, root))
    }

    /// Attempts every alternative of `symbol` in declared order, starting at
    /// `start`. Returns the produced node and the index just past the
    /// consumed tokens.
    fn parse(&mut self, symbol: NonTerminal, start: usize, allow_leftover: bool) -> ParseResult<(NodeId, usize)> {
        let rules = self
            .grammar
            .rules_for(symbol)
            .ok_or_else(|| ParseError::UnknownNonTerminal(format!("{symbol:?}")))?
            .to_vec();

        for rule in &rules {
            if let Some((elements, next)) = self.try_rule(rule, start, allow_leftover) {
                let node = self.collapse(symbol, elements)?;
                return Ok((node, next));
            }
        }

        Err(ParseError::NoAlternativeMatched {
            nt: format!("{symbol:?}"),
            index: start,
        })
    }

    /// Tries to match a single rule starting at `start`. Returns `None`
    /// (never a hard error) if the rule does not apply here, so the caller
    /// can backtrack to the next alternative.
    fn try_rule(
        &mut self,
        rule: &[GrammarSymbol],
        start: usize,
        allow_leftover: bool,
    ) -> Option<(Vec<Element>, usize)> {
        let mut elements = Vec::with_capacity(rule.len());
        let mut cursor = start;

        for (i, symbol) in rule.iter().enumerate() {
            let is_last = i == rule.len() - 1;
            match symbol {
                GrammarSymbol::Terminal(kind) => {
                    let tok = self.tokens.get(cursor)?;
                    if tok.kind != *kind {
                        return None;
                    }
                    elements.push(Element::Tok(*tok));
                    cursor += 1;
                }
                GrammarSymbol::NonTerminal(nt) => {
                    let child_allow_leftover = if is_last { allow_leftover } else { true };
                    let (node, next) = self.parse(*nt, cursor, child_allow_leftover).ok()?;
                    elements.push(Element::Node(node));
                    cursor = next;
                }
            }
        }

        if !allow_leftover && cursor != self.tokens.len() {
            return None;
        }
        Some((elements, cursor))
    }

    /// Applies the node-collapse rules to a successfully matched rule's
    /// resolved elements.
    fn collapse(&mut self, nt: NonTerminal, elements: Vec<Element>) -> ParseResult<NodeId> {
        if elements.is_empty() {
            return Err(ParseError::UnexpectedEof { nt: format!("{nt:?}") });
        }

        let mut label: Option<GrammarSymbol> = None;
        let mut children: Vec<NodeId> = Vec::new();

        for element in elements {
            match element {
                Element::Tok(tok) => {
                    if is_node_label_terminal(tok.kind) {
                        if label.is_some() {
                            return Err(ParseError::DuplicateNodeLabel { nt: format!("{nt:?}") });
                        }
                        label = Some(GrammarSymbol::Terminal(tok.kind));
                    } else if is_skip_terminal(tok.kind) {
                        continue;
                    } else {
                        children.push(self.ast.alloc(AstNode {
                            label: GrammarSymbol::Terminal(tok.kind),
                            data: AstNodeData::Leaf(tok),
                        }));
                    }
                }
                Element::Node(id) => children.push(id),
            }
        }

        match label {
            Some(label) => Ok(self.ast.alloc(AstNode {
                label,
                data: AstNodeData::Internal(children),
            })),
            None if children.is_empty() => {
                Err(ParseError::UnexpectedEof { nt: format!("{nt:?}") })
            }
            None if children.len() == 1 => Ok(children[0]),
            None => Ok(self.ast.alloc(AstNode {
                label: GrammarSymbol::NonTerminal(nt),
                data: AstNodeData::Internal(children),
            })),
        }
    }
}
