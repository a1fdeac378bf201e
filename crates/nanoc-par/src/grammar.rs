//! The grammar table: every non-terminal's ordered list of alternative
//! rules, each rule an ordered sequence of grammar symbols.
//!
//! Layered precedence, outermost to innermost:
//! `Logical -> Bitwise -> Comparison -> Shift -> Negation -> Expression ->
//! Term -> Exp_factor -> Factor`. A layer either expands to its operator
//! form or simply falls through to the next layer (see
//! [`crate::Parser::parse`]'s collapse rules) — that fallthrough is how
//! precedence is enforced without an explicit associativity table.

use nanoc_lex::TokenKind as T;
use nanoc_util::FxHashMap;

use crate::ast::GrammarSymbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NonTerminal {
    Block,
    Section,
    ForLoop,
    ForInit,
    IfElse,
    Else,
    WhileLoop,
    Statement,
    Variable,
    Logical,
    Bitwise,
    Comparison,
    Shift,
    Negation,
    Expression,
    Term,
    ExpFactor,
    Factor,
}

pub type Rule = Vec<GrammarSymbol>;

fn nt(n: NonTerminal) -> GrammarSymbol {
    GrammarSymbol::NonTerminal(n)
}

fn t(k: T) -> GrammarSymbol {
    GrammarSymbol::Terminal(k)
}

/// Terminal kinds that, when present among a rule's resolved elements,
/// become the produced node's label (operators, keywords, assignment).
pub fn is_node_label_terminal(kind: T) -> bool {
    use T::*;
    matches!(
        kind,
        If | Else
            | While
            | For
            | Assign
            | Plus
            | Minus
            | Star
            | Slash
            | Percent
            | Caret
            | Eq
            | Neq
            | Leq
            | Geq
            | Lt
            | Gt
            | Not
            | LogicalOr
            | LogicalAnd
            | BitwiseOr
            | BitwiseAnd
            | Shl
            | Shr
    )
}

/// Terminal kinds discarded during AST construction.
pub fn is_skip_terminal(kind: T) -> bool {
    use T::*;
    matches!(kind, ParenOpen | ParenClose | BraceOpen | BraceClose | Semicolon)
}

/// Builds the full rule table, in the priority order each non-terminal's
/// alternatives are tried.
pub struct Grammar {
    rules: FxHashMap<NonTerminal, Vec<Rule>>,
}

impl Grammar {
    pub fn new() -> Self {
        use NonTerminal::*;
        let mut rules: FxHashMap<NonTerminal, Vec<Rule>> = FxHashMap::default();

        rules.insert(
            Block,
            vec![
                vec![nt(Section), nt(Block)],
                vec![nt(Section)],
            ],
        );

        rules.insert(
            Section,
            vec![
                vec![nt(Statement), t(T::Semicolon)],
                vec![nt(ForLoop), t(T::Semicolon)],
                vec![nt(IfElse), t(T::Semicolon)],
                vec![nt(WhileLoop), t(T::Semicolon)],
            ],
        );

        rules.insert(
            Statement,
            vec![vec![nt(Variable), t(T::Assign), nt(Logical)]],
        );

        rules.insert(
            Variable,
            vec![
                vec![t(T::DataType), t(T::Identifier)],
                vec![t(T::Identifier)],
            ],
        );

        rules.insert(
            ForLoop,
            vec![vec![
                t(T::For),
                nt(ForInit),
                t(T::BraceOpen),
                nt(Block),
                t(T::BraceClose),
            ]],
        );

        rules.insert(
            ForInit,
            vec![vec![
                t(T::ParenOpen),
                nt(Statement),
                t(T::Semicolon),
                nt(Comparison),
                t(T::Semicolon),
                nt(Statement),
                t(T::ParenClose),
            ]],
        );

        // The else-carrying alternative comes first: matching the bare form
        // when an `else` follows would leave the `else` token stranded with
        // no way back into this rule set.
        rules.insert(
            IfElse,
            vec![
                vec![
                    t(T::If),
                    t(T::ParenOpen),
                    nt(Logical),
                    t(T::ParenClose),
                    t(T::BraceOpen),
                    nt(Block),
                    t(T::BraceClose),
                    nt(Else),
                ],
                vec![
                    t(T::If),
                    t(T::ParenOpen),
                    nt(Logical),
                    t(T::ParenClose),
                    t(T::BraceOpen),
                    nt(Block),
                    t(T::BraceClose),
                ],
            ],
        );

        rules.insert(
            Else,
            vec![vec![t(T::Else), t(T::BraceOpen), nt(Block), t(T::BraceClose)]],
        );

        rules.insert(
            WhileLoop,
            vec![vec![
                t(T::While),
                t(T::ParenOpen),
                nt(Logical),
                t(T::ParenClose),
                t(T::BraceOpen),
                nt(Block),
                t(T::BraceClose),
            ]],
        );

        rules.insert(
            Logical,
            vec![
                vec![nt(Bitwise), t(T::LogicalOr), nt(Bitwise)],
                vec![nt(Bitwise), t(T::LogicalAnd), nt(Bitwise)],
                vec![nt(Bitwise)],
            ],
        );

        rules.insert(
            Bitwise,
            vec![
                vec![nt(Comparison), t(T::BitwiseOr), nt(Comparison)],
                vec![nt(Comparison), t(T::BitwiseAnd), nt(Comparison)],
                vec![nt(Comparison)],
            ],
        );

        rules.insert(
            Comparison,
            vec![
                vec![nt(Shift), t(T::Eq), nt(Shift)],
                vec![nt(Shift), t(T::Neq), nt(Shift)],
                vec![nt(Shift), t(T::Leq), nt(Shift)],
                vec![nt(Shift), t(T::Geq), nt(Shift)],
                vec![nt(Shift), t(T::Lt), nt(Shift)],
                vec![nt(Shift), t(T::Gt), nt(Shift)],
                vec![nt(Shift)],
            ],
        );

        rules.insert(
            Shift,
            vec![
                vec![nt(Negation), t(T::Shl), nt(Negation)],
                vec![nt(Negation), t(T::Shr), nt(Negation)],
                vec![nt(Negation)],
            ],
        );

        rules.insert(
            Negation,
            vec![vec![t(T::Not), nt(Expression)], vec![nt(Expression)]],
        );

        rules.insert(
            Expression,
            vec![
                vec![nt(Term), t(T::Plus), nt(Term)],
                vec![nt(Term), t(T::Minus), nt(Term)],
                vec![nt(Term)],
            ],
        );

        rules.insert(
            Term,
            vec![
                vec![nt(ExpFactor), t(T::Star), nt(ExpFactor)],
                vec![nt(ExpFactor), t(T::Slash), nt(ExpFactor)],
                vec![nt(ExpFactor), t(T::Percent), nt(ExpFactor)],
                vec![nt(ExpFactor)],
            ],
        );

        rules.insert(
            ExpFactor,
            vec![
                vec![nt(Factor), t(T::Caret), nt(Factor)],
                vec![nt(Factor)],
            ],
        );

        rules.insert(
            Factor,
            vec![
                vec![t(T::ParenOpen), nt(Logical), t(T::ParenClose)],
                vec![t(T::ByteLiteral)],
                vec![t(T::Identifier)],
            ],
        );

        Self { rules }
    }

    pub fn rules_for(&self, symbol: NonTerminal) -> Option<&[Rule]> {
        self.rules.get(&symbol).map(Vec::as_slice)
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new()
    }
}
