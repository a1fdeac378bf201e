//! Lowers a scope-annotated AST into a flat list of three-address code.
//!
//! `TacGenerator` walks the tree the same way `nanoc-sem` does (control-flow
//! nodes identified by label, not by an explicit block wrapper) and drives
//! an [`InstructionFactory`] to emit instructions, delegating operators with
//! no native opcode to [`ExpressionLowerer`].
//!
//! # Examples
//!
//! ```
//! use nanoc_lex::Lexer;
//! use nanoc_par::Parser;
//! use nanoc_tac::TacGenerator;
//! use nanoc_util::Interner;
//!
//! let mut interner = Interner::new();
//! let tokens = Lexer::new(&mut interner).tokenize("byte x = 1 + 2;").unwrap();
//! let (ast, root) = Parser::parse_program(tokens).unwrap();
//! let program = TacGenerator::generate(&ast, root, &mut interner).unwrap();
//! assert_eq!(program.len(), 1);
//! ```

pub mod builder;
pub mod lowering;
pub mod mir;

use nanoc_lex::{Token, TokenKind, TokenValue};
use nanoc_par::ast::{Ast, GrammarSymbol, NodeId};
use nanoc_par::grammar::NonTerminal;
use nanoc_util::error::{IrError, IrResult};
use nanoc_util::{Interner, Symbol};

use builder::InstructionFactory;
use lowering::ExpressionLowerer;
use mir::{BranchKind, Instruction, InstructionKind, Opcode, Operand};

pub struct TacGenerator<'a> {
    ast: &'a Ast,
}

impl<'a> TacGenerator<'a> {
    pub fn generate(ast: &'a Ast, root: NodeId, interner: &mut Interner) -> IrResult<Vec<Instruction>> {
        let mut factory = InstructionFactory::new(interner);
        let generator = TacGenerator { ast };
        generator.lower_node(root, &mut factory)?;
        Ok(factory.finish())
    }

    /// Lowers `node`, recursing through `Block`-labelled nodes of any depth
    /// and falling through to a single statement once the chain bottoms out
    /// (a one-statement program never gets wrapped in a `Block` node).
    fn lower_node(&self, node: NodeId, f: &mut InstructionFactory) -> IrResult<()> {
        if self.ast.label(node) == GrammarSymbol::NonTerminal(NonTerminal::Block) {
            for child in self.ast.children(node).to_vec() {
                self.lower_node(child, f)?;
            }
            return Ok(());
        }
        self.lower_statement(node, f)
    }

    fn lower_statement(&self, node: NodeId, f: &mut InstructionFactory) -> IrResult<()> {
        match self.ast.label(node) {
            GrammarSymbol::Terminal(TokenKind::Assign) => self.lower_assignment(node, f),
            GrammarSymbol::Terminal(TokenKind::If) => self.lower_if(node, f),
            GrammarSymbol::Terminal(TokenKind::While) => self.lower_while(node, f),
            GrammarSymbol::Terminal(TokenKind::For) => self.lower_for(node, f),
            other => Err(IrError::MalformedControlFlow {
                construct: format!("{other:?}"),
                detail: "expected an assignment or control-flow statement".to_string(),
            }),
        }
    }

    fn lower_assignment(&self, node: NodeId, f: &mut InstructionFactory) -> IrResult<()> {
        let children = self.ast.children(node).to_vec();
        let target = self.assignment_target(children[0])?;
        self.lower_rhs_into(target, children[1], f)
    }

    fn assignment_target(&self, node: NodeId) -> IrResult<Symbol> {
        match self.ast.label(node) {
            GrammarSymbol::NonTerminal(NonTerminal::Variable) => {
                let children = self.ast.children(node);
                let name_node = *children.last().ok_or(IrError::MissingOperand)?;
                let tok = self.ast.get(name_node).token().ok_or(IrError::MissingOperand)?;
                Ok(ident_symbol(tok))
            }
            GrammarSymbol::Terminal(TokenKind::Identifier) => {
                let tok = self.ast.get(node).token().ok_or(IrError::MissingOperand)?;
                Ok(ident_symbol(tok))
            }
            other => Err(IrError::MalformedControlFlow {
                construct: format!("{other:?}"),
                detail: "assignment target is always a Variable or bare identifier".to_string(),
            }),
        }
    }

    /// Lowers `node` as the right-hand side of an assignment to `target`.
    /// Skips the intermediate temporary a one-to-one opcode node would
    /// otherwise allocate, per the direct-emission rule.
    fn lower_rhs_into(&self, target: Symbol, node: NodeId, f: &mut InstructionFactory) -> IrResult<()> {
        let label = self.ast.label(node);
        let children = self.ast.children(node);
        if let Some(opcode) = one_to_one_opcode(label, children.len()) {
            let children = children.to_vec();
            let lhs = self.lower_expression(children[0], f)?;
            let rhs = self.lower_expression(children[1], f)?;
            let value = match (lhs.as_literal(), rhs.as_literal()) {
                (Some(a), Some(b)) => Operand::Literal(fold_opcode(opcode, a, b)),
                _ => {
                    f.append(InstructionKind::Op { target, op: opcode, lhs, rhs: Some(rhs) });
                    return Ok(());
                }
            };
            f.append(InstructionKind::Assign { target, value });
            return Ok(());
        }

        let value = self.lower_expression(node, f)?;
        f.append(InstructionKind::Assign { target, value });
        Ok(())
    }

    fn lower_expression(&self, node: NodeId, f: &mut InstructionFactory) -> IrResult<Operand> {
        let n = self.ast.get(node);
        if n.is_leaf() {
            let tok = n.token().expect("leaf node always carries a token");
            return match tok.kind {
                TokenKind::Identifier => Ok(Operand::Ident(ident_symbol(tok))),
                TokenKind::ByteLiteral => Ok(Operand::Literal(byte_value(tok))),
                other => Err(IrError::MalformedControlFlow {
                    construct: format!("{other:?}"),
                    detail: "expected an identifier or byte literal".to_string(),
                }),
            };
        }

        let label = n.label;
        let children = self.ast.children(node).to_vec();

        if children.len() == 1 {
            let operand = self.lower_expression(children[0], f)?;
            return match label {
                GrammarSymbol::Terminal(TokenKind::Not) => Ok(ExpressionLowerer::logical_not(f, operand)),
                other => Err(IrError::MalformedControlFlow {
                    construct: format!("{other:?}"),
                    detail: "unary operator node with an unrecognised label".to_string(),
                }),
            };
        }

        if let Some(opcode) = one_to_one_opcode(label, children.len()) {
            let lhs = self.lower_expression(children[0], f)?;
            let rhs = self.lower_expression(children[1], f)?;
            return Ok(match (lhs.as_literal(), rhs.as_literal()) {
                (Some(a), Some(b)) => Operand::Literal(fold_opcode(opcode, a, b)),
                _ => {
                    let t = f.new_temp("t");
                    f.append(InstructionKind::Op { target: t, op: opcode, lhs, rhs: Some(rhs) });
                    Operand::Ident(t)
                }
            });
        }

        if children.len() == 2 {
            let lhs = self.lower_expression(children[0], f)?;
            let rhs = self.lower_expression(children[1], f)?;
            return match label {
                GrammarSymbol::Terminal(TokenKind::Star) => Ok(ExpressionLowerer::multiply(f, lhs, rhs)),
                GrammarSymbol::Terminal(TokenKind::Slash) => ExpressionLowerer::divide_or_modulo(f, lhs, rhs, false),
                GrammarSymbol::Terminal(TokenKind::Percent) => ExpressionLowerer::divide_or_modulo(f, lhs, rhs, true),
                GrammarSymbol::Terminal(TokenKind::Caret) => Ok(ExpressionLowerer::exponent(f, lhs, rhs)),
                GrammarSymbol::Terminal(TokenKind::Eq) => Ok(ExpressionLowerer::equals(f, lhs, rhs)),
                GrammarSymbol::Terminal(TokenKind::Neq) => Ok(ExpressionLowerer::not_equals(f, lhs, rhs)),
                GrammarSymbol::Terminal(TokenKind::Leq) => Ok(ExpressionLowerer::leq(f, lhs, rhs)),
                GrammarSymbol::Terminal(TokenKind::Geq) => Ok(ExpressionLowerer::geq(f, lhs, rhs)),
                GrammarSymbol::Terminal(TokenKind::Lt) => Ok(ExpressionLowerer::less_than(f, lhs, rhs)),
                GrammarSymbol::Terminal(TokenKind::Gt) => Ok(ExpressionLowerer::greater_than(f, lhs, rhs)),
                GrammarSymbol::Terminal(TokenKind::LogicalOr) => Ok(ExpressionLowerer::logical_or(f, lhs, rhs)),
                GrammarSymbol::Terminal(TokenKind::LogicalAnd) => Ok(ExpressionLowerer::logical_and(f, lhs, rhs)),
                other => Err(IrError::MalformedControlFlow {
                    construct: format!("{other:?}"),
                    detail: "binary operator node with an unrecognised label".to_string(),
                }),
            };
        }

        Err(IrError::MalformedControlFlow {
            construct: format!("{label:?}"),
            detail: format!("expression node with {} children", children.len()),
        })
    }

    /// `if` nodes carry two children (condition, then-body) or three, the
    /// third being an `else`-labelled node wrapping the else body.
    fn lower_if(&self, node: NodeId, f: &mut InstructionFactory) -> IrResult<()> {
        let children = self.ast.children(node).to_vec();
        if children.len() != 2 && children.len() != 3 {
            return Err(IrError::MalformedControlFlow {
                construct: "if".to_string(),
                detail: format!("expected 2 or 3 children, found {}", children.len()),
            });
        }

        let cond = self.lower_expression(children[0], f)?;
        let branch_past_then = f.emit_placeholder_branch(BranchKind::Bre, cond, Operand::Literal(0));
        self.lower_node(children[1], f)?;

        let Some(&else_node) = children.get(2) else {
            f.set_branch_to_next_label(branch_past_then, "if_end");
            return Ok(());
        };

        if self.ast.label(else_node) != GrammarSymbol::Terminal(TokenKind::Else) {
            return Err(IrError::MalformedControlFlow {
                construct: "if".to_string(),
                detail: "third child of an if node must be its else node".to_string(),
            });
        }
        let else_body = *self.ast.children(else_node).first().ok_or_else(|| {
            IrError::MalformedControlFlow {
                construct: "else".to_string(),
                detail: "else node has no body".to_string(),
            }
        })?;

        let branch_to_end = f.emit_unconditional_branch(builder::PLACEHOLDER.to_string());
        f.set_branch_to_next_label(branch_past_then, "else_body");
        self.lower_node(else_body, f)?;
        f.set_branch_to_next_label(branch_to_end, "if_end");
        Ok(())
    }

    fn lower_while(&self, node: NodeId, f: &mut InstructionFactory) -> IrResult<()> {
        let children = self.ast.children(node).to_vec();
        let cond_label = f.new_label("L_cond");
        f.queue_next_instruction_label(cond_label.clone());
        let cond = self.lower_expression(children[0], f)?;
        let branch = f.emit_placeholder_branch(BranchKind::Bre, cond, Operand::Literal(0));
        self.lower_node(children[1], f)?;
        f.emit_unconditional_branch(cond_label);
        f.set_branch_to_next_label(branch, "L_end");
        Ok(())
    }

    fn lower_for(&self, node: NodeId, f: &mut InstructionFactory) -> IrResult<()> {
        let children = self.ast.children(node).to_vec();
        let for_init = children[0];
        let init_children = self.ast.children(for_init).to_vec();
        if init_children.len() != 3 {
            return Err(IrError::MalformedControlFlow {
                construct: "ForInit".to_string(),
                detail: "expected an init assignment, a condition, and a step assignment".to_string(),
            });
        }

        self.lower_statement(init_children[0], f)?;

        let cond_label = f.new_label("L_cond");
        f.queue_next_instruction_label(cond_label.clone());
        let cond = self.lower_expression(init_children[1], f)?;
        let branch = f.emit_placeholder_branch(BranchKind::Bre, cond, Operand::Literal(0));
        self.lower_node(children[1], f)?;
        self.lower_statement(init_children[2], f)?;
        f.emit_unconditional_branch(cond_label);
        f.set_branch_to_next_label(branch, "L_end");
        Ok(())
    }
}

fn one_to_one_opcode(label: GrammarSymbol, child_count: usize) -> Option<Opcode> {
    match label {
        GrammarSymbol::Terminal(TokenKind::Plus) if child_count == 2 => Some(Opcode::Add),
        GrammarSymbol::Terminal(TokenKind::Minus) if child_count == 2 => Some(Opcode::Sub),
        GrammarSymbol::Terminal(TokenKind::BitwiseAnd) if child_count == 2 => Some(Opcode::And),
        GrammarSymbol::Terminal(TokenKind::BitwiseOr) if child_count == 2 => Some(Opcode::Or),
        GrammarSymbol::Terminal(TokenKind::Shl) if child_count == 2 => Some(Opcode::Ls),
        GrammarSymbol::Terminal(TokenKind::Shr) if child_count == 2 => Some(Opcode::Rs),
        _ => None,
    }
}

fn fold_opcode(opcode: Opcode, a: u8, b: u8) -> u8 {
    match opcode {
        Opcode::Add => a.wrapping_add(b),
        Opcode::Sub => a.wrapping_sub(b),
        Opcode::And => a & b,
        Opcode::Or => a | b,
        // Shifting a byte by 8 or more leaves nothing behind.
        Opcode::Ls => a.checked_shl(b as u32).unwrap_or(0),
        Opcode::Rs => a.checked_shr(b as u32).unwrap_or(0),
    }
}

fn ident_symbol(tok: &Token) -> Symbol {
    match tok.value {
        TokenValue::Ident(s) => s,
        _ => unreachable!("identifier token always carries an interned name"),
    }
}

fn byte_value(tok: &Token) -> u8 {
    match tok.value {
        TokenValue::Byte(b) => b,
        _ => unreachable!("byte literal token always carries its value"),
    }
}
