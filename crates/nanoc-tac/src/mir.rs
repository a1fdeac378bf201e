//! Three-address code: the flat, linear form produced by lowering and
//! consumed by register allocation.

use nanoc_util::{Interner, Symbol};

/// A TAC value: either a named variable/temporary or an 8-bit literal.
/// Absence of a value is modeled as `Option<Operand>` at the call sites
/// that allow it, never as a sentinel inside this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Ident(Symbol),
    Literal(u8),
}

impl Operand {
    pub fn as_literal(self) -> Option<u8> {
        match self {
            Operand::Literal(n) => Some(n),
            Operand::Ident(_) => None,
        }
    }

    fn render(self, interner: &Interner) -> String {
        match self {
            Operand::Ident(s) => interner.resolve(s).to_string(),
            Operand::Literal(n) => n.to_string(),
        }
    }
}

/// One-to-one-mappable source operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Add,
    Sub,
    And,
    Or,
    Ls,
    Rs,
}

impl Opcode {
    fn name(self) -> &'static str {
        match self {
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Ls => "LS",
            Opcode::Rs => "RS",
        }
    }
}

/// Conditional-branch test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    /// Branch if `lhs == rhs`.
    Bre,
    /// Branch if `lhs < rhs`.
    Brlt,
}

impl BranchKind {
    fn name(self) -> &'static str {
        match self {
            BranchKind::Bre => "BRE",
            BranchKind::Brlt => "BRLT",
        }
    }
}

/// One TAC instruction. A tagged union rather than one struct with optional
/// fields: each variant only carries the operands it actually uses. `Op`'s
/// second operand is optional because the shift opcodes also come in a
/// single-operand shift-by-one form (the multiply micro-routine emits it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionKind {
    Assign { target: Symbol, value: Operand },
    Op { target: Symbol, op: Opcode, lhs: Operand, rhs: Option<Operand> },
    Branch { kind: BranchKind, target_label: String, lhs: Operand, rhs: Operand },
}

/// An instruction plus the label naming it as a branch destination, if any.
/// Labels are unique per program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub label: Option<String>,
    pub kind: InstructionKind,
}

impl Instruction {
    pub fn is_branch(&self) -> bool {
        matches!(self.kind, InstructionKind::Branch { .. })
    }

    /// The branch target this instruction names, if it is a branch.
    pub fn branch_target(&self) -> Option<&str> {
        match &self.kind {
            InstructionKind::Branch { target_label, .. } => Some(target_label),
            _ => None,
        }
    }

    /// Renders the debug text form: `target = value`, `target = op1 OP op2`
    /// or `OP target op1 op2` (branches), with a leading `label:` if one is
    /// attached.
    pub fn render(&self, interner: &Interner) -> String {
        let body = match &self.kind {
            InstructionKind::Assign { target, value } => {
                format!("{} = {}", interner.resolve(*target), value.render(interner))
            }
            InstructionKind::Op { target, op, lhs, rhs } => {
                let mut text = format!(
                    "{} = {} {}",
                    interner.resolve(*target),
                    lhs.render(interner),
                    op.name()
                );
                if let Some(rhs) = rhs {
                    text.push(' ');
                    text.push_str(&rhs.render(interner));
                }
                text
            }
            InstructionKind::Branch { kind, target_label, lhs, rhs } => format!(
                "{} {target_label} {} {}",
                kind.name(),
                lhs.render(interner),
                rhs.render(interner)
            ),
        };
        match &self.label {
            Some(label) => format!("{label}: {body}"),
            None => body,
        }
    }
}

/// Renders a whole program, one instruction per line.
pub fn render_program(program: &[Instruction], interner: &Interner) -> String {
    program
        .iter()
        .map(|i| i.render(interner))
        .collect::<Vec<_>>()
        .join("\n")
}
