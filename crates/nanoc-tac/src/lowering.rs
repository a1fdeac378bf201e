//! Lowers operators that have no one-to-one TAC opcode into short
//! instruction sequences, using the target machine's native `ADD`/`SUB`/
//! `AND`/`OR`/shift/branch vocabulary.
//!
//! Every method here constant-folds when all of its inputs are literals,
//! so an expression built entirely out of literals never emits a single
//! instruction.

use nanoc_util::error::{IrError, IrResult};

use crate::builder::InstructionFactory;
use crate::mir::{BranchKind, InstructionKind, Opcode, Operand};

pub struct ExpressionLowerer;

impl ExpressionLowerer {
    pub fn multiply(f: &mut InstructionFactory, op1: Operand, op2: Operand) -> Operand {
        if let (Some(a), Some(b)) = (op1.as_literal(), op2.as_literal()) {
            return Operand::Literal(a.wrapping_mul(b));
        }

        let result = f.new_temp("mul_result");
        let mplier = f.new_temp("mplier");
        let mcand = f.new_temp("mcand");
        let bits = f.new_temp("bits");
        let lsb = f.new_temp("lsb");

        f.append(InstructionKind::Assign { target: result, value: Operand::Literal(0) });
        f.append(InstructionKind::Assign { target: mplier, value: op1 });
        f.append(InstructionKind::Assign { target: mcand, value: op2 });
        f.append(InstructionKind::Assign { target: bits, value: Operand::Literal(8) });

        let loop_label = f.new_label("mul_loop");
        f.queue_next_instruction_label(loop_label.clone());
        f.append(InstructionKind::Op {
            target: lsb,
            op: Opcode::And,
            lhs: Operand::Ident(mplier),
            rhs: Some(Operand::Literal(0xFE)),
        });
        let skip_add = f.emit_placeholder_branch(BranchKind::Bre, Operand::Ident(lsb), Operand::Literal(0));
        f.append(InstructionKind::Op {
            target: result,
            op: Opcode::Add,
            lhs: Operand::Ident(result),
            rhs: Some(Operand::Ident(mcand)),
        });

        f.set_branch_to_next_label(skip_add, "mul_shift");
        f.append(InstructionKind::Op { target: mcand, op: Opcode::Ls, lhs: Operand::Ident(mcand), rhs: None });
        f.append(InstructionKind::Op { target: mplier, op: Opcode::Rs, lhs: Operand::Ident(mplier), rhs: None });
        f.append(InstructionKind::Op { target: bits, op: Opcode::Sub, lhs: Operand::Ident(bits), rhs: Some(Operand::Literal(1)) });
        f.append(InstructionKind::Branch {
            kind: BranchKind::Brlt,
            target_label: loop_label,
            lhs: Operand::Literal(0),
            rhs: Operand::Ident(bits),
        });

        Operand::Ident(result)
    }

    /// `^`. No native opcode and no dedicated micro-routine either — built
    /// out of repeated calls to [`Self::multiply`], the same way
    /// divide/modulo share one loop skeleton.
    pub fn exponent(f: &mut InstructionFactory, base: Operand, exp: Operand) -> Operand {
        if let (Some(b), Some(e)) = (base.as_literal(), exp.as_literal()) {
            return Operand::Literal(b.wrapping_pow(e as u32));
        }

        let result = f.new_temp("pow_result");
        let counter = f.new_temp("pow_counter");
        f.append(InstructionKind::Assign { target: result, value: Operand::Literal(1) });
        f.append(InstructionKind::Assign { target: counter, value: exp });

        let loop_label = f.new_label("pow_loop");
        f.queue_next_instruction_label(loop_label.clone());
        let exit = f.emit_placeholder_branch(BranchKind::Bre, Operand::Ident(counter), Operand::Literal(0));
        let product = Self::multiply(f, Operand::Ident(result), base);
        f.append(InstructionKind::Assign { target: result, value: product });
        f.append(InstructionKind::Op { target: counter, op: Opcode::Sub, lhs: Operand::Ident(counter), rhs: Some(Operand::Literal(1)) });
        f.append(InstructionKind::Branch {
            kind: BranchKind::Bre,
            target_label: loop_label,
            lhs: Operand::Literal(0),
            rhs: Operand::Literal(0),
        });
        f.set_branch_to_next_label(exit, "pow_end");

        Operand::Ident(result)
    }

    /// Shared implementation for `/` and `%`. `want_remainder` selects which
    /// of the two accumulators is returned.
    pub fn divide_or_modulo(
        f: &mut InstructionFactory,
        op1: Operand,
        op2: Operand,
        want_remainder: bool,
    ) -> IrResult<Operand> {
        if op2.as_literal() == Some(0) {
            return Err(IrError::DivisionByZero);
        }
        if let (Some(a), Some(b)) = (op1.as_literal(), op2.as_literal()) {
            return Ok(Operand::Literal(if want_remainder { a % b } else { a / b }));
        }

        let result = f.new_temp("div_result");
        let dividend = f.new_temp("dividend");
        let divisor = f.new_temp("divisor");

        f.append(InstructionKind::Assign { target: result, value: Operand::Literal(0) });
        f.append(InstructionKind::Assign { target: dividend, value: op1 });
        f.append(InstructionKind::Assign { target: divisor, value: op2 });

        let loop_label = f.new_label("div_loop");
        f.queue_next_instruction_label(loop_label.clone());
        let exit = f.emit_placeholder_branch(BranchKind::Brlt, Operand::Ident(dividend), Operand::Ident(divisor));
        f.append(InstructionKind::Op { target: result, op: Opcode::Add, lhs: Operand::Ident(result), rhs: Some(Operand::Literal(1)) });
        f.append(InstructionKind::Op { target: dividend, op: Opcode::Sub, lhs: Operand::Ident(dividend), rhs: Some(Operand::Ident(divisor)) });
        f.append(InstructionKind::Branch {
            kind: BranchKind::Bre,
            target_label: loop_label,
            lhs: Operand::Literal(0),
            rhs: Operand::Literal(0),
        });
        f.set_branch_to_next_label(exit, "div_end");

        Ok(Operand::Ident(if want_remainder { dividend } else { result }))
    }

    pub fn equals(f: &mut InstructionFactory, a: Operand, b: Operand) -> Operand {
        if let (Some(x), Some(y)) = (a.as_literal(), b.as_literal()) {
            return Operand::Literal((x == y) as u8);
        }
        Self::comparison_skeleton(f, "eq", 1, BranchKind::Bre, a, b)
    }

    pub fn not_equals(f: &mut InstructionFactory, a: Operand, b: Operand) -> Operand {
        if let (Some(x), Some(y)) = (a.as_literal(), b.as_literal()) {
            return Operand::Literal((x != y) as u8);
        }
        Self::comparison_skeleton(f, "neq", 0, BranchKind::Bre, a, b)
    }

    pub fn less_than(f: &mut InstructionFactory, a: Operand, b: Operand) -> Operand {
        if let (Some(x), Some(y)) = (a.as_literal(), b.as_literal()) {
            return Operand::Literal((x < y) as u8);
        }
        Self::comparison_skeleton(f, "lt", 1, BranchKind::Brlt, a, b)
    }

    pub fn greater_than(f: &mut InstructionFactory, a: Operand, b: Operand) -> Operand {
        if let (Some(x), Some(y)) = (a.as_literal(), b.as_literal()) {
            return Operand::Literal((x > y) as u8);
        }
        // operand swap: a > b  <=>  b < a
        Self::comparison_skeleton(f, "gt", 1, BranchKind::Brlt, b, a)
    }

    pub fn leq(f: &mut InstructionFactory, a: Operand, b: Operand) -> Operand {
        if let (Some(x), Some(y)) = (a.as_literal(), b.as_literal()) {
            return Operand::Literal((x <= y) as u8);
        }
        // a <= b  <=>  !(b < a)
        Self::comparison_skeleton(f, "leq", 0, BranchKind::Brlt, b, a)
    }

    pub fn geq(f: &mut InstructionFactory, a: Operand, b: Operand) -> Operand {
        if let (Some(x), Some(y)) = (a.as_literal(), b.as_literal()) {
            return Operand::Literal((x >= y) as u8);
        }
        Self::comparison_skeleton(f, "geq", 0, BranchKind::Brlt, a, b)
    }

    /// `result = init; <branch> end, lhs, rhs; result = 1 - init; end:`
    fn comparison_skeleton(
        f: &mut InstructionFactory,
        hint: &str,
        init: u8,
        kind: BranchKind,
        lhs: Operand,
        rhs: Operand,
    ) -> Operand {
        let result = f.new_temp(&format!("{hint}_result"));
        f.append(InstructionKind::Assign { target: result, value: Operand::Literal(init) });
        let branch = f.append(InstructionKind::Branch {
            kind,
            target_label: crate::builder::PLACEHOLDER.to_string(),
            lhs,
            rhs,
        });
        f.append(InstructionKind::Assign { target: result, value: Operand::Literal(1 - init) });
        f.set_branch_to_next_label(branch, &format!("{hint}_end"));
        Operand::Ident(result)
    }

    pub fn logical_not(f: &mut InstructionFactory, op: Operand) -> Operand {
        if let Some(x) = op.as_literal() {
            return Operand::Literal((x > 0) as u8);
        }
        let result = f.new_temp("not_result");
        f.append(InstructionKind::Assign { target: result, value: Operand::Literal(1) });
        let branch = f.emit_placeholder_branch(BranchKind::Brlt, Operand::Literal(0), op);
        f.append(InstructionKind::Assign { target: result, value: Operand::Literal(0) });
        f.set_branch_to_next_label(branch, "not_end");
        Operand::Ident(result)
    }

    pub fn logical_or(f: &mut InstructionFactory, a: Operand, b: Operand) -> Operand {
        if matches!(a.as_literal(), Some(n) if n > 0) || matches!(b.as_literal(), Some(n) if n > 0) {
            return Operand::Literal(1);
        }
        if a.as_literal() == Some(0) {
            return b;
        }
        if b.as_literal() == Some(0) {
            return a;
        }

        let result = f.new_temp("or_result");
        f.append(InstructionKind::Assign { target: result, value: Operand::Literal(1) });
        let branch_a = f.emit_placeholder_branch(BranchKind::Brlt, Operand::Literal(0), a);
        let branch_b = f.emit_placeholder_branch(BranchKind::Brlt, Operand::Literal(0), b);
        f.append(InstructionKind::Assign { target: result, value: Operand::Literal(0) });
        // Both early-out branches converge on the same end label.
        f.set_branch_to_next_label(branch_a, "or_end");
        f.set_branch_to_next_label(branch_b, "or_end");
        Operand::Ident(result)
    }

    pub fn logical_and(f: &mut InstructionFactory, a: Operand, b: Operand) -> Operand {
        if a.as_literal() == Some(0) || b.as_literal() == Some(0) {
            return Operand::Literal(0);
        }
        if matches!(a.as_literal(), Some(n) if n > 0) {
            return b;
        }
        if matches!(b.as_literal(), Some(n) if n > 0) {
            return a;
        }

        let result = f.new_temp("and_result");
        f.append(InstructionKind::Assign { target: result, value: Operand::Literal(0) });
        let branch_a = f.emit_placeholder_branch(BranchKind::Brlt, Operand::Literal(0), a);
        let branch_b = f.emit_placeholder_branch(BranchKind::Brlt, Operand::Literal(0), b);
        f.append(InstructionKind::Assign { target: result, value: Operand::Literal(1) });
        f.set_branch_to_next_label(branch_a, "and_end");
        f.set_branch_to_next_label(branch_b, "and_end");
        Operand::Ident(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanoc_util::Interner;

    #[test]
    fn multiply_constant_folds() {
        let mut interner = Interner::new();
        let mut f = InstructionFactory::new(&mut interner);
        let result = ExpressionLowerer::multiply(&mut f, Operand::Literal(6), Operand::Literal(7));
        assert_eq!(result, Operand::Literal(42));
        assert!(f.finish().is_empty());
    }

    #[test]
    fn multiply_wraps_on_overflow() {
        let mut interner = Interner::new();
        let mut f = InstructionFactory::new(&mut interner);
        let result = ExpressionLowerer::multiply(&mut f, Operand::Literal(200), Operand::Literal(2));
        assert_eq!(result, Operand::Literal(200u8.wrapping_mul(2)));
    }

    #[test]
    fn exponent_constant_folds() {
        let mut interner = Interner::new();
        let mut f = InstructionFactory::new(&mut interner);
        let result = ExpressionLowerer::exponent(&mut f, Operand::Literal(3), Operand::Literal(4));
        assert_eq!(result, Operand::Literal(81));
        assert!(f.finish().is_empty());
    }

    #[test]
    fn divide_by_literal_zero_errors() {
        let mut interner = Interner::new();
        let mut f = InstructionFactory::new(&mut interner);
        let err = ExpressionLowerer::divide_or_modulo(&mut f, Operand::Literal(4), Operand::Literal(0), false).unwrap_err();
        assert!(matches!(err, IrError::DivisionByZero));
    }

    #[test]
    fn divide_constant_folds() {
        let mut interner = Interner::new();
        let mut f = InstructionFactory::new(&mut interner);
        let result = ExpressionLowerer::divide_or_modulo(&mut f, Operand::Literal(17), Operand::Literal(5), false).unwrap();
        assert_eq!(result, Operand::Literal(3));
    }

    #[test]
    fn modulo_constant_folds() {
        let mut interner = Interner::new();
        let mut f = InstructionFactory::new(&mut interner);
        let result = ExpressionLowerer::divide_or_modulo(&mut f, Operand::Literal(17), Operand::Literal(5), true).unwrap();
        assert_eq!(result, Operand::Literal(2));
    }

    #[test]
    fn equals_constant_folds() {
        let mut interner = Interner::new();
        let mut f = InstructionFactory::new(&mut interner);
        assert_eq!(ExpressionLowerer::equals(&mut f, Operand::Literal(3), Operand::Literal(3)), Operand::Literal(1));
        assert_eq!(ExpressionLowerer::equals(&mut f, Operand::Literal(3), Operand::Literal(4)), Operand::Literal(0));
    }

    #[test]
    fn logical_or_short_circuits_on_literal_zero() {
        let mut interner = Interner::new();
        let x = Operand::Ident(interner.intern("x"));
        let mut f = InstructionFactory::new(&mut interner);
        let result = ExpressionLowerer::logical_or(&mut f, Operand::Literal(0), x);
        assert_eq!(result, x);
        assert!(f.finish().is_empty());
    }

    #[test]
    fn logical_and_short_circuits_on_literal_nonzero() {
        let mut interner = Interner::new();
        let x = Operand::Ident(interner.intern("x"));
        let mut f = InstructionFactory::new(&mut interner);
        let result = ExpressionLowerer::logical_and(&mut f, Operand::Literal(5), x);
        assert_eq!(result, x);
    }

    #[test]
    fn non_literal_comparison_emits_instructions() {
        let mut interner = Interner::new();
        let x = Operand::Ident(interner.intern("x"));
        let y = Operand::Ident(interner.intern("y"));
        let mut f = InstructionFactory::new(&mut interner);
        let result = ExpressionLowerer::less_than(&mut f, x, y);
        assert!(matches!(result, Operand::Ident(_)));
        assert!(!f.finish().is_empty());
    }
}
