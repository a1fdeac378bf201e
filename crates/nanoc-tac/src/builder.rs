//! Issues fresh temporary/label names and appends instructions to the
//! program under construction, tracking the bookkeeping lowering needs for
//! back-patching forward branches.

use nanoc_util::{Interner, Symbol};

use crate::mir::{BranchKind, Instruction, InstructionKind, Operand};

/// A target string that can never collide with a real label: labels are
/// always alphanumeric/underscore, this isn't.
pub const PLACEHOLDER: &str = "$placeholder$";

/// Issues temp/label names, appends instructions, and exposes the ordered
/// program once lowering is done.
pub struct InstructionFactory<'i> {
    interner: &'i mut Interner,
    instructions: Vec<Instruction>,
    temp_counter: u32,
    label_counter: u32,
    /// Set when a label has been reserved for whichever instruction is
    /// appended next; consumed (and cleared) by that append.
    pending_label: Option<String>,
}

impl<'i> InstructionFactory<'i> {
    pub fn new(interner: &'i mut Interner) -> Self {
        Self {
            interner,
            instructions: Vec::new(),
            temp_counter: 0,
            label_counter: 0,
            pending_label: None,
        }
    }

    /// A fresh temporary name. Begins with a digit so it can never collide
    /// with a source identifier.
    pub fn new_temp(&mut self, hint: &str) -> Symbol {
        let name = format!("{}{hint}", self.temp_counter);
        self.temp_counter += 1;
        self.interner.intern(&name)
    }

    /// A fresh label name, unless one was already queued for the next
    /// instruction — that queued label is returned (and consumed) instead.
    pub fn new_label(&mut self, hint: &str) -> String {
        if let Some(label) = self.pending_label.take() {
            return label;
        }
        let name = format!("{hint}{}", self.label_counter);
        self.label_counter += 1;
        name
    }

    /// Reserves `label` for whichever instruction is appended next.
    pub fn queue_next_instruction_label(&mut self, label: String) {
        self.pending_label = Some(label);
    }

    /// Appends an instruction, attaching any queued label. Returns the
    /// instruction's index for later back-patching.
    pub fn append(&mut self, kind: InstructionKind) -> usize {
        let label = self.pending_label.take();
        self.instructions.push(Instruction { label, kind });
        self.instructions.len() - 1
    }

    pub fn emit_placeholder_branch(&mut self, kind: BranchKind, lhs: Operand, rhs: Operand) -> usize {
        self.append(InstructionKind::Branch {
            kind,
            target_label: PLACEHOLDER.to_string(),
            lhs,
            rhs,
        })
    }

    /// An unconditional branch: `BRE target, 0, 0` (0 == 0 always holds).
    pub fn emit_unconditional_branch(&mut self, target_label: String) -> usize {
        self.append(InstructionKind::Branch {
            kind: BranchKind::Bre,
            target_label,
            lhs: Operand::Literal(0),
            rhs: Operand::Literal(0),
        })
    }

    /// Points the branch at `instr_idx` at the label that will end up on
    /// the next instruction appended: reuses an already-queued one, or
    /// mints `fallback_hint<counter>` and queues that instead.
    pub fn set_branch_to_next_label(&mut self, instr_idx: usize, fallback_hint: &str) {
        let label = match &self.pending_label {
            Some(label) => label.clone(),
            None => {
                let label = format!("{fallback_hint}{}", self.label_counter);
                self.label_counter += 1;
                self.pending_label = Some(label.clone());
                label
            }
        };
        if let InstructionKind::Branch { target_label, .. } = &mut self.instructions[instr_idx].kind {
            *target_label = label;
        }
    }

    pub fn finish(self) -> Vec<Instruction> {
        self.instructions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mir::Opcode;

    #[test]
    fn temp_names_begin_with_a_digit_and_never_repeat() {
        let mut interner = Interner::new();
        let mut f = InstructionFactory::new(&mut interner);
        let a = f.new_temp("t");
        let b = f.new_temp("t");
        assert_ne!(a, b);
        assert!(interner.resolve(a).starts_with('0'));
        assert!(interner.resolve(b).starts_with('1'));
    }

    #[test]
    fn back_patch_attaches_label_to_the_next_appended_instruction() {
        let mut interner = Interner::new();
        let x = Operand::Ident(interner.intern("x"));
        let y = interner.intern("y");
        let mut f = InstructionFactory::new(&mut interner);
        let branch = f.emit_placeholder_branch(BranchKind::Bre, x, Operand::Literal(0));
        f.set_branch_to_next_label(branch, "end");
        let next = f.append(InstructionKind::Assign { target: y, value: Operand::Literal(1) });

        let program = f.finish();
        let target = program[branch].branch_target().unwrap().to_string();
        assert_eq!(program[next].label.as_deref(), Some(target.as_str()));
    }

    #[test]
    fn queued_label_is_reused_rather_than_minting_a_new_one() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let mut f = InstructionFactory::new(&mut interner);
        let cond_label = f.new_label("L_cond");
        f.queue_next_instruction_label(cond_label.clone());
        let idx = f.append(InstructionKind::Assign { target: x, value: Operand::Literal(0) });
        let program = f.finish();
        assert_eq!(program[idx].label.as_deref(), Some(cond_label.as_str()));
    }

    #[test]
    fn op_instruction_round_trips_through_append() {
        let mut interner = Interner::new();
        let mut f = InstructionFactory::new(&mut interner);
        let t = f.new_temp("t");
        let idx = f.append(InstructionKind::Op {
            target: t,
            op: Opcode::Add,
            lhs: Operand::Literal(1),
            rhs: Some(Operand::Literal(2)),
        });
        assert!(!f.finish()[idx].is_branch());
    }
}
