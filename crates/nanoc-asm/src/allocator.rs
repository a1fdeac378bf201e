//! Linear-scan register allocation and target-instruction emission.
//!
//! Sweeps each basic block independently, keeping a small set of "active"
//! variables pinned to registers. When the pool of 11 allocatable registers
//! runs dry, the variable whose interval reaches furthest into the future
//! is evicted to memory, freeing its register for the one that needs it
//! sooner. Spilled variables are reloaded through a dedicated address
//! register and either a freshly freed register or, failing that, one of
//! three per-slot scratch registers reserved for exactly this case.

use nanoc_tac::mir::{BranchKind, Instruction, InstructionKind, Opcode as TacOpcode, Operand};
use nanoc_util::error::{AsmError, AsmResult};
use nanoc_util::{FxHashMap, Interner, Symbol};

use crate::intervals::{basic_blocks, live_intervals, BasicBlock, LiveInterval};
use crate::lir::{
    split_nibbles, Opcode, Target, TargetInstruction, ADDR_TEMP_REGISTER, FIRST_ALLOCATABLE_REGISTER,
    FIRST_SLOT_TEMP_REGISTER, LAST_ALLOCATABLE_REGISTER, NULL_REGISTER,
};

/// An instruction operand position: 0 is the target, 1 and 2 are the two
/// source operands. Used only to pick which of the three scratch registers
/// (`FIRST_SLOT_TEMP_REGISTER + slot`) a spilled value falls back to.
type Slot = u8;

struct ActiveVar {
    name: Symbol,
    register: u8,
    /// True once this block has written a new value into the register;
    /// tells the end-of-block flush whether it needs a `STR`.
    dirty: bool,
}

/// Per-block allocator state. Reset at the start of every basic block.
///
/// `active` is kept sorted by `(interval_end, insertion_order)` so the
/// furthest-reaching variable — the spill candidate — is always last;
/// `index_by_name` mirrors it for O(1) lookup by name, rebuilt whenever
/// `active` is reordered.
struct BlockState<'a> {
    active: Vec<ActiveVar>,
    index_by_name: FxHashMap<Symbol, usize>,
    free: Vec<u8>,
    intervals: &'a FxHashMap<Symbol, LiveInterval>,
}

impl<'a> BlockState<'a> {
    fn new(intervals: &'a FxHashMap<Symbol, LiveInterval>) -> Self {
        Self {
            active: Vec::new(),
            index_by_name: FxHashMap::default(),
            free: (FIRST_ALLOCATABLE_REGISTER..=LAST_ALLOCATABLE_REGISTER).collect(),
            intervals,
        }
    }

    fn interval_end(&self, name: Symbol) -> usize {
        self.intervals.get(&name).map(|iv| iv.end).unwrap_or(0)
    }

    fn index_of(&self, name: Symbol) -> Option<usize> {
        self.index_by_name.get(&name).copied()
    }

    /// Drops every active variable whose interval has already ended,
    /// returning its register to the free pool.
    fn expire(&mut self, cursor: usize) {
        let intervals = self.intervals;
        let mut i = 0;
        let mut freed = false;
        while i < self.active.len() {
            if intervals.get(&self.active[i].name).map(|iv| iv.end).unwrap_or(0) < cursor {
                let v = self.active.remove(i);
                self.free.push(v.register);
                freed = true;
            } else {
                i += 1;
            }
        }
        if freed {
            self.free.sort_unstable();
            self.reindex();
        }
    }

    /// Keeps `active` ascending by interval end, so the furthest-reaching
    /// variable (the spill candidate) is always last, and rebuilds the
    /// name-to-index side table to match.
    fn sort_active(&mut self) {
        let intervals = self.intervals;
        self.active.sort_by_key(|v| intervals.get(&v.name).map(|iv| iv.end).unwrap_or(0));
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index_by_name.clear();
        for (i, v) in self.active.iter().enumerate() {
            self.index_by_name.insert(v.name, i);
        }
    }

    fn take_free_register(&mut self) -> Option<u8> {
        if self.free.is_empty() {
            None
        } else {
            Some(self.free.remove(0))
        }
    }

    fn activate(&mut self, name: Symbol, register: u8, dirty: bool) {
        self.active.push(ActiveVar { name, register, dirty });
        self.sort_active();
    }
}

/// Translates a flat TAC program into target instructions via linear-scan
/// register allocation.
pub struct AssemblyGenerator {
    memory_addresses: FxHashMap<Symbol, u8>,
    next_memory_address: u8,
}

impl AssemblyGenerator {
    pub fn generate(program: &[Instruction], interner: &Interner) -> AsmResult<Vec<TargetInstruction>> {
        let mut generator = AssemblyGenerator { memory_addresses: FxHashMap::default(), next_memory_address: 1 };
        let intervals = live_intervals(program);
        let blocks = basic_blocks(program);

        let mut out = Vec::new();
        for block in blocks {
            generator.emit_block(program, &intervals, block, interner, &mut out)?;
        }
        Ok(out)
    }

    fn memory_address_for(&mut self, name: Symbol) -> u8 {
        if let Some(&addr) = self.memory_addresses.get(&name) {
            return addr;
        }
        let addr = self.next_memory_address;
        self.next_memory_address += 1;
        self.memory_addresses.insert(name, addr);
        addr
    }

    fn emit_block(
        &mut self,
        program: &[Instruction],
        intervals: &FxHashMap<Symbol, LiveInterval>,
        block: BasicBlock,
        interner: &Interner,
        out: &mut Vec<TargetInstruction>,
    ) -> AsmResult<()> {
        let mut state = BlockState::new(intervals);

        for i in block.start..block.end {
            state.expire(i);
            let instr = &program[i];
            let mut pending_label = instr.label.clone();

            match &instr.kind {
                InstructionKind::Assign { target, value } => {
                    let target_reg = self.resolve_write_target(*target, &mut state, interner, out, &mut pending_label)?;
                    match value {
                        Operand::Literal(v) => {
                            let (hi, lo) = split_nibbles(*v);
                            out.push(TargetInstruction {
                                label: pending_label.take(),
                                opcode: Opcode::Ldi,
                                target: Target::Register(target_reg.register),
                                op1: hi,
                                op2: lo,
                            });
                        }
                        Operand::Ident(name) => {
                            // Variable-to-variable copies go through memory:
                            // `LD`'s first operand is always an address
                            // register, never a register holding a value.
                            let addr = self.ensure_value_in_memory(*name, &mut state, interner, out)?;
                            let (hi, lo) = split_nibbles(addr);
                            out.push(TargetInstruction {
                                label: pending_label.take(),
                                opcode: Opcode::Ldi,
                                target: Target::Register(ADDR_TEMP_REGISTER),
                                op1: hi,
                                op2: lo,
                            });
                            out.push(TargetInstruction {
                                label: None,
                                opcode: Opcode::Ld,
                                target: Target::Register(target_reg.register),
                                op1: ADDR_TEMP_REGISTER,
                                op2: 0,
                            });
                        }
                    }
                    self.finish_write(*target, target_reg, &mut state, out)?;
                }
                InstructionKind::Op { target, op, lhs, rhs } => {
                    let target_reg = self.resolve_write_target(*target, &mut state, interner, out, &mut pending_label)?;
                    let op1 = self.resolve_value(*lhs, 1, &mut state, interner, out, &mut pending_label)?;
                    let op2 = match rhs {
                        Some(rhs) => self.resolve_value(*rhs, 2, &mut state, interner, out, &mut pending_label)?,
                        None => Resolved { register: NULL_REGISTER, became_active: false },
                    };
                    out.push(TargetInstruction {
                        label: pending_label.take(),
                        opcode: map_opcode(*op),
                        target: Target::Register(target_reg.register),
                        op1: op1.register,
                        op2: op2.register,
                    });
                    self.finish_write(*target, target_reg, &mut state, out)?;
                }
                InstructionKind::Branch { kind, target_label, lhs, rhs } => {
                    let op1 = self.resolve_value(*lhs, 1, &mut state, interner, out, &mut pending_label)?;
                    let op2 = self.resolve_value(*rhs, 2, &mut state, interner, out, &mut pending_label)?;
                    out.push(TargetInstruction {
                        label: pending_label.take(),
                        opcode: map_branch(*kind),
                        target: Target::Label(target_label.clone()),
                        op1: op1.register,
                        op2: op2.register,
                    });
                }
            }
        }

        self.flush_block(&mut state, out);
        Ok(())
    }

    /// Writes back every still-dirty active variable at the end of a block,
    /// so the next block (which starts with an empty register file) can
    /// reload it from memory.
    fn flush_block(&mut self, state: &mut BlockState, out: &mut Vec<TargetInstruction>) {
        state.sort_active();
        for v in &state.active {
            if v.dirty {
                let addr = self.memory_address_for(v.name);
                emit_store(v.register, addr, out);
            }
        }
    }

    fn finish_write(&mut self, name: Symbol, resolved: Resolved, state: &mut BlockState, out: &mut Vec<TargetInstruction>) -> AsmResult<()> {
        if resolved.became_active {
            if let Some(idx) = state.index_of(name) {
                state.active[idx].dirty = true;
            }
        } else {
            // Spilled on arrival: nowhere to keep the value but memory.
            let addr = self.memory_address_for(name);
            emit_store(resolved.register, addr, out);
        }
        Ok(())
    }

    /// Resolves `lhs`/`rhs` of an `Op` or `Branch`: identifiers go through
    /// [`Self::resolve_operand`]; a literal is materialized with an `LDI`
    /// into the scratch register reserved for its operand slot, so it never
    /// competes with variables for the allocatable pool.
    fn resolve_value(
        &mut self,
        value: Operand,
        slot: Slot,
        state: &mut BlockState,
        interner: &Interner,
        out: &mut Vec<TargetInstruction>,
        pending_label: &mut Option<String>,
    ) -> AsmResult<Resolved> {
        match value {
            Operand::Ident(name) => self.resolve_operand(name, slot, state, interner, out, pending_label),
            Operand::Literal(v) => {
                let register = FIRST_SLOT_TEMP_REGISTER + slot;
                let (hi, lo) = split_nibbles(v);
                out.push(TargetInstruction {
                    label: pending_label.take(),
                    opcode: Opcode::Ldi,
                    target: Target::Register(register),
                    op1: hi,
                    op2: lo,
                });
                Ok(Resolved { register, became_active: false })
            }
        }
    }

    /// Makes sure memory holds `name`'s current value, storing it from its
    /// register first when the register is ahead of memory. Returns the
    /// variable's memory address.
    fn ensure_value_in_memory(
        &mut self,
        name: Symbol,
        state: &mut BlockState,
        interner: &Interner,
        out: &mut Vec<TargetInstruction>,
    ) -> AsmResult<u8> {
        if let Some(idx) = state.index_of(name) {
            let needs_store = state.active[idx].dirty || !self.memory_addresses.contains_key(&name);
            let register = state.active[idx].register;
            let addr = self.memory_address_for(name);
            if needs_store {
                emit_store(register, addr, out);
                state.active[idx].dirty = false;
            }
            return Ok(addr);
        }
        self.memory_addresses
            .get(&name)
            .copied()
            .ok_or_else(|| AsmError::MissingMemoryAddress { name: interner.resolve(name).to_string() })
    }

    /// Resolves a named operand already known to the program: active in a
    /// register, spilled to memory and reloaded, or (read-only) neither, an
    /// internal error.
    fn resolve_operand(
        &mut self,
        name: Symbol,
        slot: Slot,
        state: &mut BlockState,
        interner: &Interner,
        out: &mut Vec<TargetInstruction>,
        pending_label: &mut Option<String>,
    ) -> AsmResult<Resolved> {
        if let Some(idx) = state.index_of(name) {
            return Ok(Resolved { register: state.active[idx].register, became_active: true });
        }

        if let Some(&addr) = self.memory_addresses.get(&name) {
            let (hi, lo) = split_nibbles(addr);
            out.push(TargetInstruction {
                label: pending_label.take(),
                opcode: Opcode::Ldi,
                target: Target::Register(ADDR_TEMP_REGISTER),
                op1: hi,
                op2: lo,
            });

            if let Some(register) = state.take_free_register() {
                out.push(TargetInstruction {
                    label: None,
                    opcode: Opcode::Ld,
                    target: Target::Register(register),
                    op1: ADDR_TEMP_REGISTER,
                    op2: 0,
                });
                state.activate(name, register, false);
                return Ok(Resolved { register, became_active: true });
            }

            let register = FIRST_SLOT_TEMP_REGISTER + slot;
            out.push(TargetInstruction {
                label: None,
                opcode: Opcode::Ld,
                target: Target::Register(register),
                op1: ADDR_TEMP_REGISTER,
                op2: 0,
            });
            return Ok(Resolved { register, became_active: false });
        }

        Err(AsmError::MissingMemoryAddress { name: interner.resolve(name).to_string() })
    }

    /// Resolves the write target of an `Assign`/`Op`: same active/spilled
    /// cases as a read, plus the case a read can never hit — the name has
    /// no record at all yet, so a register (or a spill slot) must be
    /// allocated for it from scratch.
    fn resolve_write_target(
        &mut self,
        name: Symbol,
        state: &mut BlockState,
        interner: &Interner,
        out: &mut Vec<TargetInstruction>,
        pending_label: &mut Option<String>,
    ) -> AsmResult<Resolved> {
        if state.index_of(name).is_some() || self.memory_addresses.contains_key(&name) {
            return self.resolve_operand(name, 0, state, interner, out, pending_label);
        }

        if let Some(register) = state.take_free_register() {
            state.activate(name, register, false);
            return Ok(Resolved { register, became_active: true });
        }

        let new_end = state.interval_end(name);
        let furthest = state.active.last().ok_or(AsmError::AllocationFailed)?;
        let furthest_end = state.interval_end(furthest.name);

        if new_end >= furthest_end {
            // The incoming variable itself outlives everything already in
            // flight; cheaper to keep it in memory than to evict a var that
            // will need reloading sooner.
            self.memory_address_for(name);
            return Ok(Resolved { register: FIRST_SLOT_TEMP_REGISTER, became_active: false });
        }

        let evicted = state.active.pop().expect("checked non-empty above");
        if evicted.dirty {
            let addr = self.memory_address_for(evicted.name);
            emit_store(evicted.register, addr, out);
        }
        state.activate(name, evicted.register, false);
        Ok(Resolved { register: evicted.register, became_active: true })
    }
}

struct Resolved {
    register: u8,
    became_active: bool,
}

fn emit_store(register: u8, addr: u8, out: &mut Vec<TargetInstruction>) {
    let (hi, lo) = split_nibbles(addr);
    out.push(TargetInstruction { label: None, opcode: Opcode::Ldi, target: Target::Register(ADDR_TEMP_REGISTER), op1: hi, op2: lo });
    out.push(TargetInstruction { label: None, opcode: Opcode::Str, target: Target::Register(register), op1: ADDR_TEMP_REGISTER, op2: 0 });
}

fn map_opcode(op: TacOpcode) -> Opcode {
    match op {
        TacOpcode::Add => Opcode::Add,
        TacOpcode::Sub => Opcode::Sub,
        TacOpcode::And => Opcode::And,
        TacOpcode::Or => Opcode::Or,
        TacOpcode::Ls => Opcode::Ls,
        TacOpcode::Rs => Opcode::Rs,
    }
}

fn map_branch(kind: BranchKind) -> Opcode {
    match kind {
        BranchKind::Bre => Opcode::Bre,
        BranchKind::Brlt => Opcode::Brlt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanoc_tac::TacGenerator;
    use nanoc_lex::Lexer;
    use nanoc_par::Parser;

    fn compile(src: &str) -> (Vec<TargetInstruction>, Interner) {
        let mut interner = Interner::new();
        let tokens = Lexer::new(&mut interner).tokenize(src).unwrap();
        let (ast, root) = Parser::parse_program(tokens).unwrap();
        let tac = TacGenerator::generate(&ast, root, &mut interner).unwrap();
        let asm = AssemblyGenerator::generate(&tac, &interner).unwrap();
        (asm, interner)
    }

    #[test]
    fn a_literal_assignment_lowers_to_an_ldi_followed_by_a_flush_to_memory() {
        let (asm, _interner) = compile("byte x = 7;");
        assert_eq!(asm[0].opcode, Opcode::Ldi);
        assert_eq!(asm[0].op1, 0);
        assert_eq!(asm[0].op2, 7);
        assert!(asm.iter().any(|i| i.opcode == Opcode::Str), "block-end flush should store the dirty write: {asm:?}");
    }

    #[test]
    fn twelve_live_variables_force_a_spill() {
        let mut src = String::new();
        for i in 0..12 {
            src.push_str(&format!("byte v{i} = {i};\n"));
        }
        src.push_str("byte total = v0;\n");
        for i in 1..12 {
            src.push_str(&format!("total = total + v{i};\n"));
        }
        let (asm, _interner) = compile(&src);
        assert!(asm.iter().any(|i| i.opcode == Opcode::Str), "expected at least one spill store, got {asm:?}");
        assert!(asm.iter().any(|i| i.opcode == Opcode::Ld), "expected at least one spill reload, got {asm:?}");
    }

    #[test]
    fn a_variable_read_across_a_block_boundary_is_reloaded() {
        let (asm, _interner) = compile("byte x = 1; while (x < 5) { x = x + 1; };");
        assert!(asm.iter().any(|i| i.opcode == Opcode::Brlt));
    }

    #[test]
    fn a_variable_copy_goes_through_memory() {
        let (asm, _interner) = compile("byte x = 1; byte y = x;");
        let str_pos = asm.iter().position(|i| i.opcode == Opcode::Str).unwrap();
        let ld_pos = asm.iter().position(|i| i.opcode == Opcode::Ld).unwrap();
        assert!(str_pos < ld_pos, "the source is stored before the copy loads it: {asm:?}");
        // LD's first operand is always the address scratch register.
        assert!(asm
            .iter()
            .filter(|i| i.opcode == Opcode::Ld)
            .all(|i| i.op1 == ADDR_TEMP_REGISTER));
    }

    #[test]
    fn literal_operands_materialize_in_slot_scratch_registers() {
        let (asm, _interner) = compile("byte x = 1; byte y = (x + 1);");
        let add = asm.iter().find(|i| i.opcode == Opcode::Add).unwrap();
        assert_eq!(add.op2, FIRST_SLOT_TEMP_REGISTER + 2);
    }

    #[test]
    fn single_operand_shifts_pass_the_null_register() {
        // A non-literal multiply lowers to the shift-and-add loop, whose
        // shift steps have no second operand.
        let (asm, _interner) = compile("byte x = 2; byte y = (x * 3);");
        let shift = asm.iter().find(|i| i.opcode == Opcode::Ls).unwrap();
        assert_eq!(shift.op2, NULL_REGISTER);
    }
}
