use std::fmt;

use tracing::{debug, trace};

use crate::builtins::{BuiltinError, Builtins};

pub mod pool;
pub use pool::{ConstantPool, POOL_CAPACITY, PoolError};

/// Maximum number of values live on the VM stack during a run.
pub const STACK_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VmError {
    #[error("stack overflow ({capacity} values)")]
    StackOverflow { capacity: usize },
    #[error("stack underflow at instruction {pc}")]
    StackUnderflow { pc: usize },
    #[error("constant index {index} out of range (pool has {len} entries)")]
    ConstantOutOfRange { index: u32, len: usize },
    #[error("no builtin function with id {id}")]
    UnknownBuiltin { id: u32 },
    #[error("{opcode} at instruction {pc} needs {expected} operands, found {found}")]
    MissingOperand { opcode: Opcode, pc: usize, expected: usize, found: usize },
    #[error("unknown opcode: {op}")]
    UnknownOpcode { op: u8 },
    #[error(transparent)]
    Builtin(#[from] BuiltinError),
}

impl VmError {
    pub fn code(&self) -> &'static str {
        match self {
            VmError::Builtin(BuiltinError::Arity { .. }) => "CALC-R001",
            VmError::UnknownBuiltin { .. } => "CALC-R002",
            VmError::StackOverflow { .. } => "CALC-R003",
            VmError::StackUnderflow { .. } => "CALC-R004",
            VmError::ConstantOutOfRange { .. } => "CALC-R005",
            VmError::UnknownOpcode { .. } => "CALC-R006",
            VmError::MissingOperand { .. } => "CALC-R007",
        }
    }
}

type VmResult<T> = Result<T, VmError>;

// ── Opcodes ──────────────────────────────────────────────────────────
//
// Byte values are part of the archive format.

pub(crate) const OP_NOOP: u8 = 10;
pub(crate) const OP_CONSTANT: u8 = 11;
pub(crate) const OP_CALL: u8 = 12;
pub(crate) const OP_POP: u8 = 13;
pub(crate) const OP_ADD: u8 = 14;
pub(crate) const OP_SUB: u8 = 15;
pub(crate) const OP_MUL: u8 = 16;
pub(crate) const OP_DIV: u8 = 17;
pub(crate) const OP_MOD: u8 = 18;
pub(crate) const OP_POW: u8 = 19;
pub(crate) const OP_EXIT: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Noop,
    Constant,
    Call,
    Pop,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Exit,
    /// A byte the decoder framed but does not recognise.
    Unknown(u8),
}

impl Opcode {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            OP_NOOP => Opcode::Noop,
            OP_CONSTANT => Opcode::Constant,
            OP_CALL => Opcode::Call,
            OP_POP => Opcode::Pop,
            OP_ADD => Opcode::Add,
            OP_SUB => Opcode::Sub,
            OP_MUL => Opcode::Mul,
            OP_DIV => Opcode::Div,
            OP_MOD => Opcode::Mod,
            OP_POW => Opcode::Pow,
            OP_EXIT => Opcode::Exit,
            other => Opcode::Unknown(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Opcode::Noop => OP_NOOP,
            Opcode::Constant => OP_CONSTANT,
            Opcode::Call => OP_CALL,
            Opcode::Pop => OP_POP,
            Opcode::Add => OP_ADD,
            Opcode::Sub => OP_SUB,
            Opcode::Mul => OP_MUL,
            Opcode::Div => OP_DIV,
            Opcode::Mod => OP_MOD,
            Opcode::Pow => OP_POW,
            Opcode::Exit => OP_EXIT,
            Opcode::Unknown(byte) => byte,
        }
    }

    /// Number of operands the VM reads for this opcode.
    pub fn operand_count(self) -> usize {
        match self {
            Opcode::Constant => 1,
            Opcode::Call => 2,
            _ => 0,
        }
    }

    fn name(self) -> Option<&'static str> {
        Some(match self {
            Opcode::Noop => "Noop",
            Opcode::Constant => "Constant",
            Opcode::Call => "Call",
            Opcode::Pop => "Pop",
            Opcode::Add => "Add",
            Opcode::Sub => "Sub",
            Opcode::Mul => "Mul",
            Opcode::Div => "Div",
            Opcode::Mod => "Mod",
            Opcode::Pow => "Pow",
            Opcode::Exit => "Exit",
            Opcode::Unknown(_) => return None,
        })
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.to_byte()),
        }
    }
}

// ── Instructions ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<u32>,
}

impl Instruction {
    pub fn new(opcode: Opcode, operands: Vec<u32>) -> Self {
        Instruction { opcode, operands }
    }

    pub fn simple(opcode: Opcode) -> Self {
        Instruction { opcode, operands: Vec::new() }
    }

    pub fn constant(index: u32) -> Self {
        Instruction { opcode: Opcode::Constant, operands: vec![index] }
    }

    pub fn call(id: u32, argc: u32) -> Self {
        Instruction { opcode: Opcode::Call, operands: vec![id, argc] }
    }

    /// Byte length of the encoded record body: opcode plus 4 bytes per operand.
    pub fn encoded_len(&self) -> usize {
        1 + 4 * self.operands.len()
    }

    fn operand(&self, i: usize, pc: usize) -> VmResult<u32> {
        self.operands.get(i).copied().ok_or(VmError::MissingOperand {
            opcode: self.opcode,
            pc,
            expected: self.opcode.operand_count(),
            found: self.operands.len(),
        })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.opcode)?;
        for (i, operand) in self.operands.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{operand}")?;
        }
        f.write_str(")")
    }
}

// ── Program ──────────────────────────────────────────────────────────

/// A compiled or decoded program: what the archive format stores.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub version: u32,
    pub pool: ConstantPool,
    pub instructions: Vec<Instruction>,
}

impl Program {
    /// Multi-line listing of the pool and instruction stream.
    pub fn disassemble(&self) -> String {
        let mut out = format!("version {}\nconstants {}\n", self.version, self.pool);
        for (pc, inst) in self.instructions.iter().enumerate() {
            out.push_str(&format!("{pc:04} {inst}\n"));
        }
        out
    }
}

// ── Stack ────────────────────────────────────────────────────────────

struct Stack {
    values: Vec<f64>,
}

impl Stack {
    fn new() -> Self {
        Stack { values: Vec::with_capacity(STACK_CAPACITY) }
    }

    fn push(&mut self, value: f64) -> VmResult<()> {
        if self.values.len() >= STACK_CAPACITY {
            return Err(VmError::StackOverflow { capacity: STACK_CAPACITY });
        }
        self.values.push(value);
        Ok(())
    }

    fn pop(&mut self, pc: usize) -> VmResult<f64> {
        self.values.pop().ok_or(VmError::StackUnderflow { pc })
    }
}

// ── VM ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Ready,
    Running,
    Halted,
}

/// Executes a [`Program`] against a builtin registry. Each call to
/// [`Vm::run`] starts from a fresh stack, so a VM can be run repeatedly.
pub struct Vm<'a> {
    program: &'a Program,
    builtins: &'a Builtins,
    state: VmState,
}

impl<'a> Vm<'a> {
    pub fn new(program: &'a Program, builtins: &'a Builtins) -> Self {
        Vm { program, builtins, state: VmState::Ready }
    }

    pub fn state(&self) -> VmState {
        self.state
    }

    pub fn run(&mut self) -> VmResult<f64> {
        self.state = VmState::Running;
        let result = self.execute();
        self.state = VmState::Halted;
        result
    }

    fn execute(&self) -> VmResult<f64> {
        let mut stack = Stack::new();
        let end = self.program.instructions.len();
        debug!(instructions = end, constants = self.program.pool.len(), "vm run");

        for (pc, inst) in self.program.instructions.iter().enumerate() {
            trace!(pc, %inst, depth = stack.values.len(), "exec");
            match inst.opcode {
                Opcode::Constant => {
                    let index = inst.operand(0, pc)?;
                    let value = self.program.pool.get(index).ok_or(VmError::ConstantOutOfRange {
                        index,
                        len: self.program.pool.len(),
                    })?;
                    stack.push(value)?;
                }
                Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod | Opcode::Pow => {
                    let right = stack.pop(pc)?;
                    let left = stack.pop(pc)?;
                    let value = match inst.opcode {
                        Opcode::Add => left + right,
                        Opcode::Sub => left - right,
                        Opcode::Mul => left * right,
                        Opcode::Div => left / right,
                        Opcode::Mod => left % right,
                        _ => left.powf(right),
                    };
                    stack.push(value)?;
                }
                Opcode::Call => {
                    let id = inst.operand(0, pc)?;
                    let argc = inst.operand(1, pc)? as usize;
                    let function =
                        self.builtins.function(id).ok_or(VmError::UnknownBuiltin { id })?;
                    let mut args = Vec::with_capacity(argc.min(STACK_CAPACITY));
                    for _ in 0..argc {
                        args.push(stack.pop(pc)?);
                    }
                    // popped last-argument-first; hand them over in source order
                    args.reverse();
                    stack.push(function.call(&args)?)?;
                }
                Opcode::Noop | Opcode::Pop | Opcode::Exit => {}
                Opcode::Unknown(op) => return Err(VmError::UnknownOpcode { op }),
            }
        }

        stack.pop(end)
    }
}

pub fn run(program: &Program, builtins: &Builtins) -> VmResult<f64> {
    Vm::new(program, builtins).run()
}

// ── Tests ────────────────────────────────────────────────────────────
