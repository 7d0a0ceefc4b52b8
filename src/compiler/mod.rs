use tracing::debug;

use crate::archive::FORMAT_VERSION;
use crate::ast::{BinOp, Expr};
use crate::builtins::Builtins;
use crate::vm::{ConstantPool, Instruction, Opcode, PoolError, Program};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("unknown constant '{name}'")]
    UnknownConstant { name: String, hint: Option<String> },
    #[error("unknown function '{name}'")]
    UnknownFunction { name: String, hint: Option<String> },
    #[error("too many constants: {0}")]
    PoolOverflow(#[from] PoolError),
}

impl CompileError {
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::UnknownConstant { .. } => "CALC-C001",
            CompileError::UnknownFunction { .. } => "CALC-C002",
            CompileError::PoolOverflow(_) => "CALC-C003",
        }
    }

    /// Closest registry name, when one is near enough to suggest.
    pub fn hint(&self) -> Option<&str> {
        match self {
            CompileError::UnknownConstant { hint, .. } | CompileError::UnknownFunction { hint, .. } => {
                hint.as_deref()
            }
            CompileError::PoolOverflow(_) => None,
        }
    }
}

fn opcode_for(op: BinOp) -> Opcode {
    match op {
        BinOp::Add => Opcode::Add,
        BinOp::Sub => Opcode::Sub,
        BinOp::Mul => Opcode::Mul,
        BinOp::Div => Opcode::Div,
        BinOp::Mod => Opcode::Mod,
        BinOp::Pow => Opcode::Pow,
    }
}

struct Compiler<'a> {
    builtins: &'a Builtins,
    pool: ConstantPool,
    code: Vec<Instruction>,
}

impl<'a> Compiler<'a> {
    fn new(builtins: &'a Builtins) -> Self {
        Compiler { builtins, pool: ConstantPool::new(), code: Vec::new() }
    }

    fn emit(&mut self, inst: Instruction) {
        self.code.push(inst);
    }

    fn emit_constant(&mut self, value: f64) -> Result<(), CompileError> {
        let index = self.pool.add(value)?;
        self.emit(Instruction::constant(index));
        Ok(())
    }

    fn compile_expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::FloatLiteral(value) => self.emit_constant(*value),
            Expr::NamedConstant(name) => {
                let value = self.builtins.constant(name).ok_or_else(|| CompileError::UnknownConstant {
                    name: name.clone(),
                    hint: self.builtins.closest_constant(name).map(str::to_string),
                })?;
                self.emit_constant(value)
            }
            Expr::BinaryOp { op, left, right } => {
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                self.emit(Instruction::simple(opcode_for(*op)));
                Ok(())
            }
            Expr::Call { name, args } => {
                let id = self.builtins.function_id(name).ok_or_else(|| CompileError::UnknownFunction {
                    name: name.clone(),
                    hint: self.builtins.closest_function(name).map(str::to_string),
                })?;
                for arg in args {
                    self.compile_expr(arg)?;
                }
                self.emit(Instruction::call(id, args.len() as u32));
                Ok(())
            }
            Expr::Group(inner) => self.compile_expr(inner),
        }
    }

    fn finish(self) -> Program {
        Program { version: FORMAT_VERSION, pool: self.pool, instructions: self.code }
    }
}

/// Lower an expression tree to a flat stack program. The first unresolved
/// name aborts compilation.
pub fn compile(expr: &Expr, builtins: &Builtins) -> Result<Program, CompileError> {
    let mut compiler = Compiler::new(builtins);
    compiler.compile_expr(expr)?;
    let program = compiler.finish();
    debug!(
        instructions = program.instructions.len(),
        constants = program.pool.len(),
        "compiled expression"
    );
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::vm::POOL_CAPACITY;

    fn compile_src(source: &str) -> Result<Program, CompileError> {
        compile(&parse(source).unwrap(), &Builtins::standard())
    }

    #[test]
    fn literal_emits_constant() {
        let p = compile_src("42").unwrap();
        assert_eq!(p.version, FORMAT_VERSION);
        assert_eq!(p.pool.values(), &[42.0]);
        assert_eq!(p.instructions, vec![Instruction::constant(0)]);
    }

    #[test]
    fn binary_is_post_order() {
        let p = compile_src("1+2").unwrap();
        assert_eq!(p.pool.values(), &[1.0, 2.0]);
        assert_eq!(
            p.instructions,
            vec![Instruction::constant(0), Instruction::constant(1), Instruction::simple(Opcode::Add)]
        );
    }

    #[test]
    fn precedence_order() {
        let p = compile_src("2+3*4").unwrap();
        let ops: Vec<Opcode> = p.instructions.iter().map(|i| i.opcode).collect();
        assert_eq!(
            ops,
            vec![Opcode::Constant, Opcode::Constant, Opcode::Constant, Opcode::Mul, Opcode::Add]
        );
    }

    #[test]
    fn repeated_constant_is_pooled_once() {
        let p = compile_src("pi*pi").unwrap();
        assert_eq!(p.pool.len(), 1);
        assert_eq!(p.instructions[0], p.instructions[1]);
    }

    #[test]
    fn literal_and_named_constant_share_slot() {
        let p = compile_src("3.141592653589793 - pi").unwrap();
        assert_eq!(p.pool.len(), 1);
    }

    #[test]
    fn call_emits_id_and_argc() {
        let p = compile_src("sqrt(16)").unwrap();
        assert_eq!(p.instructions, vec![Instruction::constant(0), Instruction::call(21, 1)]);
    }

    #[test]
    fn arity_is_checked_at_run_time_not_compile_time() {
        let p = compile_src("abs(1, 2)").unwrap();
        assert_eq!(p.instructions.last(), Some(&Instruction::call(0, 2)));
    }

    #[test]
    fn group_has_no_code_of_its_own() {
        let grouped = compile_src("(2+3)").unwrap();
        let bare = compile_src("2+3").unwrap();
        assert_eq!(grouped, bare);
    }

    #[test]
    fn never_emits_reserved_opcodes() {
        let p = compile_src("(sqrt(2) + e) * (1 % 3)").unwrap();
        assert!(
            p.instructions
                .iter()
                .all(|i| !matches!(i.opcode, Opcode::Pop | Opcode::Exit | Opcode::Noop))
        );
    }

    #[test]
    fn unknown_constant_with_hint() {
        let err = compile_src("pie*2").unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownConstant { name: "pie".into(), hint: Some("pi".into()) }
        );
        assert_eq!(err.to_string(), "unknown constant 'pie'");
        assert_eq!(err.code(), "CALC-C001");
    }

    #[test]
    fn unknown_function() {
        let err = compile_src("sqr(4)").unwrap_err();
        assert_eq!(err.to_string(), "unknown function 'sqr'");
        assert_eq!(err.hint(), Some("sqrt"));
        assert_eq!(err.code(), "CALC-C002");
    }

    #[test]
    fn unknown_function_checked_before_arguments() {
        let err = compile_src("nope(tau)").unwrap_err();
        assert!(matches!(err, CompileError::UnknownFunction { .. }));
    }

    #[test]
    fn pool_overflow_is_an_error() {
        // build a tree that references more distinct literals than fit
        let mut expr = Expr::FloatLiteral(0.0);
        for i in 1..=POOL_CAPACITY {
            expr = Expr::binary(BinOp::Add, expr, Expr::FloatLiteral(i as f64));
        }
        let err = compile(&expr, &Builtins::standard()).unwrap_err();
        assert!(matches!(err, CompileError::PoolOverflow(PoolError::Full { .. })));
        assert_eq!(err.code(), "CALC-C003");
    }
}
