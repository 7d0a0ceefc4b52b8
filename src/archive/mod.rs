//! Binary archive format for compiled programs.
//!
//! ```text
//! MAGIC "calc.arc" | VERSION u32 | POOL_LEN u32 | POOL_LEN bytes of f64 | INSTR*
//! INSTR = RECLEN u32 | OPCODE u8 | (RECLEN - 1) / 4 operands, each u32
//! ```
//!
//! All integers and floats are little-endian. Opcode bytes the VM does not
//! know are framed like any other record; rejecting them is left to
//! execution.

use tracing::{debug, warn};

use crate::vm::{ConstantPool, Instruction, Opcode, POOL_CAPACITY, PoolError, Program};

pub const MAGIC: &[u8; 8] = b"calc.arc";

/// Version stamped into archives by this build.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArchiveError {
    #[error("not a calc archive: bad magic bytes")]
    BadMagic,
    #[error("archive truncated at byte {offset}: needed {needed} more bytes")]
    Truncated { offset: usize, needed: usize },
    #[error("constant block length {len} is not a multiple of 8")]
    MisalignedPool { len: u32 },
    #[error("instruction record at byte {offset} has invalid length {len}")]
    MisalignedRecord { offset: usize, len: u32 },
    #[error("too many constants: {0}")]
    PoolOverflow(#[from] PoolError),
}

impl ArchiveError {
    pub fn code(&self) -> &'static str {
        match self {
            ArchiveError::BadMagic => "CALC-A001",
            ArchiveError::MisalignedPool { .. } => "CALC-A002",
            ArchiveError::MisalignedRecord { .. } => "CALC-A003",
            ArchiveError::Truncated { .. } => "CALC-A004",
            ArchiveError::PoolOverflow(_) => "CALC-A005",
        }
    }
}

// ── Encoding ─────────────────────────────────────────────────────────

pub fn serialize(program: &Program) -> Vec<u8> {
    let code_len: usize = program.instructions.iter().map(|i| 4 + i.encoded_len()).sum();
    let mut out = Vec::with_capacity(MAGIC.len() + 8 + program.pool.byte_len() + code_len);

    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&program.version.to_le_bytes());
    out.extend_from_slice(&(program.pool.byte_len() as u32).to_le_bytes());
    for value in program.pool.values() {
        out.extend_from_slice(&value.to_le_bytes());
    }
    for inst in &program.instructions {
        out.extend_from_slice(&(inst.encoded_len() as u32).to_le_bytes());
        out.push(inst.opcode.to_byte());
        for operand in &inst.operands {
            out.extend_from_slice(&operand.to_le_bytes());
        }
    }

    debug!(bytes = out.len(), instructions = program.instructions.len(), "serialized archive");
    out
}

// ── Decoding ─────────────────────────────────────────────────────────

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ArchiveError> {
        let available = self.bytes.len() - self.pos;
        if n > available {
            return Err(ArchiveError::Truncated { offset: self.pos, needed: n - available });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ArchiveError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn u8(&mut self) -> Result<u8, ArchiveError> {
        Ok(self.array::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32, ArchiveError> {
        self.array().map(u32::from_le_bytes)
    }

    fn f64(&mut self) -> Result<f64, ArchiveError> {
        self.array().map(f64::from_le_bytes)
    }
}

pub fn deserialize(bytes: &[u8]) -> Result<Program, ArchiveError> {
    let mut r = Reader::new(bytes);

    if !bytes.starts_with(MAGIC) {
        return Err(ArchiveError::BadMagic);
    }
    r.take(MAGIC.len())?;

    let version = r.u32()?;
    if version != FORMAT_VERSION {
        warn!(version, expected = FORMAT_VERSION, "archive format version differs");
    }

    let pool_len = r.u32()?;
    if pool_len % 8 != 0 {
        return Err(ArchiveError::MisalignedPool { len: pool_len });
    }
    let count = (pool_len / 8) as usize;
    if count > POOL_CAPACITY {
        return Err(PoolError::Full { capacity: POOL_CAPACITY }.into());
    }
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(r.f64()?);
    }
    let pool = ConstantPool::from_values(values)?;

    let mut instructions = Vec::new();
    while !r.is_empty() {
        let offset = r.pos;
        let len = r.u32()?;
        if len == 0 || (len - 1) % 4 != 0 {
            return Err(ArchiveError::MisalignedRecord { offset, len });
        }
        let opcode = Opcode::from_byte(r.u8()?);
        let operands = (0..(len - 1) / 4).map(|_| r.u32()).collect::<Result<Vec<_>, _>>()?;
        instructions.push(Instruction::new(opcode, operands));
    }

    debug!(bytes = bytes.len(), instructions = instructions.len(), "deserialized archive");
    Ok(Program { version, pool, instructions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::Builtins;
    use crate::compiler::compile;
    use crate::parser::parse;

    fn build(source: &str) -> Program {
        compile(&parse(source).unwrap(), &Builtins::standard()).unwrap()
    }

    fn pool_len_field(bytes: &[u8]) -> u32 {
        u32::from_le_bytes(bytes[12..16].try_into().unwrap())
    }

    #[test]
    fn header_layout() {
        let bytes = serialize(&build("42"));
        assert_eq!(&bytes[..8], b"calc.arc");
        assert_eq!(&bytes[8..12], &1u32.to_le_bytes());
        assert_eq!(pool_len_field(&bytes), 8);
        assert_eq!(&bytes[16..24], &42.0f64.to_le_bytes());
        // Constant(0): len 5, opcode 11, operand 0
        assert_eq!(&bytes[24..], &[5, 0, 0, 0, 11, 0, 0, 0, 0]);
    }

    #[test]
    fn deduplicated_pool_sizes() {
        assert_eq!(pool_len_field(&serialize(&build("pi*pi"))), 8);
        assert_eq!(pool_len_field(&serialize(&build("1+2"))), 16);
    }

    #[test]
    fn operandless_record_is_one_byte() {
        let bytes = serialize(&build("1+2"));
        // last record: Add()
        assert_eq!(&bytes[bytes.len() - 5..], &[1, 0, 0, 0, 14]);
    }

    #[test]
    fn round_trip() {
        let program = build("(2+3)*sqrt(16) % e");
        let back = deserialize(&serialize(&program)).unwrap();
        assert_eq!(back, program);
    }

    #[test]
    fn empty_program_round_trips() {
        let program = Program { version: FORMAT_VERSION, pool: ConstantPool::new(), instructions: vec![] };
        let bytes = serialize(&program);
        assert_eq!(bytes.len(), 16);
        assert_eq!(deserialize(&bytes).unwrap(), program);
    }

    #[test]
    fn bad_magic() {
        let mut bytes = serialize(&build("1"));
        bytes[0] = b'C';
        assert_eq!(deserialize(&bytes), Err(ArchiveError::BadMagic));
        assert_eq!(deserialize(b"calc"), Err(ArchiveError::BadMagic));
        assert_eq!(deserialize(&[]), Err(ArchiveError::BadMagic));
    }

    #[test]
    fn misaligned_pool() {
        let mut bytes = serialize(&build("1"));
        bytes[12] = 7;
        assert_eq!(deserialize(&bytes), Err(ArchiveError::MisalignedPool { len: 7 }));
    }

    #[test]
    fn misaligned_record() {
        let mut bytes = serialize(&build("1"));
        bytes[24] = 6;
        let err = deserialize(&bytes).unwrap_err();
        assert_eq!(err, ArchiveError::MisalignedRecord { offset: 24, len: 6 });
        assert_eq!(err.code(), "CALC-A003");
    }

    #[test]
    fn zero_length_record() {
        let mut bytes = serialize(&build("1"));
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        assert!(matches!(deserialize(&bytes), Err(ArchiveError::MisalignedRecord { len: 0, .. })));
    }

    #[test]
    fn truncated_header() {
        let bytes = serialize(&build("1"));
        assert!(matches!(deserialize(&bytes[..10]), Err(ArchiveError::Truncated { offset: 8, .. })));
    }

    #[test]
    fn truncated_pool() {
        let bytes = serialize(&build("1"));
        assert_eq!(
            deserialize(&bytes[..20]),
            Err(ArchiveError::Truncated { offset: 16, needed: 4 })
        );
    }

    #[test]
    fn truncated_record() {
        let bytes = serialize(&build("1"));
        assert!(matches!(deserialize(&bytes[..bytes.len() - 1]), Err(ArchiveError::Truncated { .. })));
    }

    #[test]
    fn unknown_opcode_is_framed() {
        let mut bytes = serialize(&build("1"));
        bytes.extend_from_slice(&[1, 0, 0, 0, 99]);
        let program = deserialize(&bytes).unwrap();
        assert_eq!(program.instructions.last().unwrap().opcode, Opcode::Unknown(99));
    }

    #[test]
    fn duplicate_pool_values_are_kept() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&2.0f64.to_le_bytes());
        bytes.extend_from_slice(&2.0f64.to_le_bytes());
        let program = deserialize(&bytes).unwrap();
        assert_eq!(program.pool.values(), &[2.0, 2.0]);
    }

    #[test]
    fn oversized_pool_is_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&(513u32 * 8).to_le_bytes());
        let err = deserialize(&bytes).unwrap_err();
        assert!(matches!(err, ArchiveError::PoolOverflow(_)));
        assert_eq!(err.code(), "CALC-A005");
    }

    #[test]
    fn other_version_still_loads() {
        let mut bytes = serialize(&build("1"));
        bytes[8] = 9;
        assert_eq!(deserialize(&bytes).unwrap().version, 9);
    }
}
