use std::fmt;

/// Maximum number of distinct constants a program may reference.
pub const POOL_CAPACITY: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("constant pool is full ({capacity} entries)")]
    Full { capacity: usize },
}

/// Append-only table of scalar constants.
///
/// [`ConstantPool::add`] deduplicates by exact bit pattern, so `0.0` and
/// `-0.0` occupy separate slots and identical NaNs share one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstantPool {
    values: Vec<f64>,
}

impl ConstantPool {
    pub fn new() -> Self {
        ConstantPool { values: Vec::new() }
    }

    /// Build a pool from decoded values, in order, without deduplicating.
    pub fn from_values(values: Vec<f64>) -> Result<Self, PoolError> {
        if values.len() > POOL_CAPACITY {
            return Err(PoolError::Full { capacity: POOL_CAPACITY });
        }
        Ok(ConstantPool { values })
    }

    /// Index of an existing bit-identical value, or of the newly appended one.
    pub fn add(&mut self, value: f64) -> Result<u32, PoolError> {
        if let Some(i) = self.find(value) {
            return Ok(i);
        }
        if self.values.len() >= POOL_CAPACITY {
            return Err(PoolError::Full { capacity: POOL_CAPACITY });
        }
        self.values.push(value);
        Ok((self.values.len() - 1) as u32)
    }

    pub fn find(&self, value: f64) -> Option<u32> {
        let bits = value.to_bits();
        self.values.iter().position(|v| v.to_bits() == bits).map(|i| i as u32)
    }

    pub fn get(&self, index: u32) -> Option<f64> {
        self.values.get(index as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Size of the pool's serialized block: 8 bytes per value.
    pub fn byte_len(&self) -> usize {
        self.values.len() * 8
    }
}

impl fmt::Display for ConstantPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{i}: {v}")?;
        }
        f.write_str("]")
    }
}
