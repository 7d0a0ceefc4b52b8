//! Named constants and math functions available to expressions.
//!
//! The registry is built once and then only read. A function's id is its
//! position in the table; ids are embedded in `Call` instructions, so the
//! order of [`FUNCTIONS`] is part of the archive format.

use std::collections::HashMap;
use std::f64::consts;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuiltinError {
    #[error("function '{name}' expects exactly {expected} arguments but got {found}")]
    Arity { name: String, expected: usize, found: usize },
}

/// Implementation of a builtin function.
#[derive(Clone, Copy)]
pub enum Imp {
    Unary(fn(f64) -> f64),
    Nary(fn(&[f64]) -> f64),
}

#[derive(Clone)]
pub struct BuiltinFn {
    pub name: String,
    pub id: u32,
    pub arity: usize,
    imp: Imp,
}

impl BuiltinFn {
    pub fn call(&self, args: &[f64]) -> Result<f64, BuiltinError> {
        if args.len() != self.arity {
            return Err(BuiltinError::Arity {
                name: self.name.clone(),
                expected: self.arity,
                found: args.len(),
            });
        }
        Ok(match (self.imp, args) {
            (Imp::Unary(f), [x]) => f(*x),
            // arity was checked above; a unary fn registered with another arity
            // still gets its first argument
            (Imp::Unary(f), _) => f(args.first().copied().unwrap_or(f64::NAN)),
            (Imp::Nary(f), _) => f(args),
        })
    }
}

impl std::fmt::Debug for BuiltinFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinFn")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("arity", &self.arity)
            .finish()
    }
}

fn rad(x: f64) -> f64 {
    x * (consts::PI / 180.0)
}

fn deg(x: f64) -> f64 {
    x / (consts::PI / 180.0)
}

fn neg(x: f64) -> f64 {
    0.0 - x
}

/// The standard unary catalogue, in id order.
pub const FUNCTIONS: &[(&str, fn(f64) -> f64)] = &[
    ("abs", f64::abs),
    ("acos", f64::acos),
    ("acosh", f64::acosh),
    ("asin", f64::asin),
    ("asinh", f64::asinh),
    ("atan", f64::atan),
    ("atanh", f64::atanh),
    ("cbrt", f64::cbrt),
    ("ceil", f64::ceil),
    ("cos", f64::cos),
    ("cosh", f64::cosh),
    ("exp", f64::exp),
    ("expm1", f64::exp_m1),
    ("floor", f64::floor),
    ("log", f64::ln),
    ("log10", f64::log10),
    ("log1p", f64::ln_1p),
    ("log2", f64::log2),
    ("round", f64::round),
    ("sin", f64::sin),
    ("sinh", f64::sinh),
    ("sqrt", f64::sqrt),
    ("tan", f64::tan),
    ("tanh", f64::tanh),
    ("trunc", f64::trunc),
    ("rad", rad),
    ("deg", deg),
    ("neg", neg),
];

pub const CONSTANTS: &[(&str, f64)] = &[
    ("e", consts::E),
    ("pi", consts::PI),
    ("phi", 1.618_033_988_749_895),
    ("sqrt_2", consts::SQRT_2),
    ("sqrt_e", 1.648_721_270_700_128_1),
    ("sqrt_pi", 1.772_453_850_905_516),
    ("sqrt_phi", 1.272_019_649_514_069),
    ("ln_2", consts::LN_2),
    ("ln_10", consts::LN_10),
];

#[derive(Debug, Clone, Default)]
pub struct Builtins {
    functions: Vec<BuiltinFn>,
    by_name: HashMap<String, u32>,
    constants: HashMap<String, f64>,
}

impl Builtins {
    /// An empty registry. Most callers want [`Builtins::standard`].
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        let mut builtins = Self::empty();
        for &(name, f) in FUNCTIONS {
            builtins = builtins.with_function(name, 1, Imp::Unary(f));
        }
        for &(name, value) in CONSTANTS {
            builtins = builtins.with_constant(name, value);
        }
        builtins
    }

    /// Register a function under the next free id. Re-registering a name
    /// rebinds the name to the new id.
    pub fn with_function(mut self, name: impl Into<String>, arity: usize, imp: Imp) -> Self {
        let name = name.into();
        let id = self.functions.len() as u32;
        self.by_name.insert(name.clone(), id);
        self.functions.push(BuiltinFn { name, id, arity, imp });
        self
    }

    pub fn with_constant(mut self, name: impl Into<String>, value: f64) -> Self {
        self.constants.insert(name.into(), value);
        self
    }

    pub fn function_id(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn function(&self, id: u32) -> Option<&BuiltinFn> {
        self.functions.get(id as usize)
    }

    pub fn constant(&self, name: &str) -> Option<f64> {
        self.constants.get(name).copied()
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|f| f.name.as_str())
    }

    pub fn constant_names(&self) -> impl Iterator<Item = &str> {
        self.constants.keys().map(String::as_str)
    }

    pub fn closest_function(&self, name: &str) -> Option<&str> {
        closest_match(name, self.function_names())
    }

    pub fn closest_constant(&self, name: &str) -> Option<&str> {
        closest_match(name, self.constant_names())
    }
}

fn closest_match<'a>(name: &str, candidates: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut best: Option<(&str, usize)> = None;
    for candidate in candidates {
        let dist = levenshtein(name, candidate);
        // ties go to the alphabetically first name so hints are stable
        let better = match best {
            None => true,
            Some((b, d)) => dist < d || (dist == d && candidate < b),
        };
        if dist <= 3 && better {
            best = Some((candidate, dist));
        }
    }
    best.map(|(s, _)| s)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut row = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            row[j + 1] = (prev[j + 1] + 1).min(row[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[b.len()]
}
