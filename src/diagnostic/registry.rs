/// An entry in the error code registry.
pub struct ErrorEntry {
    pub code: &'static str,
    pub short: &'static str,
    pub long: &'static str,
}

/// All stable diagnostic codes.
pub static REGISTRY: &[ErrorEntry] = &[
    // ── Parser ───────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "CALC-P001",
        short: "unexpected token",
        long: r#"## CALC-P001: unexpected token

The parser found a token that cannot appear at this point. The message
lists the token kinds that would have been accepted.

A `-` written directly before a digit is part of the number, so

    3-5

reads as the number `3` followed by the number `-5`. Put spaces around
the operator to subtract:

    3 - 5

Each precedence level combines one operator at a time. Longer chains
need parentheses:

    (1 + 2) + 3
"#,
    },
    ErrorEntry {
        code: "CALC-P002",
        short: "expression nested too deep",
        long: r#"## CALC-P002: expression nested too deep

Parenthesised groups and function call argument lists share a nesting
budget of 256. A group costs 1 and a call costs 2, so 256 bare groups or
128 nested calls are the most accepted. The error points at the `(`
that goes over budget. For example

    ((abs((1))))

spends 5 of the budget. Remove redundant parentheses or split the
expression.
"#,
    },
    // ── Compiler ─────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "CALC-C001",
        short: "unknown constant",
        long: r#"## CALC-C001: unknown constant

A bare name was used that is not one of the built-in constants:

    e  pi  phi  sqrt_2  sqrt_e  sqrt_pi  sqrt_phi  ln_2  ln_10

Names are case sensitive. A name followed by `(` is a function call
instead.
"#,
    },
    ErrorEntry {
        code: "CALC-C002",
        short: "unknown function",
        long: r#"## CALC-C002: unknown function

A call names a function that is not built in. Available functions:

    abs acos acosh asin asinh atan atanh cbrt ceil cos cosh exp expm1
    floor log log10 log1p log2 round sin sinh sqrt tan tanh trunc
    rad deg neg

`log` is the natural logarithm. `rad` converts degrees to radians and
`deg` converts radians to degrees.
"#,
    },
    ErrorEntry {
        code: "CALC-C003",
        short: "too many constants",
        long: r#"## CALC-C003: too many constants

A program can reference at most 512 distinct constant values. Repeated
values share one slot, so this only triggers for very large expressions.
"#,
    },
    // ── Archive ──────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "CALC-A001",
        short: "not a calc archive",
        long: r#"## CALC-A001: not a calc archive

The file does not start with the 8 byte magic `calc.arc`. It was not
produced by `calc build`, or it has been damaged.
"#,
    },
    ErrorEntry {
        code: "CALC-A002",
        short: "misaligned constant block",
        long: r#"## CALC-A002: misaligned constant block

The constant block length in the header must be a multiple of 8, since
every constant is an 8 byte float.
"#,
    },
    ErrorEntry {
        code: "CALC-A003",
        short: "misaligned instruction record",
        long: r#"## CALC-A003: misaligned instruction record

Each instruction record declares its length: one opcode byte plus four
bytes per operand. A length of zero, or one that leaves a partial
operand, is rejected.
"#,
    },
    ErrorEntry {
        code: "CALC-A004",
        short: "truncated archive",
        long: r#"## CALC-A004: truncated archive

The archive ends in the middle of a field. The file was probably cut
short while being written or copied.
"#,
    },
    ErrorEntry {
        code: "CALC-A005",
        short: "too many constants in archive",
        long: r#"## CALC-A005: too many constants in archive

The archive declares more than 512 constants, which no compiled program
can contain.
"#,
    },
    // ── Runtime ──────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "CALC-R001",
        short: "wrong number of arguments",
        long: r#"## CALC-R001: wrong number of arguments

A function was called with a different number of arguments than it
takes. Every built-in function takes exactly one argument:

    abs(1, 2)    error
    abs(-2)      2
"#,
    },
    ErrorEntry {
        code: "CALC-R002",
        short: "unknown builtin id",
        long: r#"## CALC-R002: unknown builtin id

A `Call` instruction refers to a function id this build does not have.
The archive was probably built by a newer calc.
"#,
    },
    ErrorEntry {
        code: "CALC-R003",
        short: "stack overflow",
        long: r#"## CALC-R003: stack overflow

More than 1024 values were live on the VM stack at once.
"#,
    },
    ErrorEntry {
        code: "CALC-R004",
        short: "stack underflow",
        long: r#"## CALC-R004: stack underflow

An instruction needed more values than were on the stack, or the program
finished with an empty stack. Compiled programs never do this; the
archive was hand-built or damaged.
"#,
    },
    ErrorEntry {
        code: "CALC-R005",
        short: "constant index out of range",
        long: r#"## CALC-R005: constant index out of range

A `Constant` instruction refers to a slot past the end of the archive's
constant block.
"#,
    },
    ErrorEntry {
        code: "CALC-R006",
        short: "unknown opcode",
        long: r#"## CALC-R006: unknown opcode

The archive contains an instruction whose opcode byte this VM does not
recognise. Loading succeeds; executing it fails.
"#,
    },
    ErrorEntry {
        code: "CALC-R007",
        short: "missing operand",
        long: r#"## CALC-R007: missing operand

An instruction carries fewer operands than its opcode needs. `Constant`
takes one (the pool index) and `Call` takes two (function id and
argument count).
"#,
    },
];

/// Look up an error entry by code (e.g. `"CALC-C002"`).
pub fn lookup(code: &str) -> Option<&'static ErrorEntry> {
    REGISTRY.iter().find(|e| e.code.eq_ignore_ascii_case(code))
}
