//! Value types and their JVM encodings.

use std::fmt;

/// The three value types of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Boolean,
    Number,
    String,
}

impl ValueType {
    /// Map a type-name token to its value type.
    ///
    /// Accepts both the keyword spelling (`number`) and the grammar's token
    /// names (`number_t`).
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "number" | "number_t" => Some(ValueType::Number),
            "string" | "string_t" => Some(ValueType::String),
            "boolean" | "boolean_t" => Some(ValueType::Boolean),
            _ => None,
        }
    }

    /// Instruction-family prefix: `i` (int-like), `f` (float-like) or
    /// `a` (reference-like).
    pub fn prefix(self) -> &'static str {
        match self {
            ValueType::Boolean => "i",
            ValueType::Number => "f",
            ValueType::String => "a",
        }
    }

    /// JVM type descriptor used in method signatures.
    pub fn descriptor(self) -> &'static str {
        match self {
            ValueType::Boolean => "I",
            ValueType::Number => "F",
            ValueType::String => "Ljava/lang/String;",
        }
    }

    /// The constant a freshly declared variable of this type holds.
    pub fn default_constant(self) -> Constant {
        match self {
            ValueType::Boolean => Constant::Int(0),
            ValueType::Number => Constant::Float(0.0),
            ValueType::String => Constant::Str(String::new()),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Boolean => write!(f, "boolean"),
            ValueType::Number => write!(f, "number"),
            ValueType::String => write!(f, "string"),
        }
    }
}

/// A typed `ldc` operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i32),
    Float(f32),
    Str(String),
}

impl Constant {
    pub fn value_type(&self) -> ValueType {
        match self {
            Constant::Int(_) => ValueType::Boolean,
            Constant::Float(_) => ValueType::Number,
            Constant::Str(_) => ValueType::String,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(n) => write!(f, "{n}"),
            // Jasmin reads a constant with a decimal point as a float
            Constant::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{x:.1}"),
            Constant::Float(x) => write!(f, "{x}"),
            // Escape sequences written in the source are already Jasmin escapes
            Constant::Str(s) => {
                write!(f, "\"")?;
                let mut escaped = false;
                for c in s.chars() {
                    match c {
                        c if escaped => {
                            escaped = false;
                            write!(f, "{c}")?
                        }
                        '\\' => {
                            escaped = true;
                            write!(f, "\\")?
                        }
                        '"' => write!(f, "\\\"")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        '\r' => write!(f, "\\r")?,
                        c => write!(f, "{c}")?,
                    }
                }
                if escaped {
                    write!(f, "\\")?;
                }
                write!(f, "\"")
            }
        }
    }
}

/// Build a method signature key: `name(<descriptors>)`.
pub fn signature(name: &str, params: &[ValueType]) -> String {
    let descriptors: String = params.iter().map(|t| t.descriptor()).collect();
    format!("{name}({descriptors})")
}

/// Full method name: the signature followed by the return descriptor.
pub fn full_name(signature: &str, return_type: ValueType) -> String {
    format!("{signature}{}", return_type.descriptor())
}
