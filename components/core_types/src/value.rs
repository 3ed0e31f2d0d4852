//! Tagged runtime value representation.
//!
//! The interpreter's specialized execution paths care about three narrow
//! numeric representations: `Int` (i32), `Double` (f64) and `Long` (the
//! safe-integer overflow representation). Everything else is handled by the
//! generic paths.

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use std::fmt;

/// Handle of an object in the object heap.
///
/// Values never hold objects inline; they refer to them by heap index so
/// that values stay cheap to clone and safe to move across threads.
pub type ObjectId = usize;

/// Represents any runtime value.
///
/// Primitives are stored inline; objects are referenced by [`ObjectId`].
///
/// # Examples
///
/// ```
/// use core_types::Value;
///
/// assert!(!Value::Undefined.is_truthy());
/// assert!(Value::String("x".to_string()).is_truthy());
/// assert_eq!(Value::Double(1.5).type_of(), "number");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The undefined value
    Undefined,
    /// The null value
    Null,
    /// Boolean (true or false)
    Boolean(bool),
    /// 32-bit integer, the narrowest numeric representation
    Int(i32),
    /// Safe integer that no longer fits in 32 bits
    Long(i64),
    /// IEEE 754 double-precision floating point
    Double(f64),
    /// Arbitrary precision integer
    BigInt(BigInt),
    /// String value
    String(String),
    /// Heap-allocated object, referenced by id
    Object(ObjectId),
}

impl Value {
    /// Returns whether this value is truthy.
    ///
    /// Falsy values: `undefined`, `null`, `false`, `0`, `0n`, `NaN` and the
    /// empty string. All objects are truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Long(n) => *n != 0,
            Value::Double(n) => *n != 0.0 && !n.is_nan(),
            Value::BigInt(n) => !n.is_zero(),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) => true,
        }
    }

    /// Returns whether this value is `undefined` or `null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Returns the `typeof` string for this value.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Boolean(_) => "boolean",
            Value::Int(_) | Value::Long(_) | Value::Double(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::String(_) => "string",
            Value::Object(_) => "object",
        }
    }

    /// Returns the numeric value when this is any number representation.
    ///
    /// `Int` and `Long` are widened to `f64`; other value kinds return
    /// `None` (no coercion is performed here).
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(f64::from(*n)),
            Value::Long(n) => Some(*n as f64),
            Value::Double(n) => Some(*n),
            _ => None,
        }
    }

    /// Strict equality (`===`) between two values.
    ///
    /// Unlike [`PartialEq`], which compares representations structurally,
    /// this compares numbers across representations: `Int(1)` strict-equals
    /// `Double(1.0)`.
    pub fn strict_equals(&self, other: &Value) -> bool {
        if let (Some(a), Some(b)) = (self.as_number(), other.as_number()) {
            return a == b;
        }
        // BigInt compares only against BigInt; everything else is structural.
        self == other
    }

    /// Returns the `i32` payload when this value is an `Int`.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the object id when this value is an object reference.
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Creates the narrowest numeric value for an `i64`.
    ///
    /// Values that fit in 32 bits come back as `Int`, the rest as `Long`.
    pub fn from_i64(n: i64) -> Value {
        match i32::try_from(n) {
            Ok(small) => Value::Int(small),
            Err(_) => Value::Long(n),
        }
    }

    /// Creates a numeric value from a `BigInt`, narrowing when it fits the
    /// safe integer range.
    pub fn from_bigint(n: BigInt) -> Value {
        match n.to_i64() {
            Some(small) => Value::from_i64(small),
            None => Value::BigInt(n),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Long(n) => write!(f, "{}", n),
            Value::Double(n) => write!(f, "{}", n),
            Value::BigInt(n) => write!(f, "{}n", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Object(id) => write!(f, "[object #{}]", id),
        }
    }
}
