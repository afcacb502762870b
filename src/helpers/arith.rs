//! Arithmetic shared by the `math` and `set` helpers.

use crate::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Subtract,
    Multiply,
    Divide,
    Mod,
    Abs,
    Floor,
    Ceil,
    Round,
    ToInt,
}

impl Op {
    /// The operations that take an operand, in the order they are checked
    /// for as parameters.
    pub const BINARY: [Op; 5] = [Op::Add, Op::Subtract, Op::Multiply, Op::Divide, Op::Mod];

    pub const ALL: [Op; 10] = [
        Op::Add,
        Op::Subtract,
        Op::Multiply,
        Op::Divide,
        Op::Mod,
        Op::Abs,
        Op::Floor,
        Op::Ceil,
        Op::Round,
        Op::ToInt,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Op::Add => "add",
            Op::Subtract => "subtract",
            Op::Multiply => "multiply",
            Op::Divide => "divide",
            Op::Mod => "mod",
            Op::Abs => "abs",
            Op::Floor => "floor",
            Op::Ceil => "ceil",
            Op::Round => "round",
            Op::ToInt => "toint",
        }
    }

    pub fn is_unary(self) -> bool {
        !Self::BINARY.contains(&self)
    }

    /// Applies the operation.
    ///
    /// Returns `None` if either side is not a number or on division by zero.
    /// Integer division stays an integer only when it is exact.
    pub fn apply(self, lhs: &Value, rhs: Option<&Value>) -> Option<Value> {
        let lhs = lhs.as_number()?;
        if self.is_unary() {
            return Some(self.unary(lhs));
        }
        let rhs = rhs?.as_number()?;
        match (lhs, rhs) {
            (Value::Integer(a), Value::Integer(b)) => self.integer(a, b),
            (a, b) => self.float(a.as_f64()?, b.as_f64()?),
        }
    }

    fn unary(self, value: Value) -> Value {
        match (self, value) {
            (Op::Abs, Value::Integer(n)) => n
                .checked_abs()
                .map_or(Value::Float((n as f64).abs()), Value::Integer),
            (Op::Abs, Value::Float(n)) => Value::Float(n.abs()),
            (Op::Floor, Value::Float(n)) => integral(n.floor()),
            (Op::Ceil, Value::Float(n)) => integral(n.ceil()),
            (Op::Round, Value::Float(n)) => integral((n + 0.5).floor()),
            (Op::ToInt, Value::Float(n)) => integral(n.trunc()),
            (_, value) => value,
        }
    }

    fn integer(self, a: i64, b: i64) -> Option<Value> {
        let exact = match self {
            Op::Add => a.checked_add(b),
            Op::Subtract => a.checked_sub(b),
            Op::Multiply => a.checked_mul(b),
            Op::Divide if b == 0 => return None,
            Op::Divide if a % b == 0 => a.checked_div(b),
            Op::Divide => None,
            Op::Mod => return a.checked_rem(b).map(Value::Integer),
            _ => return None,
        };
        match exact {
            Some(n) => Some(Value::Integer(n)),
            None => self.float(a as f64, b as f64),
        }
    }

    fn float(self, a: f64, b: f64) -> Option<Value> {
        let n = match self {
            Op::Add => a + b,
            Op::Subtract => a - b,
            Op::Multiply => a * b,
            Op::Divide | Op::Mod if b == 0.0 => return None,
            Op::Divide => a / b,
            Op::Mod => a % b,
            _ => return None,
        };
        n.is_finite().then_some(Value::Float(n))
    }
}

fn integral(n: f64) -> Value {
    if n.is_finite() && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Value::Integer(n as i64)
    } else {
        Value::Float(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(op: &str, a: impl Into<Value>, b: impl Into<Value>) -> Option<Value> {
        Op::from_name(op).unwrap().apply(&a.into(), Some(&b.into()))
    }

    #[test]
    fn integer_arithmetic() {
        assert_eq!(apply("add", 5, 3), Some(Value::Integer(8)));
        assert_eq!(apply("subtract", 5, 7), Some(Value::Integer(-2)));
        assert_eq!(apply("multiply", 4, "3"), Some(Value::Integer(12)));
        assert_eq!(apply("divide", 8, 2), Some(Value::Integer(4)));
        assert_eq!(apply("divide", 7, 2), Some(Value::Float(3.5)));
        assert_eq!(apply("mod", 7, 3), Some(Value::Integer(1)));
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(apply("divide", 1, 0), None);
        assert_eq!(apply("mod", 1, 0), None);
        assert_eq!(apply("divide", 1.5, 0), None);
    }

    #[test]
    fn not_a_number() {
        assert_eq!(apply("add", "x", 1), None);
        assert_eq!(Op::Add.apply(&Value::from(1), None), None);
    }

    #[test]
    fn unary() {
        assert_eq!(Op::Abs.apply(&Value::from(-3), None), Some(Value::Integer(3)));
        assert_eq!(Op::Floor.apply(&Value::from(2.7), None), Some(Value::Integer(2)));
        assert_eq!(Op::Ceil.apply(&Value::from(2.1), None), Some(Value::Integer(3)));
        assert_eq!(Op::Round.apply(&Value::from(2.5), None), Some(Value::Integer(3)));
        assert_eq!(Op::ToInt.apply(&Value::from("-2.9"), None), Some(Value::Integer(-2)));
    }
}
