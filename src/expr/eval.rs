//! Expression evaluation with precedence climbing
//!
//! The evaluator walks the token stream once, applying operators as soon as
//! both operands are known. `parse_value(floor)` parses one operand, then
//! folds in binary operators while their precedence exceeds `floor`,
//! recursing for right-hand sides at the operator's own precedence.
//!
//! # Broadcasting
//!
//! A length-1 operand is a scalar and broadcasts across the other operand.
//! The scalar may sit on either side; operand order is preserved for the
//! non-commutative operators (`2 - v` is not `v - 2`). Two proper vectors
//! must have equal lengths.
//!
//! # Finiteness
//!
//! Component functions classify every output (NaN → domain, infinity →
//! overflow, nonzero subnormal → underflow), and the final result is checked
//! again so constructs whose intermediate values slip through (`1/0` never
//! happens — division is checked — but e.g. `exp(700) * 10` can) still fail
//! rather than return infinities.

use crate::expr::funcs::{self, MathFunc};
use crate::expr::lexer::{Lexer, Token};
use crate::expr::{EvalError, MathError, Substitutor};
use crate::store::registry::{VectorId, VectorStore};

/// Binary operators, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

impl BinOp {
    fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Eq | BinOp::Ne => 3,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 4,
            BinOp::Shl | BinOp::Shr => 5,
            BinOp::Add | BinOp::Sub => 6,
            BinOp::Mul | BinOp::Div | BinOp::Rem => 7,
            BinOp::Pow => 8,
        }
    }
}

/// Unary `-` and `!` bind tighter than any binary operator.
const UNARY_PRECEDENCE: u8 = 9;

/// Evaluate an expression against the store's vectors.
///
/// The result is a plain value list; a scalar result has length 1.
pub fn evaluate(store: &VectorStore, expression: &str) -> Result<Vec<f64>, EvalError> {
    evaluate_inner(store, expression, None)
}

/// Evaluate with `$var` / `[script]` substitution provided by `subst`.
pub fn evaluate_with(
    store: &VectorStore,
    expression: &str,
    subst: &mut dyn Substitutor,
) -> Result<Vec<f64>, EvalError> {
    evaluate_inner(store, expression, Some(subst))
}

/// Evaluate an expression and store the result into `target`, notifying the
/// target's clients.
pub fn evaluate_into(
    store: &mut VectorStore,
    target: VectorId,
    expression: &str,
) -> Result<(), EvalError> {
    let result = evaluate_inner(store, expression, None)?;
    store.reset(target, result)?;
    Ok(())
}

fn evaluate_inner(
    store: &VectorStore,
    expression: &str,
    subst: Option<&mut dyn Substitutor>,
) -> Result<Vec<f64>, EvalError> {
    let tokens = Lexer::new(expression).tokenize()?;
    let mut evaluator = Evaluator {
        store,
        tokens,
        position: 0,
        subst,
    };

    let result = evaluator.parse_value(0)?;
    match evaluator.peek() {
        Token::End(_) => {}
        token => {
            return Err(EvalError::Syntax {
                message: format!("expected end of expression, found {}", token),
                pos: token.pos(),
            });
        }
    }

    // Last line of defense: no non-finite value escapes an evaluation
    for &value in &result {
        if value.is_nan() {
            return Err(EvalError::Math(MathError::Domain));
        }
        if value.is_infinite() {
            return Err(EvalError::Math(MathError::Overflow));
        }
    }
    Ok(result)
}

struct Evaluator<'a, 'b> {
    store: &'a VectorStore,
    tokens: Vec<Token>,
    position: usize,
    subst: Option<&'b mut dyn Substitutor>,
}

impl Evaluator<'_, '_> {
    /// Parse one operand, then fold in binary operators with precedence
    /// above `floor`.
    fn parse_value(&mut self, floor: u8) -> Result<Vec<f64>, EvalError> {
        let mut left = self.parse_operand()?;

        loop {
            let op = match self.peek_operator()? {
                Some(op) => op,
                None => break,
            };
            if op.precedence() <= floor {
                break;
            }
            self.advance();
            let right = self.parse_value(op.precedence())?;
            left = apply_binary(op, left, right)?;
        }

        Ok(left)
    }

    fn parse_operand(&mut self) -> Result<Vec<f64>, EvalError> {
        let token = self.advance();
        match token {
            Token::LParen(pos) => {
                let value = self.parse_value(0)?;
                match self.advance() {
                    Token::RParen(_) => Ok(value),
                    _ => Err(EvalError::UnmatchedParen { pos }),
                }
            }

            Token::Minus(_) => {
                let mut value = self.parse_value(UNARY_PRECEDENCE)?;
                for x in &mut value {
                    *x = -*x;
                }
                Ok(value)
            }

            Token::Bang(_) => {
                let mut value = self.parse_value(UNARY_PRECEDENCE)?;
                for x in &mut value {
                    *x = if *x == 0.0 { 1.0 } else { 0.0 };
                }
                Ok(value)
            }

            Token::Number(n, _) => Ok(vec![n]),

            Token::Ident(name, pos) => match funcs::lookup(&name) {
                Some(func) => self.apply_function(&name, func, pos),
                None => Ok(self.store.vector(self.store.lookup(&name)?)?.values().to_vec()),
            },

            Token::Variable(name, _) => {
                let text = match self.subst.as_mut() {
                    Some(subst) => subst
                        .variable(&name)
                        .ok_or(EvalError::UnknownVariable(name))?,
                    None => return Err(EvalError::NoSubstitutor),
                };
                self.operand_from_text(&text)
            }

            Token::Script(body, _) => {
                let text = match self.subst.as_mut() {
                    Some(subst) => subst.command(&body).ok_or(EvalError::ScriptFailed(body))?,
                    None => return Err(EvalError::NoSubstitutor),
                };
                self.operand_from_text(&text)
            }

            Token::Quoted(text, _) | Token::Braced(text, _) => self.operand_from_text(&text),

            token => Err(EvalError::Syntax {
                message: format!("expected an operand, found {}", token),
                pos: token.pos(),
            }),
        }
    }

    /// A substitution produced `text`; re-interpret it as a number or a
    /// vector name.
    fn operand_from_text(&mut self, text: &str) -> Result<Vec<f64>, EvalError> {
        let trimmed = text.trim();
        if let Ok(value) = trimmed.parse::<f64>() {
            return Ok(vec![value]);
        }
        Ok(self
            .store
            .vector(self.store.lookup(trimmed)?)?
            .values()
            .to_vec())
    }

    fn apply_function(
        &mut self,
        name: &str,
        func: MathFunc,
        pos: usize,
    ) -> Result<Vec<f64>, EvalError> {
        match self.advance() {
            Token::LParen(_) => {}
            token => {
                return Err(EvalError::Syntax {
                    message: format!("expected '(' after \"{}\", found {}", name, token),
                    pos: token.pos(),
                });
            }
        }
        let mut arg = self.parse_value(0)?;
        match self.advance() {
            Token::RParen(_) => {}
            _ => return Err(EvalError::UnmatchedParen { pos }),
        }

        match func {
            MathFunc::Component(f) => {
                for x in &mut arg {
                    *x = classify(f(*x))?;
                }
                Ok(arg)
            }
            MathFunc::Scalar(f) => Ok(vec![f(&arg)]),
            MathFunc::Vector(f) => {
                f(&mut arg);
                Ok(arg)
            }
        }
    }

    /// The operator starting the next binary application, if any. `None`
    /// for the terminators (end, `)`, `,`).
    fn peek_operator(&self) -> Result<Option<BinOp>, EvalError> {
        let op = match self.peek() {
            Token::OrOr(_) => BinOp::Or,
            Token::AndAnd(_) => BinOp::And,
            Token::EqEq(_) => BinOp::Eq,
            Token::NotEq(_) => BinOp::Ne,
            Token::Lt(_) => BinOp::Lt,
            Token::Le(_) => BinOp::Le,
            Token::Gt(_) => BinOp::Gt,
            Token::Ge(_) => BinOp::Ge,
            Token::LtLt(_) => BinOp::Shl,
            Token::GtGt(_) => BinOp::Shr,
            Token::Plus(_) => BinOp::Add,
            Token::Minus(_) => BinOp::Sub,
            Token::Star(_) => BinOp::Mul,
            Token::Slash(_) => BinOp::Div,
            Token::Percent(_) => BinOp::Rem,
            Token::Caret(_) => BinOp::Pow,
            Token::End(_) | Token::RParen(_) | Token::Comma(_) => return Ok(None),
            token => {
                return Err(EvalError::Syntax {
                    message: format!("expected an operator, found {}", token),
                    pos: token.pos(),
                });
            }
        };
        Ok(Some(op))
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.position].clone();
        if !matches!(token, Token::End(_)) {
            self.position += 1;
        }
        token
    }
}

/// Apply `op` with broadcasting.
fn apply_binary(op: BinOp, mut left: Vec<f64>, mut right: Vec<f64>) -> Result<Vec<f64>, EvalError> {
    if matches!(op, BinOp::Shl | BinOp::Shr) {
        return rotate(op, left, &right);
    }

    if right.len() == 1 {
        let scalar = right[0];
        if matches!(op, BinOp::Div | BinOp::Rem) && scalar == 0.0 {
            return Err(EvalError::DivideByZero);
        }
        for x in &mut left {
            *x = scalar_op(op, *x, scalar)?;
        }
        Ok(left)
    } else if left.len() == 1 {
        // Broadcast the left scalar, keeping operand order for the
        // non-commutative operators
        let scalar = left[0];
        if matches!(op, BinOp::Div | BinOp::Rem) && right.iter().any(|&x| x == 0.0) {
            return Err(EvalError::DivideByZero);
        }
        for x in &mut right {
            *x = scalar_op(op, scalar, *x)?;
        }
        Ok(right)
    } else if left.len() == right.len() {
        if matches!(op, BinOp::Div | BinOp::Rem) && right.iter().any(|&x| x == 0.0) {
            return Err(EvalError::DivideByZero);
        }
        for (x, &y) in left.iter_mut().zip(&right) {
            *x = scalar_op(op, *x, y)?;
        }
        Ok(left)
    } else {
        Err(EvalError::LengthMismatch {
            left: left.len(),
            right: right.len(),
        })
    }
}

/// `<<` / `>>` rotate the left vector circularly; the right operand is the
/// rotation amount and must be a scalar.
fn rotate(op: BinOp, mut left: Vec<f64>, right: &[f64]) -> Result<Vec<f64>, EvalError> {
    if right.len() != 1 {
        return Err(EvalError::NonScalarShift);
    }
    if left.is_empty() {
        return Ok(left);
    }
    let length = left.len() as i64;
    let amount = ((right[0] as i64 % length) + length) % length;
    match op {
        BinOp::Shl => left.rotate_left(amount as usize),
        BinOp::Shr => left.rotate_right(amount as usize),
        _ => return Err(EvalError::UnknownOperator),
    }
    Ok(left)
}

fn scalar_op(op: BinOp, a: f64, b: f64) -> Result<f64, EvalError> {
    let value = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        BinOp::Rem => a % b,
        BinOp::Pow => a.powf(b),
        BinOp::Lt => bool_value(a < b),
        BinOp::Le => bool_value(a <= b),
        BinOp::Gt => bool_value(a > b),
        BinOp::Ge => bool_value(a >= b),
        BinOp::Eq => bool_value(a == b),
        BinOp::Ne => bool_value(a != b),
        BinOp::And => bool_value(a != 0.0 && b != 0.0),
        BinOp::Or => bool_value(a != 0.0 || b != 0.0),
        // Shifts never reach element-wise application
        BinOp::Shl | BinOp::Shr => return Err(EvalError::UnknownOperator),
    };
    Ok(value)
}

fn bool_value(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

/// Classify a component function's output.
fn classify(value: f64) -> Result<f64, EvalError> {
    if value.is_nan() {
        Err(EvalError::Math(MathError::Domain))
    } else if value.is_infinite() {
        Err(EvalError::Math(MathError::Overflow))
    } else if value != 0.0 && value.abs() < f64::MIN_POSITIVE {
        Err(EvalError::Math(MathError::Underflow))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(name: &str, values: &[f64]) -> VectorStore {
        let mut store = VectorStore::new();
        let id = store.create(name, 0).unwrap();
        store.reset_from_slice(id, values).unwrap();
        store
    }

    #[test]
    fn test_precedence() {
        let store = VectorStore::new();
        assert_eq!(evaluate(&store, "2 + 3 * 4").unwrap(), vec![14.0]);
        assert_eq!(evaluate(&store, "(2 + 3) * 4").unwrap(), vec![20.0]);
        assert_eq!(evaluate(&store, "2 ^ 3 * 2").unwrap(), vec![16.0]);
        assert_eq!(evaluate(&store, "1 < 2 && 3 > 2").unwrap(), vec![1.0]);
    }

    #[test]
    fn test_unary_binds_tightest() {
        let store = VectorStore::new();
        assert_eq!(evaluate(&store, "-2 ^ 2").unwrap(), vec![4.0]);
        assert_eq!(evaluate(&store, "!0 + 1").unwrap(), vec![2.0]);
    }

    #[test]
    fn test_unmatched_paren() {
        let store = VectorStore::new();
        assert!(matches!(
            evaluate(&store, "(1 + 2"),
            Err(EvalError::UnmatchedParen { .. })
        ));
        assert!(matches!(
            evaluate(&store, "1 + 2)"),
            Err(EvalError::Syntax { .. })
        ));
    }

    #[test]
    fn test_trailing_garbage() {
        let store = store_with("v", &[1.0]);
        assert!(matches!(
            evaluate(&store, "1 2"),
            Err(EvalError::Syntax { .. })
        ));
    }

    #[test]
    fn test_rotation() {
        let store = store_with("v", &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            evaluate(&store, "v << 1").unwrap(),
            vec![2.0, 3.0, 4.0, 1.0]
        );
        assert_eq!(
            evaluate(&store, "v >> 1").unwrap(),
            vec![4.0, 1.0, 2.0, 3.0]
        );
        // Amount wraps modulo the length
        assert_eq!(
            evaluate(&store, "v << 5").unwrap(),
            vec![2.0, 3.0, 4.0, 1.0]
        );
    }

    #[test]
    fn test_shift_requires_scalar_amount() {
        let store = store_with("v", &[1.0, 2.0, 3.0]);
        assert!(matches!(
            evaluate(&store, "v << v"),
            Err(EvalError::NonScalarShift)
        ));
    }
}
