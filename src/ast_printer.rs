use crate::ast::{Expr, LiteralValue};

/// Converts an expression to the Crafting‑Interpreters prefix form, e.g.
/// `(* (- 123.0) (group 45.67))`.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        // 3 → 3.0
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            Expr::Grouping(inner) => Self::parenthesize("group", &[inner.as_ref()]),

            Expr::Unary { operator, right } => Self::parenthesize(&operator.lexeme, &[right.as_ref()]),

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => Self::parenthesize(&operator.lexeme, &[left.as_ref(), right.as_ref()]),

            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut s = format!("(call {}", Self::print(callee));
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),
        }
    }

    /// Reverse Polish form: operands first, then the operator, so
    /// `(1 + 2) * (4 - 3)` prints as `1.0 2.0 + 4.0 3.0 - *`.  Grouping
    /// disappears; unary minus is written `neg` to keep it apart from
    /// subtraction.
    pub fn print_rpn(expr: &Expr) -> String {
        match expr {
            Expr::Literal(_) | Expr::Variable { .. } | Expr::This { .. } => Self::print(expr),

            Expr::Grouping(inner) => Self::print_rpn(inner),

            Expr::Unary { operator, right } => {
                let op: &str = if operator.lexeme == "-" {
                    "neg"
                } else {
                    &operator.lexeme
                };
                format!("{} {}", Self::print_rpn(right), op)
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "{} {} {}",
                Self::print_rpn(left),
                Self::print_rpn(right),
                operator.lexeme
            ),

            Expr::Assign { name, value, .. } => {
                format!("{} {} =", Self::print_rpn(value), name.lexeme)
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut s = Self::print_rpn(callee);
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print_rpn(arg));
                }
                s.push_str(&format!(" call/{}", arguments.len()));
                s
            }

            Expr::Get { object, name } => format!("{} .{}", Self::print_rpn(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "{} {} .{} =",
                Self::print_rpn(object),
                Self::print_rpn(value),
                name.lexeme
            ),

            Expr::Super { method, .. } => format!("super.{}", method.lexeme),
        }
    }

    fn parenthesize(name: &str, exprs: &[&Expr]) -> String {
        let mut s = format!("({}", name);
        for expr in exprs {
            s.push(' ');
            s.push_str(&Self::print(expr));
        }
        s.push(')');
        s
    }
}
