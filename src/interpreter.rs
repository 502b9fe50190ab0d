//! Tree‑walking evaluator.
//!
//! `execute` and `evaluate` are mutually recursive walks over the tree.
//! Statements report how control left them through [`Flow`]; a runtime
//! failure travels as `Err(LoxError::Runtime)` and aborts the whole unit.
//! Resolved references go straight to their frame with
//! [`Environment::get_at`]; anything the resolver left out of the table is
//! looked up by name in the globals.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Stdout, Write};
use std::mem;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, LiteralValue, Stmt};
use crate::callable::{Callable, LoxFunction, NativeFunction};
use crate::class::{LoxClass, LoxInstance, INITIALIZER_NAME};
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::resolver::Locals;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Fell off the end; carry on with the next statement.
    Normal,
    /// A `return` is unwinding towards the nearest enclosing call.
    Return(Value),
}

pub struct Interpreter<W: Write = Stdout> {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    out: W,
    echo_expressions: bool,
}

impl Interpreter<Stdout> {
    /// Interpreter printing to the process's standard output.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Interpreter<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Interpreter<W> {
    /// Creates an Interpreter writing `print` output to `out` and defines
    /// native functions such as `clock`.
    pub fn with_output(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");

        let clock = NativeFunction {
            name: "clock".to_string(),
            arity: 0,
            func: |_args: &[Value]| {
                let millis = chrono::Utc::now().timestamp_millis();
                Ok(Value::Number(millis as f64 / 1000.0))
            },
        };

        globals
            .borrow_mut()
            .define("clock", Value::Callable(Callable::Native(Rc::new(clock))));

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
            echo_expressions: false,
        }
    }

    /// When set, top‑level expression statements print their value, as a
    /// REPL expects.
    pub fn set_echo_expressions(&mut self, echo: bool) {
        self.echo_expressions = echo;
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn globals(&self) -> &Rc<RefCell<Environment>> {
        &self.globals
    }

    /// Merge a unit's addressing table.  Ids are unique across units, so
    /// earlier entries (still used by live closures) are never clobbered.
    pub fn resolve(&mut self, locals: Locals) {
        debug!("Adding {} resolved reference(s)", locals.len());
        self.locals.extend(locals);
    }

    /// Interprets a list of statements (a "program" or one REPL line).
    /// Stops at the first runtime error.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        info!("Interpreting {} statements", statements.len());

        for stmt in statements {
            match stmt {
                Stmt::Expression(expr) if self.echo_expressions => {
                    let value: Value = self.evaluate(expr)?;
                    writeln!(self.out, "{}", value)?;
                }
                _ => {
                    if let Flow::Return(_) = self.execute(stmt)? {
                        // Rejected by the resolver; nothing to unwind to.
                        break;
                    }
                }
            }
        }

        self.out.flush()?;

        info!("Interpretation completed successfully");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Block(statements) => {
                let environment = Environment::child_of(&self.environment);
                self.execute_block(statements, environment)
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let superclass: Option<Rc<LoxClass>> = match superclass {
                    Some(expr) => Some(self.evaluate_superclass(expr)?),
                    None => None,
                };

                self.environment.borrow_mut().define_unassigned(&name.lexeme);

                // Methods of a subclass close over an extra frame holding
                // `super`.
                let enclosing: Option<Rc<RefCell<Environment>>> =
                    superclass.as_ref().map(|superclass| {
                        let environment = Environment::child_of(&self.environment);
                        environment.borrow_mut().define(
                            "super",
                            Value::Callable(Callable::Class(Rc::clone(superclass))),
                        );
                        mem::replace(&mut self.environment, environment)
                    });

                let methods: HashMap<String, Rc<LoxFunction>> = methods
                    .iter()
                    .map(|method| {
                        let function = LoxFunction::new(
                            Rc::clone(method),
                            Rc::clone(&self.environment),
                            method.name.lexeme == INITIALIZER_NAME,
                        );
                        (method.name.lexeme.clone(), Rc::new(function))
                    })
                    .collect();

                let class = LoxClass::new(name.lexeme.clone(), superclass, methods);

                if let Some(enclosing) = enclosing {
                    self.environment = enclosing;
                }

                info!("Class '{}' defined", name.lexeme);

                self.environment
                    .borrow_mut()
                    .assign(name, Value::Callable(Callable::Class(Rc::new(class))))?;
                Ok(Flow::Normal)
            }

            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                // The closure is the *current* frame, which is also where the
                // name goes, so the body can call itself.
                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );
                self.environment.borrow_mut().define(
                    &declaration.name.lexeme,
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
                Ok(Flow::Normal)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Ok(Flow::Return(value))
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` with `environment` as the current frame, restoring
    /// the previous frame however the block exits.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> Result<Flow> {
        let previous = mem::replace(&mut self.environment, environment);

        let mut outcome: Result<Flow> = Ok(Flow::Normal);
        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Normal) => {}
                other => {
                    outcome = other;
                    break;
                }
            }
        }

        self.environment = previous;
        outcome
    }

    fn evaluate_superclass(&mut self, expr: &Expr) -> Result<Rc<LoxClass>> {
        match self.evaluate(expr)? {
            Value::Callable(Callable::Class(class)) => Ok(class),
            _ => {
                let fallback = Token::synthetic("super", 0);
                let name: &Token = match expr {
                    Expr::Variable { name, .. } => name,
                    _ => &fallback,
                };
                Err(LoxError::runtime(name, "Superclass must be a class."))
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(&self.environment, distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;
                let right: Value = self.evaluate(right)?;
                binary(operator, left, right)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                let Value::Callable(callable) = callee else {
                    return Err(LoxError::runtime(
                        paren,
                        "Can only call functions and classes.",
                    ));
                };

                if args.len() != callable.arity() {
                    return Err(LoxError::runtime(
                        paren,
                        format!(
                            "Expected {} arguments but got {}.",
                            callable.arity(),
                            args.len()
                        ),
                    ));
                }

                self.call(&callable, paren, args)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(LoxError::runtime(name, "Only instances have properties.")),
            },

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                // Yields the deciding operand itself, not a coerced boolean.
                let left: Value = self.evaluate(left)?;

                let short_circuit = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::runtime(name, "Only instances have fields."));
                };

                let value: Value = self.evaluate(value)?;
                instance.set(name, value.clone());
                Ok(value)
            }

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Unary { operator, right } => {
                let right: Value = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(LoxError::runtime(
                            operator,
                            format!(
                                "Operand of '-' must be a number, got {}.",
                                other.type_name()
                            ),
                        )),
                    },
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    _ => Err(LoxError::runtime(operator, "Invalid unary operator.")),
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    /// `super.method`: the superclass sits at the recorded distance and the
    /// receiver one frame closer.  Lookup starts at the superclass, skipping
    /// any override in the subclass.
    fn evaluate_super(&self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let distance: usize = *self
            .locals
            .get(&id)
            .ok_or_else(|| LoxError::runtime(keyword, "Unresolved 'super'."))?;

        let Value::Callable(Callable::Class(superclass)) =
            Environment::get_at(&self.environment, distance, keyword)?
        else {
            return Err(LoxError::runtime(keyword, "'super' is not a class."));
        };

        let this = Token::synthetic("this", keyword.line);
        let receiver = distance
            .checked_sub(1)
            .ok_or_else(|| LoxError::runtime(keyword, "Unresolved 'this'."))?;
        let Value::Instance(instance) = Environment::get_at(&self.environment, receiver, &this)?
        else {
            return Err(LoxError::runtime(keyword, "'this' is not an instance."));
        };

        let Some(method_fn) = superclass.find_method(&method.lexeme) else {
            return Err(LoxError::runtime(
                method,
                format!("Undefined property '{}'.", method.lexeme),
            ));
        };

        let bound = method_fn.bind(instance);
        Ok(Value::Callable(Callable::Function(Rc::new(bound))))
    }

    /// Invoke a callable whose arity has already been checked.
    fn call(&mut self, callable: &Callable, paren: &Token, args: Vec<Value>) -> Result<Value> {
        match callable {
            Callable::Function(function) => function.call(self, args),
            Callable::Class(class) => LoxClass::instantiate(class, self, args),
            Callable::Native(native) => {
                debug!("Calling native function '{}'", native.name);
                (native.func)(&args).map_err(|message| LoxError::runtime(paren, message))
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operators
// ─────────────────────────────────────────────────────────────────────────────

fn binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    match operator.token_type {
        TokenType::EQUAL_EQUAL => return Ok(Value::Bool(left == right)),
        TokenType::BANG_EQUAL => return Ok(Value::Bool(left != right)),
        _ => {}
    }

    let (a, b) = match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => (*a, *b),

        (Value::String(a), Value::String(b)) if operator.token_type == TokenType::PLUS => {
            return Ok(Value::String(format!("{}{}", a, b)));
        }

        _ => {
            let expected = if operator.token_type == TokenType::PLUS {
                "two numbers or two strings"
            } else {
                "numbers"
            };

            return Err(LoxError::runtime(
                operator,
                format!(
                    "Operands of '{}' must be {}, got {} and {}.",
                    operator.lexeme,
                    expected,
                    left.type_name(),
                    right.type_name()
                ),
            ));
        }
    };

    match operator.token_type {
        TokenType::PLUS => Ok(Value::Number(a + b)),
        TokenType::MINUS => Ok(Value::Number(a - b)),
        TokenType::STAR => Ok(Value::Number(a * b)),
        TokenType::SLASH => {
            if b == 0.0 {
                Err(LoxError::runtime(operator, "Division by zero."))
            } else {
                Ok(Value::Number(a / b))
            }
        }
        TokenType::GREATER => Ok(Value::Bool(a > b)),
        TokenType::GREATER_EQUAL => Ok(Value::Bool(a >= b)),
        TokenType::LESS => Ok(Value::Bool(a < b)),
        TokenType::LESS_EQUAL => Ok(Value::Bool(a <= b)),
        _ => Err(LoxError::runtime(operator, "Invalid binary operator.")),
    }
}
