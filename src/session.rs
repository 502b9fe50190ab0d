//! One interpreter kept alive across many units of source.
//!
//! A file run is a single unit; in the REPL every line is its own unit but
//! globals, functions and classes defined by earlier lines stay visible.

use std::fs;
use std::io::{Stdout, Write};
use std::path::Path;

use log::info;

use crate::ast::Stmt;
use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::scan_all;
use crate::value::Value;

pub struct Session<W: Write = Stdout> {
    interpreter: Interpreter<W>,
}

impl Session<Stdout> {
    pub fn new() -> Self {
        Self {
            interpreter: Interpreter::new(),
        }
    }

    /// A session that echoes the value of bare expression statements.
    pub fn repl() -> Self {
        let mut session = Self::new();
        session.interpreter.set_echo_expressions(true);
        session
    }
}

impl Default for Session<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Session<W> {
    pub fn with_output(out: W) -> Self {
        Self {
            interpreter: Interpreter::with_output(out),
        }
    }

    pub fn set_repl_mode(&mut self, enabled: bool) {
        self.interpreter.set_echo_expressions(enabled);
    }

    pub fn interpreter(&self) -> &Interpreter<W> {
        &self.interpreter
    }

    pub fn into_output(self) -> W {
        self.interpreter.into_output()
    }

    /// Scan, parse, resolve and execute one unit.
    ///
    /// Errors from every static phase are gathered and returned together,
    /// and any of them keeps the unit from running.  A runtime error stops
    /// the unit and comes back alone.
    pub fn run(&mut self, source: &str) -> Result<(), Vec<LoxError>> {
        info!("Running unit of {} byte(s)", source.len());

        let statements: Vec<Stmt> = parse_program(source)?;

        let locals = Resolver::new().resolve(&statements)?;
        self.interpreter.resolve(locals);

        self.interpreter.interpret(&statements).map_err(|e| vec![e])
    }

    /// Read a file and run it as a single unit.
    pub fn run_file(&mut self, path: &Path) -> Result<(), Vec<LoxError>> {
        info!("Running file {:?}", path);

        let bytes: Vec<u8> = fs::read(path).map_err(|e| vec![LoxError::from(e)])?;
        let source: String = String::from_utf8(bytes).map_err(|e| vec![LoxError::from(e)])?;

        self.run(&source)
    }

    /// Evaluate `source` as a single expression in the global scope.
    pub fn evaluate_expression(&mut self, source: &str) -> Result<Value, Vec<LoxError>> {
        let (tokens, lex_errors) = scan_all(source);
        if !lex_errors.is_empty() {
            return Err(lex_errors);
        }

        let expr = Parser::new(&tokens).parse_expression().map_err(|e| vec![e])?;

        let locals = Resolver::new().resolve_expression(&expr)?;
        self.interpreter.resolve(locals);

        self.interpreter.evaluate(&expr).map_err(|e| vec![e])
    }
}

/// Scan and parse, reporting lexing and syntax errors in source order.
pub fn parse_program(source: &str) -> Result<Vec<Stmt>, Vec<LoxError>> {
    let (tokens, mut errors) = scan_all(source);

    match Parser::new(&tokens).parse() {
        Ok(statements) if errors.is_empty() => Ok(statements),
        Ok(_) => Err(errors),
        Err(parse_errors) => {
            errors.extend(parse_errors);
            errors.sort_by_key(|e| e.line().unwrap_or(0));
            Err(errors)
        }
    }
}
