use rox::ast::{Expr, Stmt};
use rox::ast_printer::AstPrinter;
use rox::error::LoxError;
use rox::parser::Parser;
use rox::scanner::scan_all;

fn parse(source: &str) -> Result<Vec<Stmt>, Vec<LoxError>> {
    let (tokens, errors) = scan_all(source);
    assert!(errors.is_empty(), "lex errors: {:?}", errors);
    Parser::new(&tokens).parse()
}

fn print_expression(source: &str) -> String {
    let (tokens, _) = scan_all(source);
    let expr: Expr = Parser::new(&tokens)
        .parse_expression()
        .expect("valid expression");
    AstPrinter::print(&expr)
}

#[test]
fn prints_precedence_and_grouping() {
    assert_eq!(
        print_expression("-123 * (45.67)"),
        "(* (- 123.0) (group 45.67))"
    );
    assert_eq!(print_expression("1 + 2 * 3 == 7"), "(== (+ 1.0 (* 2.0 3.0)) 7.0)");
    assert_eq!(print_expression("a or b and !c"), "(or a (and b (! c)))");
}

#[test]
fn prints_calls_properties_and_assignment() {
    assert_eq!(print_expression("f(1, \"two\")"), "(call f 1.0 two)");
    assert_eq!(print_expression("a.b.c"), "(. (. a b) c)");
    assert_eq!(print_expression("a.b = c = 3"), "(= (. a b) (= c 3.0))");
}

fn print_rpn(source: &str) -> String {
    let (tokens, _) = scan_all(source);
    let expr: Expr = Parser::new(&tokens)
        .parse_expression()
        .expect("valid expression");
    AstPrinter::print_rpn(&expr)
}

#[test]
fn prints_reverse_polish() {
    assert_eq!(print_rpn("(1 + 2) * (4 - 3)"), "1.0 2.0 + 4.0 3.0 - *");
    assert_eq!(print_rpn("-a / !b"), "a neg b ! /");
    assert_eq!(print_rpn("x = f(1, y).z"), "f 1.0 y call/2 .z x =");
}

#[test]
fn parse_expression_rejects_trailing_tokens() {
    let (tokens, _) = scan_all("1 + 2 3");
    let err = Parser::new(&tokens).parse_expression().unwrap_err();
    assert_eq!(
        err.to_string(),
        "[line 1] Error at '3': Expect end of expression."
    );
}

#[test]
fn for_loop_is_desugared_into_block_and_while() {
    let statements = parse("for (var i = 0; i < 3; i = i + 1) print i;").unwrap();
    assert_eq!(statements.len(), 1);

    let Stmt::Block(outer) = &statements[0] else {
        panic!("expected block, got {:?}", statements[0]);
    };
    assert!(matches!(outer[0], Stmt::Var { .. }));

    let Stmt::While { body, .. } = &outer[1] else {
        panic!("expected while, got {:?}", outer[1]);
    };
    let Stmt::Block(inner) = body.as_ref() else {
        panic!("expected block body, got {:?}", body);
    };
    assert!(matches!(inner[0], Stmt::Print(_)));
    assert!(matches!(inner[1], Stmt::Expression(Expr::Assign { .. })));
}

#[test]
fn bare_for_loop_has_true_condition() {
    let statements = parse("for (;;) print 1;").unwrap();
    let Stmt::While { condition, .. } = &statements[0] else {
        panic!("expected while, got {:?}", statements[0]);
    };
    assert_eq!(AstPrinter::print(condition), "true");
}

#[test]
fn class_declaration_with_superclass() {
    let statements = parse("class B < A { init(x) { this.x = x; } go() { super.go(); } }").unwrap();

    let Stmt::Class {
        name,
        superclass,
        methods,
    } = &statements[0]
    else {
        panic!("expected class, got {:?}", statements[0]);
    };

    assert_eq!(name.lexeme, "B");
    assert!(matches!(superclass, Some(Expr::Variable { name, .. }) if name.lexeme == "A"));
    assert_eq!(methods.len(), 2);
    assert_eq!(methods[0].params.len(), 1);
    assert_eq!(methods[1].name.lexeme, "go");
}

#[test]
fn reports_every_syntax_error_after_synchronizing() {
    let errors = parse("var = 1;\nprint 2;\nprint (3;\nvar ok = 4;").unwrap_err();

    assert_eq!(errors.len(), 2);
    assert_eq!(
        errors[0].to_string(),
        "[line 1] Error at '=': Expect variable name."
    );
    assert_eq!(
        errors[1].to_string(),
        "[line 3] Error at ';': Expect ')' after expression."
    );
    assert!(errors.iter().all(|e| e.exit_code() == 65));
}

#[test]
fn invalid_assignment_target_is_reported() {
    let errors = parse("1 + 2 = 3;").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors[0]
        .to_string()
        .contains("Error at '=': Invalid assignment target."));
}

#[test]
fn parse_expression_rejects_invalid_assignment_target() {
    let (tokens, _) = scan_all("1 = 2");
    let err = Parser::new(&tokens).parse_expression().unwrap_err();
    assert_eq!(
        err.to_string(),
        "[line 1] Error at '=': Invalid assignment target."
    );
}

#[test]
fn error_at_end_of_input() {
    let errors = parse("print 1").unwrap_err();
    assert_eq!(
        errors[0].to_string(),
        "[line 1] Error at end: Expect ';' after value."
    );
}

#[test]
fn too_many_arguments_is_reported() {
    let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
    let source = format!("f({});", args.join(", "));

    let errors = parse(&source).unwrap_err();
    assert!(errors
        .iter()
        .any(|e| e.to_string().contains("Can't have more than 255 arguments.")));
}
