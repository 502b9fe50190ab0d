use rox::error::LoxError;
use rox::{Session, Value};

/// Run `source` as one unit and return everything it printed.
fn run(source: &str) -> String {
    let mut session = Session::with_output(Vec::new());
    if let Err(errors) = session.run(source) {
        panic!("unexpected errors: {:?}", errors);
    }
    String::from_utf8(session.into_output()).unwrap()
}

/// Run `source` expecting a failure; return the printed output and errors.
fn run_err(source: &str) -> (String, Vec<LoxError>) {
    let mut session = Session::with_output(Vec::new());
    let errors = session.run(source).expect_err("expected an error");
    (String::from_utf8(session.into_output()).unwrap(), errors)
}

fn runtime_message(source: &str) -> String {
    let (_, errors) = run_err(source);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].exit_code(), 70);
    errors[0].to_string()
}

#[test]
fn arithmetic_and_number_formatting() {
    assert_eq!(
        run("print 1 + 2; print 7 / 2; print -3 * 2; print 10 - 0.5;"),
        "3\n3.5\n-6\n9.5\n"
    );
}

#[test]
fn overflowing_arithmetic_prints_infinity() {
    let source = "
        var n = 1;
        for (var i = 0; i < 400; i = i + 1) n = n * 10;
        print n;
        print -n;";
    assert_eq!(run(source), "Infinity\n-Infinity\n");
}

#[test]
fn string_concatenation() {
    assert_eq!(run("print \"foo\" + \"bar\";"), "foobar\n");
}

#[test]
fn only_nil_and_false_are_falsey() {
    assert_eq!(
        run("print !nil; print !false; print !0; print !\"\"; print !true;"),
        "true\ntrue\nfalse\nfalse\nfalse\n"
    );
}

#[test]
fn equality_never_coerces() {
    assert_eq!(
        run("print 1 == 1; print 1 == \"1\"; print nil == nil; print nil == false; print \"a\" != \"a\";"),
        "true\nfalse\ntrue\nfalse\nfalse\n"
    );
}

#[test]
fn logical_operators_yield_operand_values() {
    assert_eq!(
        run("print nil or \"yes\"; print 0 and 1; print false and undefined; print \"hi\" or undefined;"),
        "yes\n1\nfalse\nhi\n"
    );
}

#[test]
fn block_scoping_and_shadowing() {
    let source = "
        var a = \"global\";
        {
            var a = \"inner\";
            print a;
        }
        print a;";
    assert_eq!(run(source), "inner\nglobal\n");
}

#[test]
fn closures_bind_lexically_not_dynamically() {
    let source = "
        var a = \"global\";
        {
            fun showA() { print a; }
            showA();
            var a = \"block\";
            showA();
        }";
    assert_eq!(run(source), "global\nglobal\n");
}

#[test]
fn counter_closure_keeps_its_own_state() {
    let source = "
        fun makeCounter() {
            var i = 0;
            fun count() {
                i = i + 1;
                print i;
            }
            return count;
        }
        var counter = makeCounter();
        counter();
        counter();";
    assert_eq!(run(source), "1\n2\n");
}

#[test]
fn recursion_and_control_flow() {
    let source = "
        fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
        for (var i = 0; i < 8; i = i + 1) print fib(i);
        var n = 0;
        while (n < 3) n = n + 1;
        print n;";
    assert_eq!(run(source), "0\n1\n1\n2\n3\n5\n8\n13\n3\n");
}

#[test]
fn return_unwinds_out_of_loops() {
    let source = "
        fun first() {
            while (true) {
                for (var i = 0; ; i = i + 1) {
                    if (i == 2) return i;
                }
            }
        }
        print first();";
    assert_eq!(run(source), "2\n");
}

#[test]
fn function_without_return_yields_nil() {
    assert_eq!(run("fun f() {} print f();"), "nil\n");
}

#[test]
fn callables_display() {
    assert_eq!(
        run("fun f() {} class C {} print f; print C; print C(); print clock;"),
        "<fn f>\nC\nC instance\n<native fn>\n"
    );
}

#[test]
fn clock_returns_a_number() {
    assert_eq!(run("print clock() > 0;"), "true\n");
}

#[test]
fn fields_and_methods() {
    let source = "
        class Box {
            describe() { return \"holds \" + this.item; }
        }
        var b = Box();
        b.item = \"cake\";
        print b.describe();
        var m = b.describe;
        b.item = \"pie\";
        print m();";
    assert_eq!(run(source), "holds cake\nholds pie\n");
}

#[test]
fn fields_shadow_methods() {
    let source = "
        class A { m() { return \"method\"; } }
        var a = A();
        a.m = \"field\";
        print a.m;";
    assert_eq!(run(source), "field\n");
}

#[test]
fn calling_init_directly_reruns_it_and_returns_this() {
    let source = "
        class Foo {
            init() { print \"made\"; }
        }
        var foo = Foo();
        print foo.init() == foo;";
    assert_eq!(run(source), "made\nmade\ntrue\n");
}

#[test]
fn early_return_from_initializer_still_yields_instance() {
    let source = "
        class P {
            init(x) {
                this.x = x;
                if (x > 0) return;
                this.x = 0;
            }
        }
        print P(5).x;
        print P(-1).x;";
    assert_eq!(run(source), "5\n0\n");
}

#[test]
fn super_calls_skip_the_override() {
    let source = "
        class Doughnut {
            cook() { print \"Fry until golden.\"; }
        }
        class BostonCream < Doughnut {
            cook() {
                super.cook();
                print \"Pipe full of custard.\";
            }
        }
        BostonCream().cook();";
    assert_eq!(run(source), "Fry until golden.\nPipe full of custard.\n");
}

#[test]
fn inherited_methods_and_initializers() {
    let source = "
        class A {
            init(name) { this.name = name; }
            hello() { return \"hi \" + this.name; }
        }
        class B < A {}
        print B(\"bo\").hello();";
    assert_eq!(run(source), "hi bo\n");
}

#[test]
fn super_resolves_from_the_defining_class() {
    let source = "
        class A { method() { print \"A\"; } }
        class B < A {
            method() { print \"B\"; }
            test() { super.method(); }
        }
        class C < B {}
        C().test();";
    assert_eq!(run(source), "A\n");
}

#[test]
fn class_may_refer_to_itself_in_methods() {
    let source = "
        class Node {
            make() { return Node(); }
        }
        print Node().make();";
    assert_eq!(run(source), "Node instance\n");
}

#[test]
fn objects_compare_by_identity() {
    let source = "
        class A {}
        var a = A();
        var b = a;
        print a == b;
        print A() == A();
        fun f() {}
        print f == f;";
    assert_eq!(run(source), "true\nfalse\ntrue\n");
}

#[test]
fn arity_mismatch_is_a_runtime_error() {
    assert_eq!(
        runtime_message("fun f(a) {} f();"),
        "Expected 1 arguments but got 0.\n[line 1]"
    );
    assert_eq!(
        runtime_message("class Foo { init() {} }\nFoo(1);"),
        "Expected 0 arguments but got 1.\n[line 2]"
    );
}

#[test]
fn calling_a_non_callable_is_a_runtime_error() {
    assert_eq!(
        runtime_message("\"not a function\"();"),
        "Can only call functions and classes.\n[line 1]"
    );
}

#[test]
fn property_access_on_non_instance_is_a_runtime_error() {
    assert!(runtime_message("var x = 1; print x.y;").contains("Only instances have properties."));
    assert!(runtime_message("var x = 1; x.y = 2;").contains("Only instances have fields."));
}

#[test]
fn undefined_property_is_a_runtime_error() {
    assert_eq!(
        runtime_message("class A {} A().missing;"),
        "Undefined property 'missing'.\n[line 1]"
    );
}

#[test]
fn undefined_variable_is_a_runtime_error() {
    assert_eq!(
        runtime_message("print nope;"),
        "Undefined variable 'nope'.\n[line 1]"
    );
    assert!(runtime_message("nope = 1;").contains("Undefined variable 'nope'."));
}

#[test]
fn operand_type_errors() {
    assert!(runtime_message("print 1 + \"a\";").contains("Operands of '+' must be two numbers or two strings"));
    assert!(runtime_message("print \"a\" < 1;").contains("Operands of '<' must be numbers"));
    assert!(runtime_message("print -\"a\";").contains("Operand of '-' must be a number"));
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    assert_eq!(runtime_message("print 1 / 0;"), "Division by zero.\n[line 1]");
}

#[test]
fn superclass_must_be_a_class() {
    assert!(runtime_message("var NotAClass = \"so not\";\nclass Sub < NotAClass {}")
        .contains("Superclass must be a class."));
}

#[test]
fn runtime_error_halts_the_unit() {
    let (output, errors) = run_err("print \"before\";\nprint nil + 1;\nprint \"after\";");
    assert_eq!(output, "before\n");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line(), Some(2));
}

#[test]
fn static_errors_prevent_execution() {
    let (output, errors) = run_err("print \"never\";\n{ var a = a; }");
    assert!(output.is_empty());
    assert!(errors.iter().all(LoxError::is_static));
}

#[test]
fn globals_persist_across_units() {
    let mut session = Session::with_output(Vec::new());
    session
        .run("fun makeAdder(n) { fun add(x) { return x + n; } return add; }")
        .unwrap();
    session.run("var add2 = makeAdder(2);").unwrap();
    session.run("print add2(40);").unwrap();

    assert_eq!(String::from_utf8(session.into_output()).unwrap(), "42\n");
}

#[test]
fn repl_mode_echoes_expression_statements() {
    let mut session = Session::with_output(Vec::new());
    session.set_repl_mode(true);
    session.run("var x = 2;").unwrap();
    session.run("x * 21;").unwrap();
    session.run("print \"shown once\";").unwrap();

    assert_eq!(
        String::from_utf8(session.into_output()).unwrap(),
        "42\nshown once\n"
    );
}

#[test]
fn evaluate_single_expression() {
    let mut session = Session::with_output(Vec::new());
    assert_eq!(
        session.evaluate_expression("(1 + 2) * 3").unwrap(),
        Value::Number(9.0)
    );
    assert_eq!(
        session.evaluate_expression("\"a\" + \"b\"").unwrap(),
        Value::from("ab")
    );
    assert!(session.evaluate_expression("1 +").is_err());

    let errors = session.evaluate_expression("1 = 2").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("Invalid assignment target."));
}
