mod common;

use common::{output_of, run, run_with_input, runner_with_input};
use dymond::error::DymondError;
use dymond::runner::{RunStatus, Runner};
use pretty_assertions::assert_eq;

fn runtime_errors(source: &str) -> (String, Vec<String>) {
    let outcome = run(source);
    assert_eq!(outcome.status, RunStatus::RuntimeError);
    (outcome.output, outcome.errors)
}

// ───── Programs ─────

#[test]
fn test_block_shadowing_program() {
    assert_eq!(
        output_of("var a = 1; { var a = a + 1; print(a); } print(a);"),
        "2\n1\n"
    );
}

#[test]
fn test_super_dispatch_program() {
    let source = r#"
        class Animal { speak() { return "..."; } }
        class Dog < Animal { speak() { return super.speak() + "woof"; } }
        print(Dog().speak());
    "#;

    assert_eq!(output_of(source), "...woof\n");
}

#[test]
fn test_recursion() {
    let source = r#"
        func fib(n) {
            if (n < 2) return n;
            return fib(n - 1) + fib(n - 2);
        }
        print(fib(15));
    "#;

    assert_eq!(output_of(source), "610\n");
}

// ───── Arithmetic and values ─────

#[test]
fn test_number_formatting() {
    assert_eq!(
        output_of("print(3.0); print(1.5); print(10 / 4); print(5.5 % 2); print(-(2));"),
        "3\n1.5\n2.5\n1.5\n-2\n"
    );
}

#[test]
fn test_integer_division_truncates() {
    assert_eq!(
        output_of("print(7 // 2); print(-7 // 2); print(7.9 // 2.9);"),
        "3\n-3\n3\n"
    );
}

#[test]
fn test_division_by_zero() {
    for source in ["print(1 / 0);", "print(1 // 0);", "print(1 // 0.5);"] {
        let (output, errors) = runtime_errors(source);
        assert_eq!(output, "");
        assert_eq!(errors, vec!["Division by zero error."], "for {}", source);
    }
}

#[test]
fn test_plus_concatenates_in_operand_order() {
    // A number on the left is stringified in place, so `1 + "x"` is "1x"
    // rather than the "x1" a left-to-right string coercion would give.
    assert_eq!(
        output_of(r#"print("x" + 1); print(1 + "x"); print("a" + 2.5); print("a" + "b");"#),
        "x1\n1x\na2.5\nab\n"
    );

    let (_, errors) = runtime_errors("print(nil + 1);");
    assert_eq!(errors, vec!["Operands must be two numbers or two strings."]);
}

#[test]
fn test_arithmetic_type_errors() {
    assert_eq!(runtime_errors(r#"print("a" - 1);"#).1, vec!["Operands must be numbers."]);
    assert_eq!(runtime_errors(r#"print(-"a");"#).1, vec!["Operand must be a number."]);
    assert_eq!(
        runtime_errors(r#"print(1 < "a");"#).1,
        vec!["Operands must be two numbers or two strings."]
    );
}

#[test]
fn test_string_comparison_ignores_case() {
    assert_eq!(
        output_of(r#"print("apple" < "Banana"); print("B" >= "b"); print("b" > "A");"#),
        "true\ntrue\ntrue\n"
    );
}

#[test]
fn test_equality_and_truthiness() {
    assert_eq!(
        output_of(r#"print(nil == nil); print(nil == false); print(1 == 1); print("a" != "a");"#),
        "true\nfalse\ntrue\nfalse\n"
    );
    assert_eq!(
        output_of(r#"if (0) print("zero"); if ("") print("empty"); if (nil) print("nil"); else print("falsy");"#),
        "zero\nempty\nfalsy\n"
    );
}

#[test]
fn test_logical_operators_short_circuit() {
    assert_eq!(
        output_of(r#"print(nil or "x"); print(false and missing()); print(1 and 2);"#),
        "x\nfalse\n2\n"
    );
}

#[test]
fn test_ternary_evaluates_both_branches() {
    let source = r#"
        var trail = "";
        func a() { trail = trail + "a"; return 1; }
        func b() { trail = trail + "b"; return 2; }
        func c() { trail = trail + "c"; return true; }
        print(c() ? a() : b());
        print(trail);
        trail = "";
        print(nil ? a() : b());
        print(trail);
    "#;

    // Else branch, then branch, condition.
    assert_eq!(output_of(source), "1\nbac\n2\nba\n");
}

#[test]
fn test_comma_yields_last() {
    assert_eq!(output_of("var x = (1, 2, 3); print(x);"), "3\n");
}

// ───── Variables ─────

#[test]
fn test_compound_assignment() {
    assert_eq!(
        output_of("var a = 10; a += 5; a -= 3; a *= 2; a /= 4; a %= 4; print(a);"),
        "2\n"
    );
    assert_eq!(output_of(r#"var s = "ab"; s += 1; print(s);"#), "ab1\n");
}

#[test]
fn test_compound_assignment_requires_binding() {
    assert_eq!(runtime_errors("q += 1;").1, vec!["Undefined variable 'q'."]);
}

#[test]
fn test_plain_assignment_defines_global() {
    assert_eq!(output_of("z = 3; print(z);"), "3\n");
}

#[test]
fn test_increment_and_decrement() {
    assert_eq!(
        output_of("var i = 1; print(i++); print(i); print(++i); print(--i); print(i--); print(i);"),
        "1\n2\n3\n2\n2\n1\n"
    );
    assert_eq!(
        runtime_errors(r#"var s = "a"; s++;"#).1,
        vec!["Operand must be a number."]
    );
}

#[test]
fn test_property_updates() {
    let source = r#"
        class P {}
        var p = P();
        p.n = 1;
        p.n++;
        ++p.n;
        print(p.n);
        p.n += 10;
        print(p.n);
    "#;

    assert_eq!(output_of(source), "3\n13\n");
}

// ───── Control flow ─────

#[test]
fn test_break_leaves_while() {
    let source = r#"
        var i = 0;
        while (true) {
            i = i + 1;
            if (i == 3) break;
            print(i);
        }
        print("done");
    "#;

    assert_eq!(output_of(source), "1\n2\ndone\n");
}

#[test]
fn test_next_in_for_still_runs_increment() {
    assert_eq!(
        output_of("for (var i = 0; i < 5; i = i + 1) { if (i % 2 == 0) next; print(i); }"),
        "1\n3\n"
    );
}

#[test]
fn test_next_in_while() {
    assert_eq!(
        output_of("var j = 0; while (j < 4) { j = j + 1; if (j == 2) next; print(j); }"),
        "1\n3\n4\n"
    );
}

#[test]
fn test_conditionless_for_with_break() {
    assert_eq!(
        output_of(r#"var x = true; for (;true;) { if (x) break; } print("out");"#),
        "out\n"
    );
    assert_eq!(
        output_of("var n = 0; for (;;) { n = n + 1; if (n == 3) break; } print(n);"),
        "3\n"
    );
}

#[test]
fn test_break_outside_loop_is_runtime_error() {
    let (output, errors) = runtime_errors(r#"break; print("after");"#);

    assert_eq!(errors, vec!["Cannot use 'break' outside of a loop."]);
    assert_eq!(output, "after\n");

    let (_, errors) = runtime_errors("func f() { next; } while (true) { f(); }");
    assert_eq!(errors, vec!["Cannot use 'next' outside of a loop."]);
}

#[test]
fn test_runtime_error_aborts_one_statement() {
    let (output, errors) = runtime_errors(r#"print("a"); print(nope); print("c");"#);

    assert_eq!(output, "a\nc\n");
    assert_eq!(errors, vec!["Undefined variable 'nope'."]);
}

#[test]
fn test_runtime_error_location() {
    let mut errors: Vec<DymondError> = Vec::new();
    let (mut runner, _) = runner_with_input("");

    runner.run("\n\nprint(1 / 0);", &mut errors);

    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "[line 3] Runtime error: Division by zero error."
    );
}

// ───── Functions and closures ─────

#[test]
fn test_closures_capture_variables_not_values() {
    let source = r#"
        func outer() {
            var x = 1;
            func get() { return x; }
            x = 2;
            return get;
        }
        print(outer()());
    "#;

    assert_eq!(output_of(source), "2\n");
}

#[test]
fn test_closure_created_in_loop_body() {
    let source = r#"
        var saved;
        for (var i = 0; i < 1; i = i + 1) {
            var c = 10;
            func show() { print(c); }
            c = c + 1;
            saved = show;
        }
        saved();
    "#;

    assert_eq!(output_of(source), "11\n");
}

#[test]
fn test_counter_keeps_state() {
    let source = r#"
        func makeCounter() {
            var count = 0;
            func inc() { count = count + 1; return count; }
            return inc;
        }
        var c = makeCounter();
        c();
        print(c());
        var d = makeCounter();
        print(d());
    "#;

    assert_eq!(output_of(source), "2\n1\n");
}

#[test]
fn test_default_parameters() {
    assert_eq!(
        output_of("func f(a, b = a * 2) { return a + b; } print(f(1)); print(f(1, 5));"),
        "3\n6\n"
    );
}

#[test]
fn test_arity_errors() {
    assert_eq!(
        runtime_errors("func f(a, b = 1) {} f();").1,
        vec!["Expected between 1 and 2 arguments but got 0."]
    );
    assert_eq!(
        runtime_errors("func g(a) {} g(1, 2);").1,
        vec!["Expected 1 arguments but got 2."]
    );
    assert_eq!(
        runtime_errors("clock(1);").1,
        vec!["Expected 0 arguments but got 1."]
    );
}

#[test]
fn test_callable_display_and_return() {
    assert_eq!(
        output_of("func f() { return; } print(f); print(clock); print(f());"),
        "<fn f>\n<native fn>\nnil\n"
    );
    assert_eq!(
        runtime_errors(r#""str"();"#).1,
        vec!["Can only call functions and classes."]
    );
}

// ───── Classes ─────

#[test]
fn test_instances_and_initializer() {
    let source = r#"
        class Point {
            init(x, y) { this.x = x; this.y = y; }
            sum() { return this.x + this.y; }
        }
        var p = Point(1, 2);
        print(p.sum());
        print(p);
        print(Point);
    "#;

    assert_eq!(output_of(source), "3\nPoint instance\nPoint\n");
}

#[test]
fn test_initializer_always_returns_instance() {
    let source = r#"
        class A { init() { this.v = 1; return; this.v = 2; } }
        var a = A();
        print(a.v);
        print(a.init() == a);
    "#;

    assert_eq!(output_of(source), "1\ntrue\n");
}

#[test]
fn test_fields_shadow_methods() {
    assert_eq!(
        output_of(r#"class A { m() { return 1; } } var a = A(); a.m = "field"; print(a.m);"#),
        "field\n"
    );
}

#[test]
fn test_method_lookup_errors() {
    assert_eq!(
        runtime_errors("class A {} A().foo();").1,
        vec!["Undefined method 'foo'."]
    );
    assert_eq!(
        runtime_errors("class M { static make() { return 1; } } M().make();").1,
        vec!["Cannot call static method 'make' non-statically. You must call it from the class itself."]
    );
    assert_eq!(
        runtime_errors("class M { go() {} } M.go();").1,
        vec!["Cannot call non-static method 'go' statically. You must create an instance and call it from the instance."]
    );
    assert_eq!(
        runtime_errors("var n = 1; print(n.x);").1,
        vec!["Only instances have properties."]
    );
    assert_eq!(
        runtime_errors("var n = 1; n.x = 2;").1,
        vec!["Only instances have fields."]
    );
}

#[test]
fn test_superclass_must_be_class() {
    assert_eq!(
        runtime_errors("var NotClass = 1; class X < NotClass {}").1,
        vec!["Superclass must be a class."]
    );
}

#[test]
fn test_static_methods_bind_class() {
    let source = r#"
        class C {
            static create() { return this(); }
            hi() { return "hi"; }
        }
        print(C.create().hi());
    "#;

    assert_eq!(output_of(source), "hi\n");
}

#[test]
fn test_static_fields() {
    let source = r#"
        class Counter {
            static bump() { this.count = this.count + 1; return this.count; }
        }
        Counter.count = 0;
        Counter.bump();
        print(Counter.bump());
    "#;

    assert_eq!(output_of(source), "2\n");
}

#[test]
fn test_static_super() {
    let source = r#"
        class Base { static id() { return "base"; } }
        class Derived < Base { static id() { return "derived+" + super.id(); } }
        print(Derived.id());
    "#;

    assert_eq!(output_of(source), "derived+base\n");
}

#[test]
fn test_super_binds_current_instance() {
    let source = r#"
        class A {
            name() { return "A"; }
            describe() { return "I am " + this.name(); }
        }
        class B < A {
            name() { return "B"; }
            describe() { return super.describe() + "!"; }
        }
        print(B().describe());
    "#;

    assert_eq!(output_of(source), "I am B!\n");
}

#[test]
fn test_super_is_lexical() {
    let source = r#"
        class A { m() { return "A.m"; } }
        class B < A { m() { return "B.m"; } test() { return super.m(); } }
        class C < B {}
        print(C().test());
    "#;

    assert_eq!(output_of(source), "A.m\n");
}

// ───── Built-ins ─────

#[test]
fn test_typeof() {
    let source = r#"
        class A {}
        print(typeof(1));
        print(typeof("s"));
        print(typeof(nil));
        print(typeof(true));
        print(typeof(print));
        print(typeof(A));
        print(typeof(A()));
    "#;

    assert_eq!(
        output_of(source),
        "number\nstring\nnil\nboolean\nfunction\nclass\nA\n"
    );
}

#[test]
fn test_string_conversions() {
    assert_eq!(
        output_of(r#"print(len("héllo")); print(len(5)); print(toNumber("3.5") + 1); print(toString(3) + "!");"#),
        "5\n0\n4.5\n3!\n"
    );
    assert_eq!(
        output_of(r#"print(isNumber("42")); print(isNumber("4x")); print(isNumber(4));"#),
        "true\nfalse\nfalse\n"
    );
    assert_eq!(
        runtime_errors(r#"toNumber("abc");"#).1,
        vec!["Cannot convert 'abc' to a number."]
    );
    assert_eq!(
        runtime_errors(r#"toString("x");"#).1,
        vec!["The argument passed to toString must be a number."]
    );
}

#[test]
fn test_math_builtins() {
    assert_eq!(output_of("print(sqrt(16)); print(clock() > 0);"), "4\ntrue\n");
    assert_eq!(
        runtime_errors("sqrt(-1);").1,
        vec!["Cannot take the square root of a negative number."]
    );
}

#[test]
fn test_random_int_is_inclusive() {
    assert_eq!(
        output_of("print(randomInt(1, 1)); var r = randomInt(1, 6); print(r >= 1 and r <= 6);"),
        "1\ntrue\n"
    );
    assert_eq!(
        runtime_errors("randomInt(5, 1);").1,
        vec!["The range passed to randomInt is empty."]
    );
}

#[test]
fn test_print_line_ending() {
    assert_eq!(output_of(r#"print("a", ""); print("b", "-"); print("c");"#), "ab-c\n");
}

#[test]
fn test_input_reads_lines() {
    let outcome = run_with_input(
        r#"var name = input("Name: "); print("Hi " + name); print(input());"#,
        "Ada\n",
    );

    assert_eq!(outcome.status, RunStatus::Ok);
    assert_eq!(outcome.output, "Name: Hi Ada\nnil\n");
}

// ───── Sessions ─────

fn run_line(runner: &mut Runner, line: &str) -> RunStatus {
    let mut errors: Vec<DymondError> = Vec::new();
    runner.run(line, &mut errors)
}

#[test]
fn test_repl_echoes_expression_values() {
    let (runner, out) = runner_with_input("");
    let mut runner = runner.repl(true);

    assert_eq!(run_line(&mut runner, "1 + 2"), RunStatus::Ok);
    assert_eq!(run_line(&mut runner, "var a = 5"), RunStatus::Ok);
    assert_eq!(run_line(&mut runner, "a * 2;"), RunStatus::Ok);
    assert_eq!(run_line(&mut runner, "nil"), RunStatus::Ok);
    assert_eq!(run_line(&mut runner, "print(\"hi\")"), RunStatus::Ok);

    assert_eq!(out.contents(), "3\n10\nhi\n");
}

#[test]
fn test_globals_persist_across_runs() {
    let (mut runner, out) = runner_with_input("");

    assert_eq!(run_line(&mut runner, "func twice(x) { return x * 2; } var n = 4;"), RunStatus::Ok);
    assert_eq!(run_line(&mut runner, "print(twice(n));"), RunStatus::Ok);
    assert_eq!(run_line(&mut runner, "print(missing);"), RunStatus::RuntimeError);
    assert_eq!(run_line(&mut runner, "n += 1; print(n);"), RunStatus::Ok);

    assert_eq!(out.contents(), "8\n5\n");
}
