mod common;

use common::{output_of, run};
use dymond::error::DymondError;
use dymond::runner::RunStatus;
use pretty_assertions::assert_eq;

fn compile_errors(source: &str) -> Vec<String> {
    let outcome = run(source);
    assert_eq!(outcome.status, RunStatus::CompileError);
    assert_eq!(outcome.output, "", "nothing may run after a compile error");
    outcome.errors
}

#[test]
fn test_return_outside_function() {
    assert_eq!(compile_errors("return 1;"), vec!["Cannot return from top-level code."]);
}

#[test]
fn test_return_value_from_initializer() {
    assert_eq!(
        compile_errors("class A { init() { return 1; } }"),
        vec!["Cannot return a value from an initializer."]
    );

    // A bare return is allowed.
    assert_eq!(output_of("class A { init() { return; } } print(A());"), "A instance\n");
}

#[test]
fn test_this_and_super_placement() {
    assert_eq!(
        compile_errors("print(this);"),
        vec!["Cannot use 'this' outside of a class."]
    );
    assert_eq!(
        compile_errors("func f() { return super.x; }"),
        vec!["Cannot use 'super' outside of a class."]
    );
    assert_eq!(
        compile_errors("class A { m() { return super.m(); } }"),
        vec!["Cannot use 'super' in a class with no superclass."]
    );
}

#[test]
fn test_local_redeclaration() {
    assert_eq!(
        compile_errors("{ var a = 1; var a = 2; }"),
        vec!["Variable with this name already declared in this scope."]
    );
    assert_eq!(
        compile_errors("func f(a, a) {}"),
        vec!["Variable with this name already declared in this scope."]
    );
}

#[test]
fn test_globals_may_be_redeclared() {
    assert_eq!(output_of("var a = 1; var a = 2; print(a);"), "2\n");
}

#[test]
fn test_self_inheritance_reports_once() {
    assert_eq!(
        compile_errors("class A < A {}"),
        vec!["A class can't inherit from itself."]
    );
    assert_eq!(
        compile_errors("{ class A < A {} }"),
        vec!["A class can't inherit from itself."]
    );
}

#[test]
fn test_own_initializer() {
    assert_eq!(
        compile_errors("{ var a = a; }"),
        vec!["Cannot read local variable in its own initializer."]
    );
}

#[test]
fn test_initializer_may_read_shadowed_global() {
    assert_eq!(output_of("var a = 1; { var a = a + 1; print(a); } print(a);"), "2\n1\n");
}

#[test]
fn test_errors_accumulate_with_lines() {
    let mut errors: Vec<DymondError> = Vec::new();
    let (mut runner, _) = common::runner_with_input("");

    let status = runner.run("return 1;\nprint(this);\n{ var b; var b; }", &mut errors);

    assert_eq!(status, RunStatus::CompileError);
    assert_eq!(
        errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
        vec![
            "[line 1] Error: Cannot return from top-level code.",
            "[line 2] Error: Cannot use 'this' outside of a class.",
            "[line 3] Error: Variable with this name already declared in this scope.",
        ]
    );
}

#[test]
fn test_nothing_runs_when_resolution_fails() {
    assert_eq!(
        compile_errors("print(\"before\");\nreturn;"),
        vec!["Cannot return from top-level code."]
    );
}

#[test]
fn test_functions_may_call_later_globals() {
    assert_eq!(
        output_of("func f() { return g(); } func g() { return 1; } print(f());"),
        "1\n"
    );
}

#[test]
fn test_closures_bind_lexically() {
    let source = r#"
        var a = "global";
        {
            func show() { print(a); }
            show();
            var a = "block";
            show();
        }
    "#;

    assert_eq!(output_of(source), "global\nglobal\n");
}

#[test]
fn test_local_recursion() {
    let source = r#"
        {
            func fact(n) {
                if (n <= 1) return 1;
                return n * fact(n - 1);
            }
            print(fact(5));
        }
    "#;

    assert_eq!(output_of(source), "120\n");
}

#[test]
fn test_default_sees_earlier_parameters() {
    assert_eq!(output_of("func f(a, b = a) { return b; } print(f(7));"), "7\n");
}
