use dymond::ast_printer::AstPrinter;
use dymond::parser::{Parser, MAX_ARGS};
use dymond::scanner::scan_tokens;
use pretty_assertions::assert_eq;

fn parse(source: &str, repl: bool) -> Result<Vec<String>, Vec<String>> {
    let (tokens, lex_errors) = scan_tokens(source);
    assert!(lex_errors.is_empty(), "lex errors in test source");

    Parser::new(tokens)
        .repl(repl)
        .parse()
        .map(|stmts| stmts.iter().map(AstPrinter::print_stmt).collect())
        .map_err(|errors| errors.iter().map(|e| e.message()).collect())
}

fn ast(source: &str) -> Vec<String> {
    parse(source, false).expect("source should parse")
}

fn errors(source: &str) -> Vec<String> {
    parse(source, false).expect_err("source should not parse")
}

#[test]
fn test_precedence() {
    assert_eq!(ast("1 + 2 * 3;"), vec!["(; (+ 1.0 (* 2.0 3.0)))"]);
    assert_eq!(ast("(1 + 2) * 3;"), vec!["(; (* (group (+ 1.0 2.0)) 3.0))"]);
    assert_eq!(ast("1 // 2 % 3;"), vec!["(; (% (// 1.0 2.0) 3.0))"]);
    assert_eq!(ast("a or b and c;"), vec!["(; (or a (and b c)))"]);
    assert_eq!(ast("1 < 2 == true;"), vec!["(; (== (< 1.0 2.0) true))"]);
    assert_eq!(ast("-a++;"), vec!["(; (- (post++ a)))"]);
    assert_eq!(ast("!!x;"), vec!["(; (! (! x)))"]);
}

#[test]
fn test_assignment_is_right_associative() {
    assert_eq!(ast("a = b = c;"), vec!["(; (= a (= b c)))"]);
    assert_eq!(ast("o.f = 1;"), vec!["(; (= (. o f) 1.0))"]);
}

#[test]
fn test_compound_assignment_and_updates() {
    assert_eq!(
        ast("a += 1; o.f -= 2; ++o.f; x--;"),
        vec![
            "(; (+= a 1.0))",
            "(; (-= (. o f) 2.0))",
            "(; (pre++ (. o f)))",
            "(; (post-- x))",
        ]
    );
}

#[test]
fn test_ternary_chains_to_the_right() {
    assert_eq!(
        ast("x ? 1 : y ? 2 : 3;"),
        vec!["(; (?: x 1.0 (?: y 2.0 3.0)))"]
    );
}

#[test]
fn test_comma_is_lowest() {
    assert_eq!(ast("a, b = 1, c;"), vec!["(; (, a (= b 1.0) c))"]);
    // Call arguments are assignments, not comma expressions.
    assert_eq!(ast("f(a, b);"), vec!["(; (call f a b))"]);
}

#[test]
fn test_literals_and_aliases() {
    assert_eq!(
        ast("\"hi\"; 2.5; True; Null; false;"),
        vec!["(; hi)", "(; 2.5)", "(; true)", "(; nil)", "(; false)"]
    );
}

#[test]
fn test_for_desugars_into_block_and_loop() {
    assert_eq!(
        ast("for (var i = 0; i < 3; i = i + 1) print(i);"),
        vec!["(block (var i 0.0) (for (< i 3.0) (= i (+ i 1.0)) (; (call print i))))"]
    );
    assert_eq!(
        ast("for (;;) break;"),
        vec!["(for true nil (break))"]
    );
}

#[test]
fn test_statements() {
    assert_eq!(
        ast("var a; if (a) { next; } else return; while (a) a = nil;"),
        vec![
            "(var a)",
            "(if a (block (next)) (return))",
            "(while a (; (= a nil)))",
        ]
    );
}

#[test]
fn test_function_with_defaults() {
    assert_eq!(
        ast("func f(a, b = a * 2) { return a + b; }"),
        vec!["(func f (a (= b (* a 2.0))) (return (+ a b)))"]
    );
}

#[test]
fn test_class_declaration() {
    let source = "class B < A {
        init(x, y = 2) { this.x = x; }
        static make() { return B(1); }
        greet() { return super.greet(); }
    }";

    assert_eq!(
        ast(source),
        vec![
            "(class B (< A) \
             (method init (x (= y 2.0)) (; (= (. this x) x))) \
             (method greet () (return (call (super greet)))) \
             (static make () (return (call B 1.0))))"
        ]
    );

    // `<-` is accepted for the superclass clause too.
    assert_eq!(ast("class C <- A {}"), vec!["(class C (< A))"]);
}

#[test]
fn test_invalid_targets_are_reported_without_unwinding() {
    assert_eq!(errors("1 = 2;"), vec!["Invalid assignment target."]);
    assert_eq!(errors("3++;"), vec!["Invalid ++ target."]);
    assert_eq!(errors("f() += 1;"), vec!["Invalid assignment target."]);
}

#[test]
fn test_panic_mode_recovery_reports_each_broken_statement() {
    let source = "var = 1;\nvar b = ;\nvar c = 3;\nprint(c)";

    assert_eq!(
        errors(source),
        vec![
            "Expected variable name.",
            "Expected expression.",
            "Expected ';' after expression.",
        ]
    );
}

#[test]
fn test_error_location() {
    let (tokens, _) = scan_tokens("\n\nvar 1;");
    let errs = Parser::new(tokens).parse().expect_err("should fail");

    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].to_string(), "[line 3] Error: Expected variable name.");
}

#[test]
fn test_repl_mode_relaxes_terminator() {
    assert_eq!(parse("print(1)", true), Ok(vec!["(; (call print 1.0))".to_string()]));
    assert_eq!(parse("var a = 2", true), Ok(vec!["(var a 2.0)".to_string()]));
    assert_eq!(
        parse("print(1)", false),
        Err(vec!["Expected ';' after expression.".to_string()])
    );
}

#[test]
fn test_argument_cap() {
    let args: Vec<&str> = vec!["0"; MAX_ARGS + 3];
    let source = format!("f({});", args.join(", "));

    assert_eq!(errors(&source), vec!["Can't have more than 32 arguments."]);

    let args: Vec<&str> = vec!["0"; MAX_ARGS];
    assert!(parse(&format!("f({});", args.join(", ")), false).is_ok());
}

#[test]
fn test_parameter_cap() {
    let params: Vec<String> = (0..MAX_ARGS + 3).map(|i| format!("p{}", i)).collect();
    let source = format!("func f({}) {{}}", params.join(", "));

    assert_eq!(errors(&source), vec!["Can't have more than 32 parameters."]);
}
