use std::fs;

use pseudoc::{compile, parse_program, to_pseudocode, ErrorKind, SourceLocation, TextEmitter, ThreeAddressEmitter};
use walkdir::WalkDir;

fn assert_text(src: &str, expected: &str) {
    match to_pseudocode(src) {
        Ok(code) => assert_eq!(code, expected, "source:\n{}", src),
        Err(e) => panic!("program failed to compile:\n{}\nError: {}", src, e),
    }
}

fn three_address(src: &str) -> String {
    let mut out = ThreeAddressEmitter::new();
    compile(src, &mut out).unwrap_or_else(|e| panic!("program failed to compile: {e}"));
    out.into_code()
}

#[test]
fn demo_programs_compile_through_both_backends() {
    let mut count = 0;

    for entry in WalkDir::new("demos")
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "pc"))
    {
        let path = entry.path();
        let src = fs::read_to_string(path).unwrap_or_else(|e| panic!("Failed to read {path:?}: {e}"));
        count += 1;

        let program = parse_program(&src).unwrap_or_else(|e| panic!("{path:?} failed: {e}"));

        let mut first = TextEmitter::new();
        program.emit(&mut first);
        let mut second = TextEmitter::new();
        program.emit(&mut second);
        assert!(!first.code().is_empty(), "{path:?} emitted nothing");
        assert_eq!(first.code(), second.code(), "{path:?} re-emission differs");

        let mut tac = ThreeAddressEmitter::new();
        program.emit(&mut tac);
        assert!(!tac.code().is_empty(), "{path:?} emitted no three-address code");
    }

    assert!(count > 0, "No demo programs found in demos/");
}

#[test]
fn loops_and_assignments() {
    assert_text(
        "{
            int i; int[10] a; int sum;
            i = 0; sum = 0;
            while (i < 10) {
                sum = sum + a[i];
                i = i + 1;
            }
        }",
        "i = 0;\nsum = 0;\nwhile (i < 10) {\n    sum = sum + a[i];\n    i = i + 1;\n}\n",
    );
}

#[test]
fn chained_assignment_stores_inner_first() {
    assert_text("{ int a; int b; a = b = 3; }", "b = 3;\na = b;\n");
}

#[test]
fn initializers_emit_assignments() {
    assert_text("{ int x = 4; float y = x * 2.5; }", "x = 4;\ny = x * 2.5;\n");
}

#[test]
fn grouping_survives_emission() {
    assert_text("{ int x; x = (x + 1) * 2; }", "x = (x + 1) * 2;\n");
    assert_text("{ int x; x = x + 1 * 2; }", "x = x + 1 * 2;\n");
}

#[test]
fn element_store_keeps_its_index() {
    assert_text("{ int[4] a; int i; a[i + 1] = a[i]; }", "a[i + 1] = a[i];\n");
    assert_eq!(
        three_address("{ int[4] a; int i; a[i + 1] = a[i]; }"),
        "\tt1 = i + 1\n\tt2 = i * 4\n\tt3 = a [ t2 ]\n\tt4 = t1 * 4\n\ta [ t4 ] = t3\n"
    );
}

#[test]
fn nested_element_store_uses_flattened_address() {
    assert_eq!(
        three_address("{ int[2][3] m; m[1][2] = 5; }"),
        "\tt1 = 1 * 12\n\tt2 = 2 * 4\n\tt3 = t1 + t2\n\tm [ t3 ] = 5\n"
    );
    assert_eq!(
        three_address("{ int[2][3] m; int v; v = m[1][2]; }"),
        "\tt1 = 1 * 12\n\tt2 = 2 * 4\n\tt3 = t1 + t2\n\tt4 = m [ t3 ]\n\tv = t4\n"
    );
}

#[test]
fn while_condition_side_effects_run_every_iteration() {
    let src = "{ int x; while ((x = x - 1) > 0) ; }";
    assert_text(src, "while (true) {\n    x = x - 1;\n    if (!(x > 0)) break;\n}\n");
    assert_eq!(
        three_address(src),
        "L1:\n\tt1 = x - 1\n\tx = t1\n\tt2 = x > 0\n\tiffalse t2 goto L2\n\tgoto L1\nL2:\n"
    );
}

#[test]
fn do_while_condition_side_effects_stay_in_the_loop() {
    assert_text(
        "{ int x; do ; while ((x = x - 1) > 0); }",
        "do {\n    x = x - 1;\n} while (x > 0);\n",
    );
}

#[test]
fn if_condition_side_effects_come_first() {
    assert_text(
        "{ int x; if ((x = x + 1) > 3) x = 0; }",
        "x = x + 1;\nif (x > 3) {\n    x = 0;\n}\n",
    );
}

#[test]
fn double_negation_keeps_both_signs() {
    assert_text("{ int x; x = - -x; }", "x = -(-x);\n");
}

#[test]
fn oversized_array_is_a_type_error() {
    let err = to_pseudocode("{ int[4611686018427387904] a; }").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Type);
}

#[test]
fn long_programs_compile_and_drop() {
    let src = format!("{{ int x;\n{}}}", "x = 1;\n".repeat(20_000));
    let code = to_pseudocode(&src).unwrap_or_else(|e| panic!("program failed to compile: {e}"));
    assert_eq!(code.lines().count(), 20_000);
}

#[test]
fn do_while_tests_after_the_body() {
    assert_text(
        "{ int n; do n = n - 1; while (n > 0); }",
        "do {\n    n = n - 1;\n} while (n > 0);\n",
    );
}

#[test]
fn if_else_and_break_in_three_address_form() {
    assert_eq!(
        three_address("{ int x; while (true) { if (x > 5) break; else x = x + 1; } }"),
        "L1:\n\tiffalse true goto L2\n\tt1 = x > 5\n\tiffalse t1 goto L3\n\tgoto L2\n\tgoto L4\nL3:\n\tt2 = x + 1\n\tx = t2\nL4:\n\tgoto L1\nL2:\n"
    );
}

#[test]
fn nested_blocks_reuse_offsets() {
    let program = parse_program("{ int a; { int b; } { float c; } }").expect("parse");
    let offsets: Vec<_> = program.symbols.iter().map(|id| (id.name.clone(), id.offset)).collect();
    assert_eq!(offsets, vec![("a".to_string(), 0), ("b".to_string(), 4), ("c".to_string(), 4)]);
    assert_eq!(program.frame_size, 12);
}

#[test]
fn undeclared_identifier_is_reported_with_location() {
    let err = to_pseudocode("{\n    int x;\n    x = y + 1;\n}").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UndeclaredIdentifier);
    assert_eq!(err.loc, SourceLocation::new(3, 9));
    assert_eq!(err.to_string(), "undeclared identifier at 3:9: undeclared variable `y`");
}

#[test]
fn break_outside_loop_is_rejected() {
    let err = to_pseudocode("{ int x; if (x < 1) break; }").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax);
}

#[test]
fn failed_compile_emits_nothing() {
    let mut out = TextEmitter::new();
    let err = compile("{ int x; x = 1; x = true; }", &mut out).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Type);
    assert!(out.code().is_empty());
}
