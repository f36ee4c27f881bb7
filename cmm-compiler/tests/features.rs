use cmm_compiler::ast::{BinOp, ChainKind, Expr, Item, Stmt};
use cmm_compiler::codegen::instruction::{AsmItem, JvmInstr};
use cmm_compiler::codegen::limits::stack_profile;
use cmm_compiler::codegen::types::Constant;
use cmm_compiler::codegen::{Gen, ValueType};
use cmm_compiler::{compile, parse, CodegenOptions};

fn new_gen() -> Gen {
    let mut gen = Gen::new(&CodegenOptions::new("t"));
    gen.scopes_mut().push_function(ValueType::Number);
    gen.scopes_mut().push_block();
    gen
}

fn main_body(source_body: &str) -> Vec<String> {
    let source = format!("number main() {{ {source_body} }}");
    let asm = compile(&source, "t").unwrap_or_else(|e| panic!("{source}: {e}"));
    asm.lines()
        .skip_while(|l| *l != ".method public static main()F")
        .skip(3)
        .take_while(|l| *l != ".end method")
        .map(str::to_string)
        .collect()
}

// ── Literals and declarations ────────────────────────────────────────────

#[test]
fn literals_push_once_with_their_own_type() {
    let cases = [
        (Expr::number(2.5), ValueType::Number, Constant::Float(2.5)),
        (Expr::string("hi"), ValueType::String, Constant::Str("hi".into())),
        (Expr::boolean(true), ValueType::Boolean, Constant::Int(1)),
        (Expr::boolean(false), ValueType::Boolean, Constant::Int(0)),
    ];
    for (expr, ty, constant) in cases {
        let mut gen = new_gen();
        assert_eq!(gen.lower_expr(&expr).unwrap(), Some(ty));
        assert_eq!(gen.items(), &[AsmItem::Instr(JvmInstr::Ldc(constant))]);
    }
}

#[test]
fn declarations_store_type_defaults() {
    assert_eq!(
        main_body("number n; boolean b; string s;")[..6],
        [
            "  ldc 0.0",
            "  fstore 0   ; n",
            "  ldc 0",
            "  istore 1   ; b",
            "  ldc \"\"",
            "  astore 2   ; s",
        ]
    );
}

#[test]
fn multi_name_declaration_allocates_consecutive_slots() {
    let body = main_body("number a, b; b = a;");
    assert_eq!(
        body[..6],
        [
            "  ldc 0.0",
            "  fstore 0   ; a",
            "  ldc 0.0",
            "  fstore 1   ; b",
            "  fload 0   ;a",
            "  fstore 1   ; b",
        ]
    );
}

// ── Scoping ──────────────────────────────────────────────────────────────

#[test]
fn nested_block_shadows_then_restores() {
    let body = main_body("number x; { string x; print(x); } print(x);");
    assert_eq!(
        body[..10],
        [
            "  ldc 0.0",
            "  fstore 0   ; x",
            "  ldc \"\"",
            "  astore 1   ; x",
            "  aload 1   ;x",
            "  invokestatic t/print(Ljava/lang/String;)Ljava/lang/String;",
            "  pop",
            "  fload 0   ;x",
            "  invokestatic t/print(F)F",
            "  pop",
        ]
    );
}

#[test]
fn parameters_occupy_the_first_slots() {
    let asm = compile("number add(number a, number b) { return a + b; }", "t").unwrap();
    assert!(asm.contains("  fload 0   ;a\n  fload 1   ;b\n  fadd\n  freturn"));
}

#[test]
fn functions_do_not_see_each_others_locals() {
    let source = r#"
        number f() { number hidden; return hidden; }
        number main() { return hidden; }
    "#;
    assert!(compile(source, "t").is_err());
}

// ── Overloading ──────────────────────────────────────────────────────────

#[test]
fn overloads_resolve_by_argument_types() {
    let source = r#"
        number f(number n) { return n; }
        number f(string s) { return 1; }
        number main() { f(1); f("a"); }
    "#;
    let asm = compile(source, "t").unwrap();
    assert!(asm.contains("  ldc 1.0\n  invokestatic t/f(F)F"));
    assert!(asm.contains("  ldc \"a\"\n  invokestatic t/f(Ljava/lang/String;)F"));
}

#[test]
fn builtin_print_overloads() {
    let body = main_body(r#"print(true); print(1); print("s");"#);
    assert!(body.contains(&"  invokestatic t/print(I)I".to_string()));
    assert!(body.contains(&"  invokestatic t/print(F)F".to_string()));
    assert!(body.contains(&"  invokestatic t/print(Ljava/lang/String;)Ljava/lang/String;".to_string()));
}

// ── Additive chains ──────────────────────────────────────────────────────

#[test]
fn concatenation_result_type_is_closed_over_string() {
    let operands = [Expr::number(1.0), Expr::string("s"), Expr::boolean(true)];
    for left in &operands {
        for right in &operands {
            let expr = Expr::binary(ChainKind::Sum, left.clone(), BinOp::Plus, right.clone());
            let mut gen = new_gen();
            let ty = gen.lower_expr(&expr).unwrap();
            let involves_string = matches!(left, Expr::Literal(cmm_compiler::ast::Literal::String(_)))
                || matches!(right, Expr::Literal(cmm_compiler::ast::Literal::String(_)));
            if involves_string {
                assert_eq!(ty, Some(ValueType::String), "{left:?} + {right:?}");
            } else {
                assert_eq!(ty, Some(ValueType::Number), "{left:?} + {right:?}");
            }
            let profile = stack_profile(gen.items());
            assert_eq!(profile.final_depth, Some(1), "{left:?} + {right:?}");
        }
    }
}

#[test]
fn all_number_chain_stays_number() {
    let expr = Expr::chain(
        ChainKind::Sum,
        Expr::number(1.0),
        vec![(BinOp::Plus, Expr::number(2.0)), (BinOp::Minus, Expr::number(3.0))],
    );
    let mut gen = new_gen();
    assert_eq!(gen.lower_expr(&expr).unwrap(), Some(ValueType::Number));
    let text: Vec<String> = gen.items().iter().map(ToString::to_string).collect();
    assert_eq!(text, ["  ldc 1.0", "  ldc 2.0", "  fadd", "  ldc 3.0", "  fsub"]);
}

#[test]
fn string_running_type_coerces_later_operands() {
    let body = main_body(r#"string s; s = "a" + 1 + true + "b";"#);
    assert_eq!(
        body[2..10],
        [
            "  ldc \"a\"",
            "  ldc 1.0",
            "  invokestatic java/lang/Float/toString(F)Ljava/lang/String;",
            "  invokevirtual java/lang/String/concat(Ljava/lang/String;)Ljava/lang/String;",
            "  ldc 1",
            "  invokestatic t/concat(Ljava/lang/String;I)Ljava/lang/String;",
            "  ldc \"b\"",
            "  invokevirtual java/lang/String/concat(Ljava/lang/String;)Ljava/lang/String;",
        ]
    );
}

#[test]
fn boolean_plus_string_uses_runtime_helper() {
    let body = main_body(r#"string s; s = false + "x";"#);
    assert_eq!(
        body[2..6],
        [
            "  ldc 0",
            "  ldc \"x\"",
            "  invokestatic t/concat(ILjava/lang/String;)Ljava/lang/String;",
            "  astore 0   ; s",
        ]
    );
}

// ── Other operators ──────────────────────────────────────────────────────

#[test]
fn term_chain_uses_float_ops() {
    let body = main_body("number x; x = 6 * 2 / 3 % 4;");
    assert_eq!(
        body[2..10],
        [
            "  ldc 6.0",
            "  ldc 2.0",
            "  fmul",
            "  ldc 3.0",
            "  fdiv",
            "  ldc 4.0",
            "  frem",
            "  fstore 0   ; x",
        ]
    );
}

#[test]
fn exponent_is_pow_for_numbers_and_xor_for_booleans() {
    let body = main_body("number n; boolean b; n = 2 ^ 3; b = true ^ false;");
    assert_eq!(
        body[4..],
        [
            "  ldc 2.0",
            "  ldc 3.0",
            "  invokestatic t/pow(FF)F",
            "  fstore 0   ; n",
            "  ldc 1",
            "  ldc 0",
            "  ixor",
            "  istore 1   ; b",
            "  ldc 0.0",
            "  freturn",
        ]
    );
}

#[test]
fn logical_chain_uses_bitwise_ops() {
    let body = main_body("boolean b; b = true and false or true;");
    assert_eq!(
        body[2..8],
        ["  ldc 1", "  ldc 0", "  iand", "  ldc 1", "  ior", "  istore 0   ; b"]
    );
}

#[test]
fn comparison_value_pushes_zero_or_one() {
    let body = main_body("boolean b; b = 1 < 2;");
    assert_eq!(
        body[2..12],
        [
            "  ldc 1.0",
            "  ldc 2.0",
            "  fcmpl",
            "  iflt label0",
            "  ldc 0",
            "  goto label1",
            "label0:",
            "  ldc 1",
            "label1:",
            "  istore 0   ; b",
        ]
    );
}

#[test]
fn not_inverts_a_boolean() {
    let body = main_body("boolean b; b = not b;");
    assert_eq!(
        body[2..11],
        [
            "  iload 0   ;b",
            "  ifeq label0",
            "  ldc 0",
            "  goto label1",
            "label0:",
            "  ldc 1",
            "label1:",
            "  istore 0   ; b",
            "  ldc 0.0",
        ]
    );
}

// ── Assignment ───────────────────────────────────────────────────────────

#[test]
fn assignment_as_expression_duplicates_the_value() {
    let body = main_body("number x; print(x = 5);");
    assert_eq!(
        body[2..7],
        [
            "  ldc 5.0",
            "  dup",
            "  fstore 0   ; x",
            "  invokestatic t/print(F)F",
            "  pop",
        ]
    );
}

#[test]
fn bare_assignment_leaves_nothing_behind() {
    let body = main_body("number x; x = 5;");
    assert_eq!(body[2..4], ["  ldc 5.0", "  fstore 0   ; x"]);
    assert!(!body.contains(&"  dup".to_string()));
    assert!(!body.contains(&"  pop".to_string()));
}

#[test]
fn chained_assignment_stores_right_to_left() {
    let body = main_body("number a, b; a = b = 7;");
    assert_eq!(
        body[4..8],
        ["  ldc 7.0", "  dup", "  fstore 1   ; b", "  fstore 0   ; a"]
    );
}

// ── Control flow ─────────────────────────────────────────────────────────

#[test]
fn plain_if_branches_past_the_block() {
    let body = main_body("boolean b; if (b) { print(1); }");
    assert_eq!(
        body[2..8],
        [
            "  iload 0   ;b",
            "  ifeq label0",
            "  ldc 1.0",
            "  invokestatic t/print(F)F",
            "  pop",
            "label0:",
        ]
    );
}

#[test]
fn if_elsif_else_chain() {
    let body = main_body(
        "number x; if (x == 1) { print(1); } elsif (x == 2) { print(2); } else { print(3); }",
    );
    assert_eq!(
        body[2..],
        [
            "  fload 0   ;x",
            "  ldc 1.0",
            "  fcmpl",
            "  ifne label1",
            "  ldc 1.0",
            "  invokestatic t/print(F)F",
            "  pop",
            "  goto label0",
            "label1:",
            "  fload 0   ;x",
            "  ldc 2.0",
            "  fcmpl",
            "  ifne label2",
            "  ldc 2.0",
            "  invokestatic t/print(F)F",
            "  pop",
            "  goto label0",
            "label2:",
            "  ldc 3.0",
            "  invokestatic t/print(F)F",
            "  pop",
            "label0:",
            "  ldc 0.0",
            "  freturn",
        ]
    );
}

#[test]
fn do_while_runs_body_before_test() {
    let body = main_body("number i; do { i = i + 1; } while (i < 3);");
    assert_eq!(
        body[2..],
        [
            "label0:",
            "  fload 0   ;i",
            "  ldc 1.0",
            "  fadd",
            "  fstore 0   ; i",
            "  fload 0   ;i",
            "  ldc 3.0",
            "  fcmpl",
            "  ifge label1",
            "  goto label0",
            "label1:",
            "  ldc 0.0",
            "  freturn",
        ]
    );
}

#[test]
fn labels_are_never_reused() {
    let asm = compile(
        "number main() { number i; while (i < 3) { if (i == 1) { i = 2; } i = i + 1; } do { } while (not (i > 0)); }",
        "t",
    )
    .unwrap();
    let labels: Vec<&str> = asm.lines().filter(|l| l.starts_with("label")).collect();
    let mut unique = labels.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(labels.len(), unique.len());
    // while: 2, if: 1, do-while: 2, materialised comparison: 2, not: 2
    assert_eq!(labels.len(), 9);
}

// ── Stack discipline ─────────────────────────────────────────────────────

#[test]
fn every_statement_is_stack_neutral() {
    let source = r#"
        number main() {
            number x, y;
            string s;
            boolean b;
            x = 1 + 2 * 3 ^ 2;
            s = x + " and " + b + "!";
            s = "n" + (x = 4);
            b = x < y and not b or y >= 2;
            print(s);
            println(x = y = 3);
            if (b) { x = 1; } elsif (x != 2) { y = 2; } else { s = s + s; }
            while (x <= 10) { x = x + 1; }
            do { y = y - 1; } while (y > 0);
            { number inner; inner = x; }
            cos(sin(x));
        }
    "#;
    let program = parse(source).unwrap();
    let Item::Function(main) = &program.items[0] else {
        panic!("expected a function");
    };
    let mut gen = new_gen();
    for stmt in &main.body.stmts {
        gen.lower_stmt(stmt).unwrap();
        let items = gen.take_items();
        let profile = stack_profile(&items);
        assert_eq!(profile.final_depth, Some(0), "{stmt:?}");
        assert!(profile.min >= 0, "{stmt:?}");
    }
}

#[test]
fn return_ends_control_flow() {
    let mut gen = new_gen();
    gen.lower_stmt(&Stmt::Return(Expr::number(1.0))).unwrap();
    assert_eq!(stack_profile(gen.items()).final_depth, None);
}
