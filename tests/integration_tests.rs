use std::collections::HashSet;

use lunac::analyzer::{SymbolTable, Ty, Value};
use lunac::codegen::{Codegen, FOOTER, HEADER};
use lunac::error::{CompileError, LexicalErrorKind, NameError, TypeError};
use lunac::parser::*;
use lunac::{compile, CompileResult, Compiler};

fn parse(source: &str) -> Node {
    let mut ids = IdGenerator::new();
    Parser::new(source, &mut ids).unwrap().parse().unwrap()
}

fn eval_expr(expr: &str) -> CompileResult<Value> {
    let mut ids = IdGenerator::new();
    let root = Parser::new(&format!("print({expr})\n"), &mut ids)?.parse()?;
    let NodeKind::Block(block) = &root.kind else {
        panic!("root is not a block");
    };
    let NodeKind::Print(inner) = &block.0[0].kind else {
        panic!("expected a print statement");
    };
    let mut codegen = Codegen::new();
    codegen.evaluate(inner, &mut SymbolTable::new())
}

/// Generated code only, without the fixed header and footer.
fn body(source: &str) -> String {
    let asm = compile(source).unwrap();
    assert!(asm.starts_with(HEADER));
    assert!(asm.ends_with(FOOTER));
    asm[HEADER.len()..asm.len() - FOOTER.len()].to_string()
}

fn label_definitions(asm: &str) -> Vec<String> {
    asm.lines()
        .filter(|l| !l.starts_with(';') && l.ends_with(':'))
        .map(|l| l.trim_end_matches(':').to_string())
        .collect()
}

#[test]
fn multiplication_binds_tighter() {
    let root = parse("x = 2+3*4\n");
    let NodeKind::Block(Block(stmts)) = &root.kind else {
        panic!();
    };
    let NodeKind::Assign(_, expr) = &stmts[0].kind else {
        panic!();
    };
    let NodeKind::BinOp(BinOpKind::Add, left, right) = &expr.kind else {
        panic!("expected + at the root, got {:?}", expr.kind);
    };
    assert_eq!(left.kind, NodeKind::IntVal(2));
    assert!(matches!(right.kind, NodeKind::BinOp(BinOpKind::Mul, _, _)));

    assert_eq!(eval_expr("2+3*4"), Ok(Value::Int(14)));
}

#[test]
fn operators_fold_left() {
    assert_eq!(eval_expr("10 - 3 - 2"), Ok(Value::Int(5)));
    assert_eq!(eval_expr("100 / 10 / 5"), Ok(Value::Int(2)));
    assert_eq!(eval_expr("(1 + 2) * -3"), Ok(Value::Int(-9)));
    assert_eq!(eval_expr("1 < 2 and 3 > 2 or 0"), Ok(Value::Int(1)));
}

#[test]
fn arithmetic_needs_ints() {
    assert_eq!(
        eval_expr("1 + \"a\""),
        Err(CompileError::Type(TypeError::Arithmetic {
            op: "+",
            left: Ty::Int,
            right: Ty::String,
        }))
    );
    assert!(matches!(
        eval_expr("\"a\" and 1"),
        Err(CompileError::Type(TypeError::Arithmetic { op: "and", .. }))
    ));
}

#[test]
fn concat_accepts_ints_and_strings() {
    assert_eq!(eval_expr("\"a\" .. 1"), Ok(Value::Str("a1".to_string())));
    assert_eq!(eval_expr("1 .. 2 .. \"x\""), Ok(Value::Str("12x".to_string())));
}

#[test]
fn relational_needs_matching_types() {
    assert_eq!(
        eval_expr("1 == \"a\""),
        Err(CompileError::Type(TypeError::Mismatch {
            op: "==",
            left: Ty::Int,
            right: Ty::String,
        }))
    );
    assert_eq!(eval_expr("\"a\" < \"b\""), Ok(Value::Int(1)));
    assert_eq!(eval_expr("3 == 3"), Ok(Value::Int(1)));
}

#[test]
fn unary_needs_int() {
    assert_eq!(eval_expr("not 0"), Ok(Value::Int(1)));
    assert_eq!(
        eval_expr("-\"a\""),
        Err(CompileError::Type(TypeError::Unary {
            op: "-",
            operand: Ty::String,
        }))
    );
}

#[test]
fn read_is_an_int_placeholder() {
    assert_eq!(eval_expr("read()").map(|v| v.ty()), Ok(Ty::Int));
    assert_eq!(eval_expr("read() / read()"), Ok(Value::Int(0)));
}

#[test]
fn reassignment_retags_a_variable() {
    let err = compile("local x = 1\nx = \"s\"\nprint(x + 1)\n").unwrap_err();
    assert_eq!(
        err,
        CompileError::Type(TypeError::Arithmetic {
            op: "+",
            left: Ty::String,
            right: Ty::Int,
        })
    );
}

#[test]
fn nth_local_lives_at_four_n() {
    let asm = body("local a = 1\nlocal b\nlocal c = 3\nprint(c)\n");
    assert!(asm.contains("MOV DWORD [EBP-4], EAX"));
    assert!(asm.contains("MOV DWORD [EBP-8], 0"));
    assert!(asm.contains("MOV DWORD [EBP-12], EAX"));
    assert!(asm.contains("MOV EAX, DWORD [EBP-12]"));
    assert!(asm.contains("frame_size_main equ 12"));
}

#[test]
fn nth_param_lives_above_the_frame() {
    let asm = body("function f(a, b, c)\nlocal d = a\nreturn c\nend\n");
    assert!(asm.contains("MOV EAX, DWORD [EBP+8]\nMOV DWORD [EBP-4], EAX"));
    assert!(asm.contains("MOV EAX, DWORD [EBP+16]\nMOV ESP, EBP\nPOP EBP\nRET"));
}

#[test]
fn skipped_declaration_does_not_shift_later_slots() {
    let asm = body("if 0 then\nlocal a = 1\nend\nlocal b = 2\nprint(b)\n");
    assert!(asm.starts_with("SUB ESP, frame_size_main\n"));
    assert!(asm.contains("MOV DWORD [EBP-8], EAX"));
    assert!(asm.contains("frame_size_main equ 8"));
    assert!(!asm.contains("PUSH DWORD 0"));
}

#[test]
fn name_errors() {
    assert_eq!(
        compile("local a\nlocal a\n"),
        Err(CompileError::Name(NameError::DuplicateVariable(
            "a".to_string()
        )))
    );
    assert_eq!(
        compile("print(b)\n"),
        Err(CompileError::Name(NameError::UndeclaredVariable(
            "b".to_string()
        )))
    );
    assert_eq!(
        compile("c = 1\n"),
        Err(CompileError::Name(NameError::UndeclaredVariable(
            "c".to_string()
        )))
    );
    assert_eq!(
        compile("function f()\nend\nfunction f()\nend\n"),
        Err(CompileError::Name(NameError::DuplicateFunction(
            "f".to_string()
        )))
    );
}

#[test]
fn functions_must_be_declared_before_use() {
    assert_eq!(
        compile("print(f())\nfunction f()\nreturn 1\nend\n"),
        Err(CompileError::Name(NameError::UndeclaredFunction(
            "f".to_string()
        )))
    );
}

#[test]
fn function_scope_is_isolated() {
    assert_eq!(
        compile("local x = 1\nfunction f()\nreturn x\nend\n"),
        Err(CompileError::Name(NameError::UndeclaredVariable(
            "x".to_string()
        )))
    );
}

#[test]
fn arity_mismatch() {
    let err = compile("function add(a, b)\nreturn a + b\nend\nprint(add(1))\n").unwrap_err();
    assert_eq!(
        err,
        CompileError::Arity {
            name: "add".to_string(),
            expected: 2,
            given: 1,
        }
    );
    assert!(err.to_string().contains("expects 2 arguments, 1 given"));
}

#[test]
fn control_flow_labels_are_unique() {
    let source = "\
local i = 0
while i < 3 do
  if i == 1 then
    print(i)
  else
    while 0 do
    end
  end
  i = i + 1
end
if 1 then
end
";
    let asm = body(source);
    let labels = label_definitions(&asm);
    let unique: HashSet<_> = labels.iter().collect();
    assert_eq!(unique.len(), labels.len(), "duplicate labels in {labels:?}");
    assert_eq!(labels.iter().filter(|l| l.starts_with("while_loop_")).count(), 2);
    assert_eq!(labels.iter().filter(|l| l.starts_with("if_else_")).count(), 2);
}

#[test]
fn function_names_never_shadow_generated_labels() {
    let asm = body("function end_1()\nend\nfunction skip_0()\nend\nfunction g()\nend\n");
    let labels = label_definitions(&asm);
    let unique: HashSet<_> = labels.iter().collect();
    assert_eq!(unique.len(), labels.len(), "duplicate labels in {labels:?}");
    assert!(labels.contains(&"func_end_1".to_string()));
    assert_eq!(labels.iter().filter(|l| l.starts_with("skip_func_")).count(), 3);
}

#[test]
fn return_is_only_allowed_in_functions() {
    assert!(matches!(
        compile("return 1\n"),
        Err(CompileError::Syntax { line: 1, actual: "RETURN", .. })
    ));
    assert!(matches!(
        compile("local x = 1\nif x then\nreturn x\nend\n"),
        Err(CompileError::Syntax { line: 3, actual: "RETURN", .. })
    ));
    assert!(compile("function f()\nif 1 then\nreturn 2\nend\nend\n").is_ok());

    // Leaving a function body ends the permission.
    assert!(matches!(
        compile("function f()\nreturn 1\nend\nreturn 2\n"),
        Err(CompileError::Syntax { line: 4, actual: "RETURN", .. })
    ));
}

#[test]
fn labels_stay_unique_across_compilations() {
    let mut compiler = Compiler::new();
    let first = compiler.compile("if 1 then\nend\n").unwrap();
    let second = compiler.compile("if 1 then\nend\n").unwrap();

    let first: HashSet<_> = label_definitions(&first).into_iter().collect();
    let second: HashSet<_> = label_definitions(&second).into_iter().collect();
    let ifs = |labels: &HashSet<String>| {
        labels
            .iter()
            .filter(|l| l.starts_with("if_"))
            .cloned()
            .collect::<HashSet<_>>()
    };
    assert!(ifs(&first).is_disjoint(&ifs(&second)));
}

#[test]
fn right_operand_is_evaluated_first() {
    let asm = body("print(7 - 2)\n");
    assert!(asm.contains("MOV EAX, 2\nPUSH EAX\nMOV EAX, 7\nPOP EBX\nSUB EAX, EBX\n"));
}

#[test]
fn division_sign_extends_the_dividend() {
    let asm = body("print(7 / 2)\n");
    assert!(asm.contains("POP EBX\nCDQ\nIDIV EBX\n"));
}

#[test]
fn comparisons_use_the_shared_routines() {
    let asm = body("print(1 > 2)\nprint(1 < 2)\nprint(1 == 2)\n");
    assert!(asm.contains("CMP EAX, EBX\nCALL binop_jg\n"));
    assert!(asm.contains("CMP EAX, EBX\nCALL binop_jl\n"));
    assert!(asm.contains("CMP EAX, EBX\nCALL binop_je\n"));
    assert!(!asm.contains("binop_true:"));
}

#[test]
fn logical_operators_do_not_short_circuit() {
    let asm = body("print(read() and read())\n");
    assert_eq!(asm.matches("CALL scanf").count(), 2);
    assert!(asm.contains("AND EAX, EBX"));
}

#[test]
fn print_local() {
    let asm = body("local a = 1\nprint(a)\n");
    assert!(asm.contains(
        "MOV DWORD [EBP-4], 0\n\
         MOV EAX, 1\n\
         MOV DWORD [EBP-4], EAX\n\
         MOV EAX, DWORD [EBP-4]\n\
         PUSH EAX\n\
         PUSH formatout\n\
         CALL printf\n\
         ADD ESP, 8\n"
    ));
}

#[test]
fn summing_loop_until_sentinel() {
    let source = "\
-- sum numbers until a zero is read
local sum = 0
local n = read()
while not (n == 0) do
  sum = sum + n
  n = read()
end
print(sum)
";
    let asm = body(source);
    let labels = label_definitions(&asm);
    let begin = labels.iter().find(|l| l.starts_with("while_loop_")).unwrap();
    let end = labels.iter().find(|l| l.starts_with("while_exit_")).unwrap();

    assert!(asm.contains(&format!("JE {end}\n")));
    assert!(asm.contains(&format!("JMP {begin}\n{end}:\n")));
    assert_eq!(asm.matches("CALL scanf").count(), 2);
    assert!(asm.contains("MOV EAX, DWORD [EBP-4]\nPUSH EAX\nPUSH formatout\nCALL printf\n"));
}

#[test]
fn function_call_convention() {
    let asm = body("function add(a, b)\n return a + b\nend\nprint(add(2,3))\n");

    let end_label = label_definitions(&asm)
        .into_iter()
        .find(|l| l.starts_with("skip_func_"))
        .unwrap();
    assert!(asm.starts_with(&format!(
        "SUB ESP, frame_size_main\nJMP {end_label}\nfunc_add:\nPUSH EBP\nMOV EBP, ESP\n"
    )));
    assert!(asm.contains("MOV EAX, DWORD [EBP+12]\nPUSH EAX\nMOV EAX, DWORD [EBP+8]\nPOP EBX\nADD EAX, EBX\n"));
    assert!(asm.contains("MOV EAX, 3\nPUSH EAX\nMOV EAX, 2\nPUSH EAX\nCALL func_add\nADD ESP, 8\nPUSH EAX\nPUSH formatout\n"));
}

#[test]
fn recursion_resolves() {
    let source = "\
function fact(n)
  if n < 2 then
    return 1
  end
  return n * fact(n - 1)
end
print(fact(5))
";
    let asm = body(source);
    assert_eq!(asm.matches("CALL func_fact").count(), 2);
}

#[test]
fn direct_return_ends_the_block() {
    let asm = body("function f()\nreturn 1\nprint(99)\nend\nprint(f())\n");
    assert!(!asm.contains("MOV EAX, 99"));

    // A return inside a nested block does not cut the outer block short.
    let asm = body("function g(x)\nif x then\nreturn 1\nend\nprint(99)\nend\n");
    assert!(asm.contains("MOV EAX, 99"));
}

#[test]
fn parameters_are_ints_in_the_body() {
    // Argument types are not known when the body is generated.
    assert!(compile("function f(a)\nreturn a + 1\nend\nprint(f(\"s\"))\n").is_ok());
    assert!(matches!(
        compile("function f(a)\nreturn a .. \"x\" < 1\nend\n"),
        Err(CompileError::Type(TypeError::Mismatch {
            left: Ty::String,
            right: Ty::Int,
            ..
        }))
    ));
}

#[test]
fn call_sites_see_the_return_type() {
    let source = "function s()\nreturn \"x\"\nend\nprint(s() + 1)\n";
    assert!(matches!(
        compile(source),
        Err(CompileError::Type(TypeError::Arithmetic {
            left: Ty::String,
            ..
        }))
    ));
    assert!(compile("function s()\nreturn \"x\"\nend\nlocal v = s() .. 1\n").is_ok());
}

#[test]
fn strings_are_emitted_as_bytes() {
    let asm = body("local s = \"hi\"\n");
    assert!(asm.contains(": db 104, 105, 0\n"));
}

#[test]
fn syntax_errors_name_the_expected_set() {
    assert_eq!(
        compile("print(1\n"),
        Err(CompileError::Syntax {
            line: 1,
            expected: vec!["CLOSE_PAR"],
            actual: "NEWLINE",
        })
    );
    assert!(matches!(
        compile("x\n"),
        Err(CompileError::Syntax { ref expected, .. }) if expected == &["ASSIGN", "OPEN_PAR"]
    ));
    assert!(matches!(
        compile("while 1 do\nprint(1)\n"),
        Err(CompileError::Syntax { actual: "EOF", .. })
    ));
    let err = compile("\n\nlocal 5\n").unwrap_err();
    assert_eq!(err.to_string(), "line 3: expected one of [IDENTIFIER], got INT");
}

#[test]
fn lexical_errors() {
    assert_eq!(
        compile("print(\"abc)\n"),
        Err(CompileError::Lexical {
            line: 1,
            kind: LexicalErrorKind::UnterminatedString,
        })
    );
    assert_eq!(
        compile("x = 1\ny = 2 @ 3\n"),
        Err(CompileError::Lexical {
            line: 2,
            kind: LexicalErrorKind::InvalidCharacter('@'),
        })
    );
}

#[test]
fn comments_are_ignored() {
    assert!(compile("-- leading comment\nprint(1) -- trailing\n").is_ok());
}

#[test]
fn empty_program_is_header_and_footer() {
    let asm = compile("").unwrap();
    assert_eq!(
        asm,
        format!("{HEADER}SUB ESP, frame_size_main\nframe_size_main equ 0\n{FOOTER}")
    );
}
