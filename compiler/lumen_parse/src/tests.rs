use crate::{parse, ParseResult};
use lumen_ir::ast::{
    BinaryOp, BuiltinKind, ClassMember, ExprKind, ItemKind, ParsedType, StmtKind,
};
use lumen_ir::StringInterner;
use lumen_lexer::lex;
use pretty_assertions::assert_eq;

fn parse_source(source: &str, interner: &StringInterner) -> ParseResult {
    let tokens = lex(source, interner);
    parse(&tokens, interner)
}

fn parse_ok(source: &str, interner: &StringInterner) -> ParseResult {
    let result = parse_source(source, interner);
    assert!(
        result.errors.is_empty(),
        "unexpected parse errors: {:?}",
        result.errors
    );
    result
}

#[test]
fn function_with_return() {
    let interner = StringInterner::new();
    let result = parse_ok("func main() -> i32 { ret 42; }", &interner);
    assert_eq!(result.unit.items.len(), 1);

    let ItemKind::FunctionDef(def) = &result.unit.items[0].kind else {
        panic!("expected function def");
    };
    assert_eq!(interner.lookup(def.decl.name), "main");
    assert_eq!(def.decl.return_ty, ParsedType::Builtin(BuiltinKind::I32));
    assert!(def.decl.params.params.is_empty());
}

#[test]
fn default_return_type_is_void() {
    let interner = StringInterner::new();
    let result = parse_ok("func side_effect() {}", &interner);
    let ItemKind::FunctionDef(def) = &result.unit.items[0].kind else {
        panic!("expected function def");
    };
    assert_eq!(def.decl.return_ty, ParsedType::Builtin(BuiltinKind::Void));
}

#[test]
fn binary_precedence() {
    let interner = StringInterner::new();
    let result = parse_ok("func f() -> i32 { ret 1 + 2 * 3; }", &interner);
    let ItemKind::FunctionDef(def) = &result.unit.items[0].kind else {
        panic!("expected function def");
    };
    let StmtKind::Compound(stmts) = &result.arena.stmt(def.body).kind else {
        panic!("expected compound body");
    };
    let StmtKind::Return(Some(value)) = &result.arena.stmt(stmts[0]).kind else {
        panic!("expected return");
    };
    // 1 + (2 * 3): the addition is the root.
    let ExprKind::Binary { op, rhs, .. } = &result.arena.expr(*value).kind else {
        panic!("expected binary expression");
    };
    assert_eq!(*op, BinaryOp::Add);
    let ExprKind::Binary { op: inner, .. } = &result.arena.expr(*rhs).kind else {
        panic!("expected nested multiplication");
    };
    assert_eq!(*inner, BinaryOp::Mul);
}

#[test]
fn relational_binds_tighter_than_shift() {
    let interner = StringInterner::new();
    // Per the precedence table, `a << b < c` is `a << (b < c)`.
    let result = parse_ok("func f() -> i32 { ret 1 << 2 < 3; }", &interner);
    let ItemKind::FunctionDef(def) = &result.unit.items[0].kind else {
        panic!("expected function def");
    };
    let StmtKind::Compound(stmts) = &result.arena.stmt(def.body).kind else {
        panic!("expected compound body");
    };
    let StmtKind::Return(Some(value)) = &result.arena.stmt(stmts[0]).kind else {
        panic!("expected return");
    };
    let ExprKind::Binary { op, .. } = &result.arena.expr(*value).kind else {
        panic!("expected binary expression");
    };
    assert_eq!(*op, BinaryOp::Shl);
}

#[test]
fn shift_right_from_adjacent_gt() {
    let interner = StringInterner::new();
    let result = parse_ok("func f() -> i32 { ret 8 >> 2; }", &interner);
    assert!(result.is_ok());
}

#[test]
fn var_def_forms() {
    let interner = StringInterner::new();
    let result = parse_ok(
        "func f() { var a = 1; var mutable b: i64 = 2; var c: *i8; }",
        &interner,
    );
    let ItemKind::FunctionDef(def) = &result.unit.items[0].kind else {
        panic!("expected function def");
    };
    let StmtKind::Compound(stmts) = &result.arena.stmt(def.body).kind else {
        panic!("expected compound body");
    };
    assert_eq!(stmts.len(), 3);

    let StmtKind::VarDef {
        is_mutable, ty, init, ..
    } = &result.arena.stmt(stmts[1]).kind
    else {
        panic!("expected var def");
    };
    assert!(*is_mutable);
    assert_eq!(*ty, Some(ParsedType::Builtin(BuiltinKind::I64)));
    assert!(init.is_some());

    let StmtKind::VarDef { ty, init, .. } = &result.arena.stmt(stmts[2]).kind else {
        panic!("expected var def");
    };
    assert_eq!(
        *ty,
        Some(ParsedType::Pointer {
            pointee: Box::new(ParsedType::Builtin(BuiltinKind::I8)),
            depth: 1
        })
    );
    assert!(init.is_none());
}

#[test]
fn for_with_var_init_and_step() {
    let interner = StringInterner::new();
    let result = parse_ok(
        "func f() -> i32 { for (var mutable i = 0; i < 10; ++i) {} ret 0; }",
        &interner,
    );
    let ItemKind::FunctionDef(def) = &result.unit.items[0].kind else {
        panic!("expected function def");
    };
    let StmtKind::Compound(stmts) = &result.arena.stmt(def.body).kind else {
        panic!("expected compound body");
    };
    let StmtKind::For {
        init, cond, step, ..
    } = &result.arena.stmt(stmts[0]).kind
    else {
        panic!("expected for");
    };
    assert!(init.is_some());
    assert!(cond.is_some());
    assert!(matches!(
        result.arena.stmt(step.expect("step present")).kind,
        StmtKind::IncDec { .. }
    ));
}

#[test]
fn for_clauses_are_optional() {
    let interner = StringInterner::new();
    let result = parse_ok("func f() { for (;;) { break; } }", &interner);
    assert!(result.is_ok());
}

#[test]
fn match_with_default_arm() {
    let interner = StringInterner::new();
    let result = parse_ok(
        "func f(x: i32) -> i32 { match (x) { 1 => ret 10;, 2 => { ret 20; }, _ => ret 0; } ret 1; }",
        &interner,
    );
    let ItemKind::FunctionDef(def) = &result.unit.items[0].kind else {
        panic!("expected function def");
    };
    let StmtKind::Compound(stmts) = &result.arena.stmt(def.body).kind else {
        panic!("expected compound body");
    };
    let StmtKind::Match { arms, .. } = &result.arena.stmt(stmts[0]).kind else {
        panic!("expected match");
    };
    assert_eq!(arms.len(), 3);
    assert!(arms[0].pattern.is_some());
    assert!(arms[2].pattern.is_none());
}

#[test]
fn class_with_ctor_dtor_and_access() {
    let interner = StringInterner::new();
    let result = parse_ok(
        "class Box {\n\
         var x: i32;\n\
         public:\n\
         func new(v: i32) { }\n\
         func delete() { }\n\
         func get() -> i32 { ret 0; }\n\
         }",
        &interner,
    );
    let ItemKind::ClassDef(class) = &result.unit.items[0].kind else {
        panic!("expected class def");
    };
    assert_eq!(interner.lookup(class.name), "Box");
    assert_eq!(class.members.len(), 5);
    assert!(matches!(class.members[0], ClassMember::Field(_)));
    assert!(matches!(class.members[1], ClassMember::Access(_)));
    let ClassMember::Constructor(ctor) = &class.members[2] else {
        panic!("expected constructor");
    };
    assert!(ctor.decl.is_constructor);
    assert!(matches!(class.members[3], ClassMember::Destructor(_)));
    assert!(matches!(class.members[4], ClassMember::Method(_)));
}

#[test]
fn union_def() {
    let interner = StringInterner::new();
    let result = parse_ok("union Number { int_: i64, float_: f64 }", &interner);
    let ItemKind::UnionDef(union) = &result.unit.items[0].kind else {
        panic!("expected union def");
    };
    assert_eq!(union.tags.len(), 2);
}

#[test]
fn template_function_and_call() {
    let interner = StringInterner::new();
    let result = parse_ok(
        "func id<T>(x: T) -> T { ret x; } func main() -> i32 { ret id<i32>(7); }",
        &interner,
    );
    let ItemKind::FunctionDef(id_def) = &result.unit.items[0].kind else {
        panic!("expected function def");
    };
    assert!(id_def.decl.is_template());

    let ItemKind::FunctionDef(main_def) = &result.unit.items[1].kind else {
        panic!("expected function def");
    };
    let StmtKind::Compound(stmts) = &result.arena.stmt(main_def.body).kind else {
        panic!("expected compound body");
    };
    let StmtKind::Return(Some(value)) = &result.arena.stmt(stmts[0]).kind else {
        panic!("expected return");
    };
    assert!(matches!(
        result.arena.expr(*value).kind,
        ExprKind::TemplateCall { .. }
    ));
}

#[test]
fn template_syntax_does_not_eat_comparisons() {
    let interner = StringInterner::new();
    let result = parse_ok("func f(a: i32, b: i32) -> bool { ret a < b; }", &interner);
    let ItemKind::FunctionDef(def) = &result.unit.items[0].kind else {
        panic!("expected function def");
    };
    let StmtKind::Compound(stmts) = &result.arena.stmt(def.body).kind else {
        panic!("expected compound body");
    };
    let StmtKind::Return(Some(value)) = &result.arena.stmt(stmts[0]).kind else {
        panic!("expected return");
    };
    let ExprKind::Binary { op, .. } = &result.arena.expr(*value).kind else {
        panic!("expected comparison");
    };
    assert_eq!(*op, BinaryOp::Lt);
}

#[test]
fn nested_template_types_close() {
    let interner = StringInterner::new();
    let result = parse_ok("typedef Matrix = Vec<Vec<i32>>;", &interner);
    let ItemKind::Typedef { ty, .. } = &result.unit.items[0].kind else {
        panic!("expected typedef");
    };
    let ParsedType::Template { args, .. } = ty else {
        panic!("expected template type");
    };
    assert!(matches!(args[0], ParsedType::Template { .. }));
}

#[test]
fn namespace_and_scope_resolution() {
    let interner = StringInterner::new();
    let result = parse_ok(
        "namespace math { func abs(x: i32) -> i32 { ret x; } }\n\
         func main() -> i32 { ret math::abs(3); }",
        &interner,
    );
    let ItemKind::Namespace { items, .. } = &result.unit.items[0].kind else {
        panic!("expected namespace");
    };
    assert_eq!(items.len(), 1);
}

#[test]
fn extern_decl_and_attrs() {
    let interner = StringInterner::new();
    let result = parse_ok(
        "[[nomangle]] extern func puts(s: *i8) -> i32;\n\
         [[nodiscard]] func answer() -> i32 { ret 42; }",
        &interner,
    );
    assert!(result.unit.items[0].attrs.nomangle);
    assert!(matches!(
        result.unit.items[0].kind,
        ItemKind::FunctionDecl(_)
    ));
    assert!(result.unit.items[1].attrs.nodiscard);
}

#[test]
fn import_is_top_level_only() {
    let interner = StringInterner::new();
    let ok = parse_source("import \"util\";", &interner);
    assert!(ok.is_ok());

    let bad = parse_source("namespace a { import \"util\"; }", &interner);
    assert!(!bad.is_ok());
}

#[test]
fn pipeline_and_member_calls() {
    let interner = StringInterner::new();
    let result = parse_ok(
        "func f() { obj.method(1); value |> sink(2); }",
        &interner,
    );
    let ItemKind::FunctionDef(def) = &result.unit.items[0].kind else {
        panic!("expected function def");
    };
    let StmtKind::Compound(stmts) = &result.arena.stmt(def.body).kind else {
        panic!("expected compound body");
    };
    let StmtKind::Expr(method_call) = &result.arena.stmt(stmts[0]).kind else {
        panic!("expected expression statement");
    };
    let ExprKind::Call { callee, .. } = &result.arena.expr(*method_call).kind else {
        panic!("expected call");
    };
    assert!(matches!(
        result.arena.expr(*callee).kind,
        ExprKind::Member { .. }
    ));
    let StmtKind::Expr(pipeline) = &result.arena.stmt(stmts[1]).kind else {
        panic!("expected expression statement");
    };
    assert!(matches!(
        result.arena.expr(*pipeline).kind,
        ExprKind::Pipeline { .. }
    ));
}

#[test]
fn two_broken_statements_report_two_errors() {
    let interner = StringInterner::new();
    let result = parse_source(
        "func f() {\n\
         var = 1;\n\
         var ok = 2;\n\
         ret +;\n\
         }",
        &interner,
    );
    assert_eq!(result.errors.len(), 2);
}

#[test]
fn recovery_continues_to_next_item() {
    let interner = StringInterner::new();
    let result = parse_source(
        "func broken( { }\n\
         func fine() -> i32 { ret 1; }",
        &interner,
    );
    assert!(!result.is_ok());
    // The healthy item after the sync point still parses.
    assert!(result
        .unit
        .items
        .iter()
        .any(|i| matches!(&i.kind, ItemKind::FunctionDef(d)
            if interner.lookup(d.decl.name) == "fine")));
}

#[test]
fn empty_statement_accepted() {
    let interner = StringInterner::new();
    assert!(parse_source("func f() { ; ; }", &interner).is_ok());
}

#[test]
fn sizeof_type_and_expr() {
    let interner = StringInterner::new();
    let result = parse_ok(
        "func f() -> u64 { var x = 1; ret sizeof(i32) + sizeof(x); }",
        &interner,
    );
    assert!(result.is_ok());
}
