use minipar::frontend::{
    analyzer::{check_channels, SymbolKind, SymbolTable, Verdict},
    ast::StmtKind,
    print_tree,
};
use test_case::test_case;

mod common;

#[test_case("float_promotion"; "float promotion")]
#[test_case("loop"; "while loop")]
#[test_case("function_call"; "function call")]
#[test_case("repeated_calls"; "unterminated statements")]
#[test_case("early_return"; "early return")]
#[test_case("matrix"; "nested arrays")]
#[test_case("channels"; "components and channels")]
#[test_case("factorial"; "declarations")]
#[test_case("calculator"; "calculator")]
#[test_case("arrays"; "array assignment")]
fn fixtures_parse_cleanly(name: &str) {
    let (program, diagnostics) = common::parse(name).unwrap();

    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert!(!program.body.is_empty());
}

#[test]
fn par_block_holds_seq() {
    let (program, _) = common::parse("channels").unwrap();

    assert!(matches!(program.body[0].kind, StmtKind::ChannelDecl { .. }));
    assert!(matches!(
        &program.body[1].kind,
        StmtKind::Par(branches) if branches.len() == 1
    ));
    assert!(matches!(program.body[2].kind, StmtKind::Seq(_)));
}

#[test]
fn tree_listing() {
    let (program, _) = common::parse("matrix").unwrap();
    let tree = print_tree(&program);

    assert!(tree.starts_with("Program:\n  Assignment: m =\n    ArrayLiteral: 2 elements\n"));
    assert!(tree.contains("ArrayAccess:"));
}

#[test]
fn symbols_and_channels() {
    let (program, _) = common::parse("channels").unwrap();
    let table = SymbolTable::build(&program);

    assert_eq!(table.get("calc").map(|s| s.kind), Some(SymbolKind::Channel));
    assert_eq!(table.get("x").map(|s| s.kind), Some(SymbolKind::Variable));

    let reports = check_channels(&program);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].verdict(), Verdict::Ok(2));
    assert_eq!(reports[0].send_components, vec!["client".to_string()]);
    assert_eq!(reports[0].recv_components, vec!["server".to_string()]);
}
