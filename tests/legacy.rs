use test_each_file::test_each_file;
use tsal::tsal::{SourceKind, legacy_to_tsal, tsal_to_legacy};
use tsal::{ToTsal, parse_domain, parse_problem};

fn normalized(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn check(content: &str, kind: SourceKind) -> String {
    let converted = legacy_to_tsal(content, kind);
    let back = tsal_to_legacy(&converted, kind);
    // sections may be reordered once, after which conversions are stable
    assert_eq!(normalized(&legacy_to_tsal(&back, kind)), normalized(&converted));
    assert_eq!(normalized(&tsal_to_legacy(&legacy_to_tsal(&back, kind), kind)), normalized(&back));
    if kind == SourceKind::Problem || !derived_after_operators(content) {
        // nothing to reorder: converting back gives the original source, up to whitespace
        assert_eq!(normalized(&back), normalized(content));
    }
    converted
}

fn derived_after_operators(content: &str) -> bool {
    match (content.rfind("(:derived"), [content.find("(:action"), content.find("(:event")].into_iter().flatten().min()) {
        (Some(derived), Some(operator)) => derived > operator,
        _ => false,
    }
}

fn domain(content: &str) {
    let converted = check(content, SourceKind::Domain);
    let dom = parse_domain(converted.as_str()).unwrap_or_else(|e| panic!("{e}\n{converted}"));
    assert!(!dom.actions.is_empty());
    // the parsed domain is printable, and the printed text describes the same domain
    let text = dom.to_tsal().unwrap();
    assert_eq!(parse_domain(text.as_str()).unwrap(), dom);
}

fn problem(content: &str) {
    let converted = check(content, SourceKind::Problem);
    let pb = parse_problem(converted.as_str()).unwrap_or_else(|e| panic!("{e}\n{converted}"));
    assert!(pb.agent().is_ok());
}

test_each_file! { in "./tests/legacy/domains" => domain }
test_each_file! { in "./tests/legacy/problems" => problem }
