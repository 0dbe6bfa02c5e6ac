use test_each_file::test_each_file;
use ::tsal::*;

fn render(parsed: &Parsed) -> String {
    let mut text = String::new();
    if let Some(dom) = parsed.domain() {
        text.push_str(&dom.to_tsal().unwrap());
    }
    if let Some(pb) = parsed.problem() {
        text.push_str(&pb.to_tsal().unwrap());
    }
    text
}

fn roundtrip(content: &str) {
    let parsed = parse_source(content).unwrap_or_else(|e| panic!("{e}"));
    let text = render(&parsed);
    let reparsed = parse_source(text.as_str()).unwrap_or_else(|e| panic!("{e}\n{text}"));
    assert_eq!(parsed, reparsed, "{text}");
    // canonical text is a fixed point
    assert_eq!(render(&reparsed), text);
}

test_each_file! { in "./tests/data" => roundtrip }
