use super::*;
use std::fs;
use tempfile::TempDir;

fn extractor() -> Extractor {
    Extractor::new(ExtractionConfig::default()).unwrap()
}

fn line_count(content: &str) -> usize {
    content.split('\n').count()
}

fn assert_bounds(sections: &[Section], content: &str) {
    for s in sections {
        assert!(!s.name.is_empty());
        assert!(s.start_line >= 1, "{:?}", s);
        assert!(s.start_line <= s.end_line, "{:?}", s);
        assert!(s.end_line <= line_count(content), "{:?}", s);
    }
}

#[test]
fn test_function_on_single_line() {
    let content = "function handleClick() { doThing(); }";
    let sections = extractor().extract_file("src/app.js", content);

    let functions: Vec<&Section> = sections
        .iter()
        .filter(|s| s.kind == SectionKind::Function)
        .collect();
    assert_eq!(functions.len(), 1);
    assert_eq!(functions[0].name, "handleClick");
    assert_eq!(functions[0].start_line, 1);
    assert_eq!(functions[0].end_line, 1);
    assert_eq!(functions[0].body, content);
    assert_eq!(
        functions[0].attributes.get("pattern_type").map(String::as_str),
        Some("function")
    );
    assert_eq!(
        functions[0].attributes.get("file_extension").map(String::as_str),
        Some(".js")
    );
}

#[test]
fn test_css_class_rule() {
    let sections = extractor().extract_file("styles/main.css", ".btn-primary { color: red; }");
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].kind, SectionKind::CssClass);
    assert_eq!(sections[0].name, "btn-primary");
    assert_eq!((sections[0].start_line, sections[0].end_line), (1, 1));
}

#[test]
fn test_start_line_counts_preceding_newlines() {
    let content = "/* theme */\n\n.card {\n  padding: 0;\n}\n";
    let sections = extractor().extract_file("card.scss", content);
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].start_line, 3);
    assert_eq!(sections[0].end_line, 5);
    assert_eq!(sections[0].body, ".card {\n  padding: 0;\n}");
}

#[test]
fn test_sections_respect_line_bounds() {
    let content = r#"import React from 'react';

export const Card = (props) => {
  return <div>{props.title}</div>;
};

function helper(a, b) {
  return a + b;
}

class Store {
  constructor() {}
}
"#;
    let sections = extractor().extract_file("src/Card.jsx", content);
    assert_bounds(&sections, content);

    let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
    assert!(names.contains(&"Card"));
    assert!(names.contains(&"helper"));
    assert!(names.contains(&"Store"));

    let helper = sections
        .iter()
        .find(|s| s.name == "helper" && s.kind == SectionKind::Function)
        .unwrap();
    assert_eq!((helper.start_line, helper.end_line), (7, 9));
}

#[test]
fn test_whole_file_fallback() {
    let content = "<div>hello</div>\n<p>world</p>\n";
    let sections = extractor().extract_file("templates/page.html", content);
    assert_eq!(sections.len(), 1);

    let s = &sections[0];
    assert_eq!(s.kind, SectionKind::File);
    assert_eq!(s.name, "page");
    assert_eq!(s.start_line, 1);
    assert_eq!(s.end_line, 3);
    assert_eq!(s.body, content);
    assert_eq!(
        s.attributes.get("file_extension").map(String::as_str),
        Some(".html")
    );
    assert!(!s.attributes.contains_key("pattern_type"));
}

#[test]
fn test_blank_file_yields_nothing() {
    assert!(extractor().extract_file("empty.js", "").is_empty());
    assert!(extractor().extract_file("blank.js", "  \n\t\n").is_empty());
}

#[test]
fn test_unnamed_rule_uses_stem_and_kind() {
    let content = "<div></div>\n{% schema %}\n{\"name\": \"Hero\"}\n{% endschema %}";
    let sections = extractor().extract_file("sections/hero-banner.liquid", content);
    let schema = sections
        .iter()
        .find(|s| s.kind == SectionKind::LiquidSection)
        .unwrap();
    assert_eq!(schema.name, "hero-banner_liquid_section");
    // `{% schema %}` balances its own braces
    assert_eq!(schema.start_line, 2);
    assert_eq!(schema.end_line, 2);
    assert_bounds(&sections, content);
}

#[test]
fn test_body_is_capped_with_marker() {
    let inner = format!("  prop: {};\n", "v".repeat(200)).repeat(100);
    let content = format!(".huge {{\n{}}}", inner);
    let sections = extractor().extract_file("huge.css", &content);

    let huge = sections.iter().find(|s| s.name == "huge").unwrap();
    assert!(huge.body.chars().count() <= 5000);
    assert!(huge.body.ends_with(TRUNCATION_MARKER));
    assert_eq!(huge.end_line, 102);
}

#[test]
fn test_whole_file_body_is_capped() {
    let content = "plain text line\n".repeat(1000);
    let mut config = ExtractionConfig::default();
    config.max_section_chars = 200;
    let sections = Extractor::new(config)
        .unwrap()
        .extract_file("notes.vue", &content);

    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].end_line, 1001);
    assert_eq!(sections[0].body.chars().count(), 200);
    assert!(sections[0].body.ends_with(TRUNCATION_MARKER));
}

#[test]
fn test_truncate_with_marker() {
    assert_eq!(truncate_with_marker("short", 10), "short");
    let cut = truncate_with_marker(&"a".repeat(100), 40);
    assert_eq!(cut.chars().count(), 40);
    assert!(cut.starts_with("aaaa"));
    assert!(cut.ends_with(TRUNCATION_MARKER));

    // multi-byte characters are counted, not bytes
    let cut = truncate_with_marker(&"é".repeat(100), 50);
    assert_eq!(cut.chars().count(), 50);

    assert_eq!(truncate_with_marker("abcdefgh", 3), "abc");
}

#[test]
fn test_custom_registry_and_extent() {
    struct SingleLine;
    impl ExtentFinder for SingleLine {
        fn find_extent(&self, lines: &[&str], start_line: usize) -> Extent {
            Extent {
                body: lines[start_line - 1].to_string(),
                end_line: start_line,
            }
        }
    }

    let registry = PatternRegistry::empty()
        .with_rule(SectionKind::Custom("todo".into()), &[r"TODO\((\w+)\)"])
        .unwrap();
    let extractor = extractor()
        .with_registry(registry)
        .with_extent_finder(SingleLine);

    let content = "fn a() {\n// TODO(alice): fix\n}\n";
    let sections = extractor.extract_file("lib.rs", content);
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].kind.as_str(), "todo");
    assert_eq!(sections[0].name, "alice");
    assert_eq!((sections[0].start_line, sections[0].end_line), (2, 2));
}

#[test]
fn test_extract_tree_orders_by_path_and_tolerates_bad_bytes() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("node_modules/lib")).unwrap();

    fs::write(root.join("src/b.css"), ".b { color: blue; }").unwrap();
    fs::write(root.join("src/a.js"), b"function ok() { return 1; }\n\xff\xfe\n").unwrap();
    fs::write(root.join("node_modules/lib/x.js"), "function hidden() {}").unwrap();
    fs::write(root.join("README.md"), "# docs").unwrap();

    let output = extractor().extract_tree(root).unwrap();
    assert_eq!(output.files_scanned, 2);
    assert_eq!(output.files_failed, 0);

    let files: Vec<&str> = output
        .sections
        .iter()
        .map(|s| s.file_path.as_str())
        .collect();
    assert!(files.iter().all(|f| *f == "src/a.js" || *f == "src/b.css"));
    let first_css = files.iter().position(|f| *f == "src/b.css").unwrap();
    assert!(files[..first_css].iter().all(|f| *f == "src/a.js"));

    let ok = output
        .sections
        .iter()
        .find(|s| s.kind == SectionKind::Function)
        .unwrap();
    assert_eq!(ok.name, "ok");
    assert_eq!(ok.end_line, 1);
}

#[test]
fn test_extract_tree_isolates_panicking_file() {
    struct ExplodingExtent;
    impl ExtentFinder for ExplodingExtent {
        fn find_extent(&self, lines: &[&str], start_line: usize) -> Extent {
            if lines[start_line - 1].contains("explode") {
                panic!("extent scan failed");
            }
            BraceBalanceExtent::default().find_extent(lines, start_line)
        }
    }

    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("bad.css"), ".explode { color: red; }\n").unwrap();
    fs::write(root.join("good.css"), ".card { padding: 0; }\n").unwrap();

    let output = extractor()
        .with_extent_finder(ExplodingExtent)
        .extract_tree(root)
        .unwrap();
    assert_eq!(output.files_scanned, 2);
    assert_eq!(output.files_failed, 1);
    assert_eq!(output.sections.len(), 1);
    assert_eq!(output.sections[0].file_path, "good.css");
    assert_eq!(output.sections[0].name, "card");
}

#[cfg(unix)]
#[test]
fn test_extract_tree_skips_unreadable_file() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let locked = root.join("locked.css");
    fs::write(&locked, ".secret { color: red; }\n").unwrap();
    fs::write(root.join("open.css"), ".card { padding: 0; }\n").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users read through mode 000
    if fs::read(&locked).is_ok() {
        return;
    }

    let output = extractor().extract_tree(root).unwrap();
    assert_eq!(output.files_scanned, 2);
    assert_eq!(output.files_failed, 1);
    assert_eq!(output.sections.len(), 1);
    assert_eq!(output.sections[0].file_path, "open.css");
    assert_eq!(output.sections[0].name, "card");

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
}

#[test]
fn test_extract_tree_missing_root() {
    let result = extractor().extract_tree(Path::new("/nonexistent/section-rag-root"));
    assert!(matches!(result, Err(ExtractionError::RootNotFound(_))));
}
