//! The annotation engine driven by the syntactic oracle, from source text to
//! rewritten file.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anatomist::{Annotator, Exclusion, ParserHost};
use common::AnnotateOptions;
use oracle::{AmbientTypes, SyntacticOracle};
use scribe::SafeWriter;

fn annotator(options: AnnotateOptions) -> Annotator {
    Annotator::new(
        Arc::new(SyntacticOracle::new(AmbientTypes::default())),
        options,
        SafeWriter::new(false),
    )
}

fn annotate_with(options: AnnotateOptions, src: &str) -> String {
    let mut host = ParserHost::new().unwrap();
    let (out, _) = annotator(options)
        .annotate_source(&mut host, Path::new("input.ts"), src.to_string())
        .unwrap();
    out
}

fn annotate(src: &str) -> String {
    annotate_with(AnnotateOptions::default(), src)
}

#[test]
fn test_greet_gets_string() {
    let out = annotate("function greet(name: string) { return 'Hello, ' + name; }");
    assert!(out.contains("function greet(name: string): string {"), "{out}");
}

#[test]
fn test_json_parse_is_left_alone() {
    let src = "function parseData(data: string) { return JSON.parse(data); }";
    let mut host = ParserHost::new().unwrap();
    let (out, plan) = annotator(AnnotateOptions::default())
        .annotate_source(&mut host, Path::new("input.ts"), src.to_string())
        .unwrap();
    assert_eq!(out, src);
    assert_eq!(plan.skipped.get(&Exclusion::AnyType), Some(&1));
}

#[test]
fn test_overload_signatures_untouched() {
    let src = "function f(x: string): string;\nfunction f(x: number): string;\nfunction f(x: any) { return String(x); }\n";
    let out = annotate(src);
    assert_eq!(
        out,
        "function f(x: string): string;\nfunction f(x: number): string;\nfunction f(x: any): string { return String(x); }\n"
    );
}

#[test]
fn test_async_object_and_anonymous_object_policy() {
    let src = "async function load() { return { foo: 'bar' }; }";
    assert!(annotate(src).contains("async function load(): Promise<{ foo: string; }> {"));

    let options = AnnotateOptions {
        ignore_anonymous_objects: true,
        ..Default::default()
    };
    assert_eq!(annotate_with(options, src), src);
}

#[test]
fn test_passthrough_generic() {
    let out = annotate("function identity<T>(value: T) { return value; }");
    assert!(out.contains("function identity<T>(value: T): T {"), "{out}");
}

#[test]
fn test_constructor_setter_and_existing_annotation() {
    let src = "class A {\n  constructor() { this.x = 1; }\n  set v(n: number) { this.n = n; }\n  get v() { return 1; }\n  m(): number { return 2; }\n}\n";
    let out = annotate(src);
    assert!(out.contains("constructor() {"));
    assert!(out.contains("set v(n: number) {"));
    assert!(out.contains("get v(): number {"));
    assert!(out.contains("m(): number {"));
}

#[test]
fn test_arrow_forms() {
    let out = annotate("const double = (n: number) => n * 2;\nconst shout = s => `${s}!`;\n");
    assert!(out.contains("const double = (n: number): number => n * 2;"), "{out}");
    assert!(out.contains("const shout = (s): string => `${s}!`;"), "{out}");
}

#[test]
fn test_unresolved_functions_are_skipped() {
    let src = "import { build } from 'builder';\nfunction make() { return build(); }\n";
    assert_eq!(annotate(src), src);
}

#[test]
fn test_second_run_changes_nothing() {
    let src = "export function area(w: number, h: number) {\n  return w * h;\n}\nexport const tags = () => ['a', 'b'];\n";
    let once = annotate(src);
    assert_ne!(once, src);
    assert_eq!(annotate(&once), once);
}

#[test]
fn test_process_file_rewrites_on_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("math.ts");
    fs::write(&file, "export function half(n: number) { return n / 2; }\n").unwrap();

    let mut host = ParserHost::new().unwrap();
    let report = annotator(AnnotateOptions::default())
        .process_file(&mut host, &file)
        .unwrap();

    assert!(report.written);
    assert_eq!(report.annotated, 1);
    assert_eq!(
        fs::read_to_string(&file).unwrap(),
        "export function half(n: number): number { return n / 2; }\n"
    );
}

#[test]
fn test_ambient_packages_from_manifest() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir_all(tmp.path().join(".git")).unwrap();
    fs::write(
        tmp.path().join("package.json"),
        r#"{ "dependencies": { "dayjs": "1.11.0" } }"#,
    )
    .unwrap();

    let oracle = SyntacticOracle::for_root(tmp.path());
    assert!(oracle.ambient().resolves("dayjs"));

    let annotator = Annotator::new(Arc::new(oracle), AnnotateOptions::default(), SafeWriter::new(true));
    let mut host = ParserHost::new().unwrap();
    let (out, _) = annotator
        .annotate_source(
            &mut host,
            Path::new("input.ts"),
            "import { Dayjs } from 'dayjs';\nfunction now() { return new Dayjs(); }\n".to_string(),
        )
        .unwrap();
    assert!(out.contains("function now(): Dayjs {"), "{out}");
}

#[test]
fn test_user_methods_named_like_builtins_are_left_alone() {
    let src = "class Queue {\n  push(j: string): Promise<void> { return Promise.resolve(); }\n}\nfunction enqueue(q: Queue, j: string) { return q.push(j); }\nfunction lookup(repo: Repo, k: string) { return repo.has(k); }\n";
    assert_eq!(annotate(src), src);
}

#[test]
fn test_map_callback_gets_element_types() {
    let out = annotate("function f(xs: number[]) { return xs.map(x => ({ v: x })); }\n");
    assert!(out.contains("function f(xs: number[]): { v: number; }[] {"), "{out}");
    assert!(out.contains("xs.map((x): { v: number; } => ({ v: x }))"), "{out}");
    assert!(!out.contains("any"), "{out}");
}

#[test]
fn test_switch_returning_in_every_clause() {
    let out = annotate(
        "function label(x: number) {\n  switch (x) {\n    case 1: return 'one';\n    default: return 'many';\n  }\n}\n",
    );
    assert!(out.contains("function label(x: number): \"one\" | \"many\" {"), "{out}");
}
