//! End-to-end resolution over on-disk workspaces

use codex_index::{Diagnostic, IndexStore, Outcome, SubIndexResolver};
use codex_model::path::normalize;
use codex_model::{for_each_with_chain, NodeKind, NodeStatus};
use codex_test_utils::{IndexYaml, TempWorkspace};
use pretty_assertions::assert_eq;

fn resolve(ws: &TempWorkspace, rel: &str) -> codex_index::Resolution {
    let store = IndexStore::new();
    SubIndexResolver::new(&store).resolve_file(&ws.path(rel)).unwrap()
}

fn simple_chain() -> TempWorkspace {
    let ws = TempWorkspace::new();
    IndexYaml::new("root")
        .include("./book-1/index.codex.yaml")
        .write_to(&ws, "index.codex.yaml");
    IndexYaml::new("book-1")
        .name("Book One")
        .include("./chapter-01.md")
        .write_to(&ws, "book-1/index.codex.yaml");
    ws.touch("book-1/chapter-01.md");
    ws
}

#[test]
fn simple_include_chain() {
    let ws = simple_chain();
    let resolution = resolve(&ws, "index.codex.yaml");

    assert_eq!(resolution.outcome(), Outcome::Succeeded);
    assert_eq!(resolution.children.len(), 1);

    let book = &resolution.children[0];
    assert_eq!(book.kind, NodeKind::SubIndex);
    assert_eq!(book.name, "Book One");
    assert_eq!(book.filename.as_deref(), Some("book-1"));
    assert_eq!(book.subindex_path.as_deref(), Some(ws.path("book-1/index.codex.yaml").as_path()));

    assert_eq!(book.children.len(), 1);
    let chapter = &book.children[0];
    assert_eq!(chapter.filename.as_deref(), Some("chapter-01.md"));
    assert_eq!(chapter.parent_file, ws.path("book-1/index.codex.yaml"));
    assert_eq!(chapter.depth, 1);
}

#[test]
fn inline_overrides_win_over_sub_index_identity() {
    let ws = simple_chain();
    IndexYaml::new("root")
        .include_with("./book-1/index.codex.yaml", &[("name", "First Book"), ("type", "volume")])
        .write_to(&ws, "index.codex.yaml");

    let book = &resolve(&ws, "index.codex.yaml").children[0];
    assert_eq!(book.name, "First Book");
    assert_eq!(book.node_type, "volume");
    assert_eq!(book.id, "book-1");
    assert_eq!(book.filename.as_deref(), Some("book-1"));
}

#[test]
fn circular_reference_terminates_with_one_diagnostic() {
    let ws = TempWorkspace::new();
    IndexYaml::new("a")
        .include("../b/index.codex.yaml")
        .write_to(&ws, "a/index.codex.yaml");
    IndexYaml::new("b")
        .include("../a/index.codex.yaml")
        .include("./b-notes.md")
        .write_to(&ws, "b/index.codex.yaml");
    ws.touch("b/b-notes.md");

    let first = resolve(&ws, "a/index.codex.yaml");
    assert_eq!(first.outcome(), Outcome::SucceededWithDiagnostics(1));
    assert!(matches!(first.diagnostics[0], Diagnostic::CircularReference { .. }));

    assert_eq!(first.children.len(), 1);
    let b = &first.children[0];
    assert_eq!(b.id, "b");
    assert_eq!(b.children.len(), 1);
    assert_eq!(b.children[0].filename.as_deref(), Some("b-notes.md"));

    let second = resolve(&ws, "a/index.codex.yaml");
    assert_eq!(first, second);
}

#[test]
fn self_include_is_skipped() {
    let ws = TempWorkspace::new();
    IndexYaml::new("me")
        .include("./index.codex.yaml")
        .include("./x.md")
        .write_to(&ws, "index.codex.yaml");
    ws.touch("x.md");

    let resolution = resolve(&ws, "index.codex.yaml");
    assert_eq!(resolution.children.len(), 1);
    assert_eq!(resolution.diagnostics.len(), 1);
}

#[test]
fn resolving_twice_is_identical() {
    let ws = simple_chain();
    assert_eq!(resolve(&ws, "index.codex.yaml"), resolve(&ws, "index.codex.yaml"));
}

#[test]
fn paths_come_from_directory_chain_only() {
    let ws = TempWorkspace::new();
    IndexYaml::new("root")
        .include("./book-1/index.codex.yaml")
        .inline_with_includes("extras", "Extras", &["./extras/map.md"])
        .write_to(&ws, "index.codex.yaml");
    IndexYaml::new("book-1")
        .name("The First Book")
        .include("./part-a/.index.codex.yaml")
        .write_to(&ws, "book-1/index.codex.yaml");
    IndexYaml::new("part-a")
        .name("Part A!")
        .include("./scenes/s1.md")
        .write_to(&ws, "book-1/part-a/.index.codex.yaml");
    ws.touch("book-1/part-a/scenes/s1.md");
    ws.touch("extras/map.md");

    let check = |resolution: &codex_index::Resolution| {
        let root_dir = resolution.root_dir().to_path_buf();
        let mut seen = 0;
        for_each_with_chain(&resolution.children, |node, chain| {
            let Some(target) = &node.subindex_path else { return };
            let on_disk = chain.resolve_under(&root_dir);
            match node.kind {
                NodeKind::SubIndex => assert_eq!(Some(on_disk.as_path()), target.parent()),
                _ => assert_eq!(&on_disk, target),
            }
            seen += 1;
        });
        seen
    };

    let before = resolve(&ws, "index.codex.yaml");
    assert_eq!(check(&before), 4);

    IndexYaml::new("book-1")
        .name("Renamed Entirely")
        .include("./part-a/.index.codex.yaml")
        .write_to(&ws, "book-1/index.codex.yaml");
    let after = resolve(&ws, "index.codex.yaml");
    assert_eq!(check(&after), 4);

    let paths = |r: &codex_index::Resolution| {
        let mut out = Vec::new();
        for_each_with_chain(&r.children, |n, chain| out.push((n.subindex_path.clone(), chain.clone())));
        out
    };
    assert_eq!(paths(&before), paths(&after));
}

#[test]
fn json_and_yaml_sub_indexes_mix() {
    let ws = TempWorkspace::new();
    ws.write(
        "index.codex.json",
        r#"{"id":"root","children":[{"include":"./book/index.codex.yaml"},{"include":"./notes/.index.codex.json"}]}"#,
    );
    IndexYaml::new("book").include("./c1.md").write_to(&ws, "book/index.codex.yaml");
    ws.write("notes/.index.codex.json", r#"{"id":"notes","children":[{"include":"./n1.md"}]}"#);
    ws.touch("book/c1.md");
    ws.touch("notes/n1.md");

    let resolution = resolve(&ws, "index.codex.json");
    assert_eq!(resolution.outcome(), Outcome::Succeeded);
    let ids: Vec<&str> = resolution.children.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, ["book", "notes"]);
    assert_eq!(resolution.node_count(), 4);
}

#[test]
fn dangling_includes_become_unresolved_nodes() {
    let ws = TempWorkspace::new();
    IndexYaml::new("root")
        .include("./gone.md")
        .include("./missing/index.codex.yaml")
        .include("./here.md")
        .write_to(&ws, "index.codex.yaml");
    ws.touch("here.md");

    let resolution = resolve(&ws, "index.codex.yaml");
    assert_eq!(resolution.outcome(), Outcome::SucceededWithDiagnostics(2));

    let statuses: Vec<NodeStatus> = resolution.children.iter().map(|n| n.status).collect();
    assert_eq!(statuses, [NodeStatus::Unresolved, NodeStatus::Unresolved, NodeStatus::Resolved]);
    assert_eq!(resolution.children[1].filename.as_deref(), Some("missing"));
    assert_eq!(
        resolution.diagnostics[0].target(),
        normalize(&ws.path("gone.md")).as_path()
    );
}

#[test]
fn keyed_lists_are_sorted_in_the_merged_tree() {
    let ws = TempWorkspace::new();
    IndexYaml::new("root")
        .inline("c", "Charlie")
        .inline_ordered("b", "Bravo", 2)
        .inline_ordered("a", "Alpha", 1)
        .write_to(&ws, "index.codex.yaml");

    let ids: Vec<String> = resolve(&ws, "index.codex.yaml")
        .children
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(ids, ["a", "b", "c"]);
}

#[test]
fn resolved_tree_serializes_for_ui() {
    let ws = simple_chain();
    let resolution = resolve(&ws, "index.codex.yaml");
    let json = serde_json::to_value(&resolution.children).unwrap();
    assert_eq!(json[0]["_filename"], "book-1");
    assert_eq!(json[0]["children"][0]["_depth"], 1);
    assert!(json[0]["_parent_file"].as_str().unwrap().ends_with("index.codex.yaml"));
}
