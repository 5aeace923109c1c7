//! Master index custody over on-disk workspaces

use codex_index::{compute_orphans, discover_sub_indexes, IndexStore, OrphanTracker};
use codex_test_utils::{IndexYaml, TempWorkspace};
use pretty_assertions::assert_eq;

fn orphan_includes(ws: &TempWorkspace) -> Vec<String> {
    let store = IndexStore::new();
    let master_path = ws.path("index.codex.yaml");
    let master = store.load(&master_path).unwrap();
    let subs = discover_sub_indexes(ws.root(), &master_path).unwrap();
    compute_orphans(&master.document, &master_path, &subs, &store)
        .into_iter()
        .map(|o| o.include)
        .collect()
}

fn two_books() -> TempWorkspace {
    let ws = TempWorkspace::new();
    IndexYaml::new("root")
        .include("./book-1/index.codex.yaml")
        .include("./book-2/index.codex.yaml")
        .include("./notes.md")
        .write_to(&ws, "index.codex.yaml");
    IndexYaml::new("book-1").include("./ch1.md").write_to(&ws, "book-1/index.codex.yaml");
    IndexYaml::new("book-2").include("./ch1.md").write_to(&ws, "book-2/index.codex.yaml");
    ws.touch("book-1/ch1.md");
    ws.touch("book-2/ch1.md");
    ws.touch("notes.md");
    ws
}

#[test]
fn orphan_detection_scenario() {
    let ws = two_books();
    assert_eq!(orphan_includes(&ws), ["./notes.md"]);
}

#[test]
fn discovery_finds_hidden_indexes_and_skips_master() {
    let ws = two_books();
    IndexYaml::new("drafts").write_to(&ws, "drafts/.index.codex.yaml");
    ws.write("book-1/.index.codex.yaml", "id: stale-cache\n");

    let subs = discover_sub_indexes(ws.root(), &ws.path("index.codex.yaml")).unwrap();
    let paths: Vec<_> = subs.iter().map(|s| s.path.clone()).collect();
    assert_eq!(
        paths,
        [
            ws.path("book-1/index.codex.yaml"),
            ws.path("book-2/index.codex.yaml"),
            ws.path("drafts/.index.codex.yaml"),
        ]
    );
    assert!(subs[2].kind.hidden);
}

#[test]
fn files_claimed_through_sub_index_includes_are_not_orphans() {
    let ws = TempWorkspace::new();
    IndexYaml::new("root")
        .include("./book/index.codex.yaml")
        .include("./shared/map.md")
        .include("./book/ch1.md")
        .include("./loose.md")
        .write_to(&ws, "index.codex.yaml");
    IndexYaml::new("book")
        .include("./ch1.md")
        .include("../shared/map.md")
        .write_to(&ws, "book/index.codex.yaml");
    ws.touch("book/ch1.md");
    ws.touch("shared/map.md");
    ws.touch("loose.md");

    assert_eq!(orphan_includes(&ws), ["./loose.md"]);
}

#[test]
fn orphans_inside_inline_nodes_are_found_once() {
    let ws = TempWorkspace::new();
    IndexYaml::new("root")
        .include("./a.md")
        .inline_with_includes("grp", "Group", &["./a.md", "./b.md", "./book/x.md"])
        .include("./book/index.codex.yaml")
        .write_to(&ws, "index.codex.yaml");
    IndexYaml::new("book").write_to(&ws, "book/index.codex.yaml");

    let store = IndexStore::new();
    let master_path = ws.path("index.codex.yaml");
    let master = store.load(&master_path).unwrap();
    let subs = discover_sub_indexes(ws.root(), &master_path).unwrap();
    let orphans = compute_orphans(&master.document, &master_path, &subs, &store);

    let found: Vec<(&str, Option<&str>)> = orphans
        .iter()
        .map(|o| (o.include.as_str(), o.parent_entity.as_deref()))
        .collect();
    assert_eq!(found, [("./a.md", None), ("./b.md", Some("grp"))]);
}

#[test]
fn sibling_folder_with_shared_prefix_is_not_claimed() {
    let ws = TempWorkspace::new();
    IndexYaml::new("root")
        .include("./book/index.codex.yaml")
        .include("./book-extras/x.md")
        .write_to(&ws, "index.codex.yaml");
    IndexYaml::new("book").write_to(&ws, "book/index.codex.yaml");

    assert_eq!(orphan_includes(&ws), ["./book-extras/x.md"]);
}

#[test]
fn sub_index_including_the_master_back_claims_nothing_through_it() {
    let ws = TempWorkspace::new();
    IndexYaml::new("root")
        .include("./book/index.codex.yaml")
        .include("./notes.md")
        .write_to(&ws, "index.codex.yaml");
    IndexYaml::new("book")
        .include("./ch.md")
        .include("../index.codex.yaml")
        .write_to(&ws, "book/index.codex.yaml");
    ws.touch("book/ch.md");
    ws.touch("notes.md");

    assert_eq!(orphan_includes(&ws), ["./notes.md"]);
}

#[test]
fn tracker_recomputes_only_when_indexes_change() {
    let ws = two_books();
    let store = IndexStore::new();
    let mut tracker = OrphanTracker::new(ws.root(), ws.path("index.codex.yaml"));

    assert!(tracker.refresh(&store).unwrap());
    assert_eq!(tracker.orphans().len(), 1);
    assert!(!tracker.refresh(&store).unwrap());

    IndexYaml::new("notes-home")
        .include("../notes.md")
        .write_to(&ws, "notes-home/index.codex.yaml");
    assert!(tracker.refresh(&store).unwrap());
    assert!(tracker.orphans().is_empty());
    assert_eq!(tracker.sub_indexes().len(), 3);

    std::fs::remove_file(ws.path("notes-home/index.codex.yaml")).unwrap();
    assert!(tracker.refresh(&store).unwrap());
    assert_eq!(tracker.orphans().len(), 1);
}
