use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use codex_index::{IndexStore, Outcome, SubIndexResolver};
use codex_model::{NodeStatus, ResolvedNode};
use codex_structure::{MutationError, MutationOp, ParentRef, Workspace};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("codex-index")
        .version(codex_index::VERSION)
        .about("Resolve, inspect, and edit Codex index files")
        .arg_required_else_help(true)
        .arg(
            Arg::new("workspace")
                .long("workspace")
                .short('w')
                .global(true)
                .default_value(".")
                .value_parser(value_parser!(PathBuf))
                .help("Workspace root used for cascades after an edit"),
        )
        .subcommand(
            Command::new("resolve")
                .about("Print the merged tree of an index file")
                .arg(
                    Arg::new("index")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Root index file"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("orphans")
                .about("List master index entries no sub-index claims")
                .arg(
                    Arg::new("root")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Workspace root"),
                ),
        )
        .subcommand(
            Command::new("cascade")
                .about("Regenerate a folder's index and the indexes above it")
                .arg(
                    Arg::new("root")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Workspace root"),
                )
                .arg(
                    Arg::new("folder")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Folder that changed"),
                ),
        )
        .subcommand(
            Command::new("reorder")
                .about("Move an entry to a new position within its list")
                .arg(
                    Arg::new("index")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Index file holding the list"),
                )
                .arg(Arg::new("node").required(true).help("Entry id or include path"))
                .arg(
                    Arg::new("position")
                        .required(true)
                        .value_parser(value_parser!(usize))
                        .help("New zero-based position"),
                )
                .arg(
                    Arg::new("entity")
                        .long("entity")
                        .help("Inline node owning the list"),
                ),
        )
        .subcommand(
            Command::new("move")
                .about("Move an entry to another list, possibly in another index file")
                .arg(Arg::new("node").required(true).help("Entry id or include path"))
                .arg(
                    Arg::new("from")
                        .long("from")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Index file the entry is in"),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Destination index file"),
                )
                .arg(
                    Arg::new("position")
                        .long("position")
                        .default_value("0")
                        .value_parser(value_parser!(usize))
                        .help("Zero-based position in the destination list"),
                )
                .arg(Arg::new("from-entity").long("from-entity").help("Inline node owning the source list"))
                .arg(Arg::new("to-entity").long("to-entity").help("Inline node owning the destination list")),
        )
}

fn main() -> ExitCode {
    match run() {
        Ok(Outcome::Succeeded) => ExitCode::SUCCESS,
        Ok(Outcome::SucceededWithDiagnostics(_)) => ExitCode::from(1),
        Ok(Outcome::Rejected(reason)) => {
            eprintln!("rejected: {reason}");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<Outcome> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("codex=info")))
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("resolve", args)) => resolve(args),
        Some(("orphans", args)) => orphans(args),
        Some(("cascade", args)) => cascade(args),
        Some(("reorder", args)) => {
            let index = path_arg(args, "index")?;
            let op = MutationOp::Reorder {
                parent: parent_ref(index, args.get_one::<String>("entity")),
                key: string_arg(args, "node")?,
                position: *args.get_one::<usize>("position").context("missing position")?,
            };
            apply(args, &op)
        }
        Some(("move", args)) => {
            let op = MutationOp::Move {
                key: string_arg(args, "node")?,
                from: parent_ref(path_arg(args, "from")?, args.get_one::<String>("from-entity")),
                to: parent_ref(path_arg(args, "to")?, args.get_one::<String>("to-entity")),
                position: *args.get_one::<usize>("position").context("missing position")?,
            };
            apply(args, &op)
        }
        _ => {
            cli().print_help()?;
            Ok(Outcome::Succeeded)
        }
    }
}

fn resolve(args: &ArgMatches) -> Result<Outcome> {
    let index = path_arg(args, "index")?;
    let store = IndexStore::new();
    let resolution = SubIndexResolver::new(&store)
        .resolve_file(&index)
        .with_context(|| format!("resolving {}", index.display()))?;
    tracing::debug!(
        index = %index.display(),
        nodes = resolution.node_count(),
        diagnostics = resolution.diagnostics.len(),
        "index resolved"
    );

    if args.get_flag("json") {
        let value = serde_json::json!({
            "id": resolution.root_id,
            "type": resolution.root_type,
            "name": resolution.root_name,
            "_file": resolution.root_path,
            "children": resolution.children,
            "diagnostics": resolution.diagnostics,
            "outcome": resolution.outcome(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{} ({})", resolution.root_name, resolution.root_path.display());
        print_tree(&resolution.children, 1);
        for diagnostic in &resolution.diagnostics {
            eprintln!("warning: {diagnostic}");
        }
    }
    Ok(resolution.outcome())
}

fn print_tree(nodes: &[ResolvedNode], indent: usize) {
    for node in nodes {
        let marker = match node.status {
            NodeStatus::Resolved => "",
            NodeStatus::Unresolved => " [unresolved]",
            NodeStatus::Malformed => " [malformed]",
        };
        println!("{:width$}{} <{}>{marker}", "", node.name, node.node_type, width = indent * 2);
        print_tree(&node.children, indent + 1);
    }
}

fn orphans(args: &ArgMatches) -> Result<Outcome> {
    let root = path_arg(args, "root")?;
    let mut workspace = Workspace::open(&root).with_context(|| format!("opening {}", root.display()))?;
    for orphan in workspace.orphans()? {
        match &orphan.parent_entity {
            Some(entity) => println!("{}\t{}\t(in {entity})", orphan.include, orphan.path.display()),
            None => println!("{}\t{}", orphan.include, orphan.path.display()),
        }
    }
    Ok(Outcome::Succeeded)
}

fn cascade(args: &ArgMatches) -> Result<Outcome> {
    let root = path_arg(args, "root")?;
    let folder = path_arg(args, "folder")?;
    let workspace = Workspace::open(&root).with_context(|| format!("opening {}", root.display()))?;

    tracing::debug!(root = %workspace.root().display(), folder = %folder.display(), "cascade requested");
    let report = workspace.cascade(&folder);
    for regen in &report.regenerated {
        let state = if regen.is_written() { "written" } else { "unchanged" };
        println!("{state}\t{}", regen.index_path.display());
    }
    for failure in &report.failures {
        eprintln!("failed: {failure}");
    }
    Ok(report.outcome())
}

fn apply(args: &ArgMatches, op: &MutationOp) -> Result<Outcome> {
    let root = path_arg(args, "workspace")?;
    let workspace = Workspace::open(&root).with_context(|| format!("opening {}", root.display()))?;

    tracing::debug!(op = %op.kind(), key = op.key(), root = %workspace.root().display(), "applying edit");
    match workspace.apply(op) {
        Ok(applied) => {
            for file in &applied.receipt.touched {
                println!("updated\t{}", file.display());
            }
            for failure in &applied.cascade.failures {
                eprintln!("cascade failed: {failure}");
            }
            Ok(applied.outcome())
        }
        Err(MutationError::Validation(reason)) => {
            tracing::info!(op = %op.kind(), key = op.key(), %reason, "edit rejected");
            Ok(Outcome::Rejected(reason.to_string()))
        }
        Err(e) => Err(e).with_context(|| format!("{} '{}'", op.kind(), op.key())),
    }
}

fn parent_ref(file: PathBuf, entity: Option<&String>) -> ParentRef {
    match entity {
        Some(entity) => ParentRef::entity(file, entity.clone()),
        None => ParentRef::root(file),
    }
}

fn path_arg(args: &ArgMatches, name: &str) -> Result<PathBuf> {
    args.get_one::<PathBuf>(name)
        .cloned()
        .with_context(|| format!("missing argument '{name}'"))
}

fn string_arg(args: &ArgMatches, name: &str) -> Result<String> {
    args.get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing argument '{name}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn move_arguments_parse() {
        let matches = cli()
            .try_get_matches_from(["codex-index", "move", "act-1", "--from", "a/index.codex.yaml", "--to", "b/index.codex.yaml", "--position", "2"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "move");
        assert_eq!(string_arg(args, "node").unwrap(), "act-1");
        assert_eq!(*args.get_one::<usize>("position").unwrap(), 2);
        assert_eq!(path_arg(args, "workspace").unwrap(), PathBuf::from("."));
    }
}
