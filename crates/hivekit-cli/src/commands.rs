use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use hivekit_platform::MemoryPlatform;
use hivekit_store::{Registry, StoreHandle};
use hivekit_types::{NodePath, RootKey, Value, View};
use tracing::debug;

use crate::cli::*;
use crate::config::CliConfig;

/// The loaded store plus the settings a command runs with.
struct Session {
    platform: Arc<MemoryPlatform>,
    registry: Registry,
    store_path: PathBuf,
    view: View,
}

impl Session {
    fn open(cli: &Cli) -> anyhow::Result<Self> {
        let config = CliConfig::resolve(cli.config.as_deref())?;
        let store_path = cli.store.clone().unwrap_or(config.store_path);
        let view = cli.view.unwrap_or(config.view);
        let platform = MemoryPlatform::load_or_new(&store_path, config.platform)
            .with_context(|| format!("loading store {}", store_path.display()))?;
        let platform = Arc::new(platform);
        debug!(store = %store_path.display(), %view, "store opened");
        Ok(Self {
            registry: Registry::new(platform.clone()),
            platform,
            store_path,
            view,
        })
    }

    fn save(&self) -> anyhow::Result<()> {
        self.platform
            .save_snapshot(&self.store_path)
            .with_context(|| format!("saving store {}", self.store_path.display()))
    }

    fn open_key(&self, path: &NodePath, write_access: bool) -> anyhow::Result<StoreHandle> {
        self.registry
            .open_key(path.root(), path.subkey(), write_access, self.view)
            .with_context(|| format!("opening {path}"))
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let session = Session::open(&cli)?;
    let save = cli.command.mutates();
    match cli.command {
        Command::Create(args) => cmd_create(&session, args)?,
        Command::Get(args) => cmd_get(&session, args)?,
        Command::Set(args) => cmd_set(&session, args)?,
        Command::DeleteValue(args) => cmd_delete_value(&session, args)?,
        Command::DeleteKey(args) => cmd_delete_key(&session, args)?,
        Command::List(args) => cmd_list(&session, args)?,
        Command::Move(args) => cmd_move(&session, args)?,
        Command::Dump(args) => cmd_dump(&session, args)?,
    }
    if save {
        session.save()?;
    }
    Ok(())
}

fn display_name(name: &str) -> &str {
    if name.is_empty() {
        "(default)"
    } else {
        name
    }
}

fn read_values(key: &StoreHandle) -> anyhow::Result<Vec<(String, Value)>> {
    let mut names = Vec::new();
    key.enumerate_values(|name, _| {
        names.push(name.to_string());
        true
    })?;
    names
        .into_iter()
        .map(|name| -> anyhow::Result<(String, Value)> {
            let value = key.read_value(&name)?;
            Ok((name, value))
        })
        .collect()
}

fn sorted_children(key: &StoreHandle) -> anyhow::Result<Vec<String>> {
    let mut names = key.sub_key_names()?;
    names.sort_by_key(|name| name.to_lowercase());
    Ok(names)
}

fn print_value(indent: &str, name: &str, value: &Value) {
    println!(
        "{indent}{} {} = {}",
        display_name(name).bold(),
        format!("({})", value.kind().native_name()).dimmed(),
        value
    );
}

fn cmd_create(session: &Session, args: CreateArgs) -> anyhow::Result<()> {
    let subkey = args.path.require_node()?;
    session
        .registry
        .create_key(args.path.root(), subkey, session.view)?;
    println!("{} Created {}", "✓".green().bold(), args.path.to_string().yellow());
    Ok(())
}

fn cmd_get(session: &Session, args: GetArgs) -> anyhow::Result<()> {
    let key = session.open_key(&args.path, false)?;
    match args.name {
        Some(name) => {
            let value = key
                .read_value(&name)
                .with_context(|| format!("reading {} in {}", display_name(&name), args.path))?;
            print_value("", &name, &value);
        }
        None => {
            let values = read_values(&key)?;
            if values.is_empty() {
                println!("{} has no values.", args.path.to_string().yellow());
            }
            for (name, value) in values {
                print_value("", &name, &value);
            }
        }
    }
    Ok(())
}

fn cmd_set(session: &Session, args: SetArgs) -> anyhow::Result<()> {
    let value = Value::parse_as(args.kind, &args.value)?;
    let key = if args.path.is_root() {
        session.open_key(&args.path, true)?
    } else {
        session
            .registry
            .create_key(args.path.root(), args.path.subkey(), session.view)?
    };
    key.write_value(&args.name, value.clone())?;
    println!(
        "{} {}\\{} = {}",
        "✓".green().bold(),
        args.path.to_string().yellow(),
        display_name(&args.name).bold(),
        value
    );
    Ok(())
}

fn cmd_delete_value(session: &Session, args: DeleteValueArgs) -> anyhow::Result<()> {
    let key = session.open_key(&args.path, true)?;
    key.delete_value(&args.name)?;
    println!(
        "Deleted value {} from {}",
        display_name(&args.name).bold(),
        args.path.to_string().yellow()
    );
    Ok(())
}

fn cmd_delete_key(session: &Session, args: DeleteKeyArgs) -> anyhow::Result<()> {
    let subkey = args.path.require_node()?;
    if args.tree {
        session
            .registry
            .delete_tree(args.path.root(), subkey, session.view)?;
    }
    session
        .registry
        .delete_key(args.path.root(), subkey, session.view)?;
    println!("Deleted {}", args.path.to_string().yellow());
    Ok(())
}

fn list_children(key: &StoreHandle, depth: usize, recursive: bool) -> anyhow::Result<()> {
    for name in sorted_children(key)? {
        println!("{}{}", "  ".repeat(depth), name.cyan());
        if recursive {
            let child = key.open_child(&name, false, View::Default)?;
            list_children(&child, depth + 1, true)?;
        }
    }
    Ok(())
}

fn cmd_list(session: &Session, args: ListArgs) -> anyhow::Result<()> {
    let key = session.open_key(&args.path, false)?;
    list_children(&key, 0, args.recursive)
}

fn cmd_move(session: &Session, args: MoveArgs) -> anyhow::Result<()> {
    session.registry.move_key(
        args.source.root(),
        args.source.require_node()?,
        args.dest.root(),
        args.dest.require_node()?,
        session.view,
    )?;
    println!(
        "{} Moved {} → {}",
        "✓".green().bold(),
        args.source.to_string().yellow(),
        args.dest.to_string().yellow()
    );
    Ok(())
}

fn dump_node(key: &StoreHandle, label: &str, depth: usize) -> anyhow::Result<()> {
    let indent = "  ".repeat(depth);
    println!("{indent}{}", label.cyan().bold());
    let value_indent = format!("{indent}  ");
    for (name, value) in read_values(key)? {
        print_value(&value_indent, &name, &value);
    }
    for name in sorted_children(key)? {
        // Children of a handle stay in the handle's view.
        let child = key.open_child(&name, false, View::Default)?;
        dump_node(&child, &name, depth + 1)?;
    }
    Ok(())
}

fn cmd_dump(session: &Session, args: DumpArgs) -> anyhow::Result<()> {
    let paths = match args.path {
        Some(path) => vec![path],
        None => RootKey::ALL
            .iter()
            .map(|&root| NodePath::new(root, ""))
            .collect(),
    };
    for path in paths {
        let key = session.open_key(&path, false)?;
        let info = key.query_info()?;
        if path.is_root() && info.sub_keys == 0 && info.values == 0 {
            continue;
        }
        dump_node(&key, &path.to_string(), 0)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use hivekit_platform::{KeyRef, PlatformStore};
    use hivekit_types::AccessMask;
    use std::path::Path;

    fn run(store: &Path, args: &[&str]) -> anyhow::Result<()> {
        let mut argv = vec!["hivekit", "--store", store.to_str().unwrap()];
        argv.extend_from_slice(args);
        run_command(Cli::try_parse_from(argv)?)
    }

    fn reload(store: &Path) -> Registry {
        Registry::new(Arc::new(MemoryPlatform::load_snapshot(store).unwrap()))
    }

    #[test]
    fn create_set_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store.json");

        run(&store, &["create", "HKCU\\Software\\Test"]).unwrap();
        run(&store, &["set", "HKCU\\Software\\Test", "Count", "0xbeefcafe", "--kind", "u32"]).unwrap();
        run(&store, &["set", "HKCU\\Software\\Test", "Words", "three,blind,mice", "--kind", "multi"]).unwrap();
        run(&store, &["get", "HKCU\\Software\\Test", "Count"]).unwrap();
        run(&store, &["get", "HKCU\\Software\\Test"]).unwrap();

        let registry = reload(&store);
        let key = registry
            .open_key(RootKey::CurrentUser, "Software\\Test", false, View::Default)
            .unwrap();
        assert_eq!(key.read_u32("Count").unwrap(), 0xbeefcafe);
        assert_eq!(key.read_string_array("Words").unwrap(), vec!["three", "blind", "mice"]);
    }

    #[test]
    fn read_commands_do_not_create_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store.json");
        run(&store, &["dump"]).unwrap();
        assert!(!store.exists());
    }

    #[test]
    fn move_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store.json");

        run(&store, &["set", "HKCU\\Software\\Old\\Child", "v", "1", "--kind", "u64"]).unwrap();
        run(&store, &["move", "HKCU\\Software\\Old", "HKLM\\Software\\New"]).unwrap();
        run(&store, &["list", "HKLM\\Software", "--recursive"]).unwrap();

        let registry = reload(&store);
        let moved = registry
            .open_key(RootKey::LocalMachine, "Software\\New\\Child", false, View::Default)
            .unwrap();
        assert_eq!(moved.read_u64("v").unwrap(), 1);
        assert!(registry
            .open_key(RootKey::CurrentUser, "Software\\Old", false, View::Default)
            .is_err());

        // A key with children needs --tree.
        assert!(run(&store, &["delete-key", "HKLM\\Software\\New"]).is_err());
        run(&store, &["delete-key", "HKLM\\Software\\New", "--tree"]).unwrap();
        let platform = MemoryPlatform::load_snapshot(&store).unwrap();
        assert!(platform
            .open_key(KeyRef::Root(RootKey::LocalMachine), "Software\\New", AccessMask::READ)
            .is_err());
    }

    #[test]
    fn delete_value_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store.json");
        run(&store, &["set", "HKCU\\Software\\Test", "name", "waffles"]).unwrap();
        run(&store, &["delete-value", "HKCU\\Software\\Test", "name"]).unwrap();
        run(&store, &["delete-value", "HKCU\\Software\\Test", "name"]).unwrap();
        assert!(run(&store, &["get", "HKCU\\Software\\Test", "name"]).is_err());
    }

    #[test]
    fn views_are_separate_namespaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store.json");
        run(&store, &["--view", "32", "create", "HKLM\\Software\\Wow"]).unwrap();
        run(&store, &["--view", "32", "get", "HKLM\\Software\\Wow"]).unwrap();
        assert!(run(&store, &["--view", "64", "get", "HKLM\\Software\\Wow"]).is_err());
    }

    #[test]
    fn config_file_supplies_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("configured.json");
        let config = dir.path().join("hivekit.toml");
        std::fs::write(
            &config,
            format!("store_path = {:?}\nview = \"Force64\"\n", store.to_str().unwrap()),
        )
        .unwrap();
        let cli = Cli::try_parse_from([
            "hivekit",
            "--config",
            config.to_str().unwrap(),
            "create",
            "HKCU\\Software\\FromConfig",
        ])
        .unwrap();
        run_command(cli).unwrap();

        let platform = MemoryPlatform::load_snapshot(&store).unwrap();
        assert!(platform
            .open_key(
                KeyRef::Root(RootKey::CurrentUser),
                "Software\\FromConfig",
                AccessMask::READ | AccessMask::WOW64_64KEY,
            )
            .is_ok());
    }

    #[test]
    fn invalid_value_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store.json");
        assert!(run(&store, &["set", "HKCU\\Software\\Test", "n", "banana", "--kind", "u32"]).is_err());
        assert!(run(&store, &["create", "HKCU"]).is_err());
    }
}
