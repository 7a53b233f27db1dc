use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use hivekit_types::{NodePath, ValueKind, View};

#[derive(Parser)]
#[command(
    name = "hivekit",
    about = "Inspect and edit a hierarchical configuration store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Snapshot file holding the store
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Namespace view: default, 32 or 64
    #[arg(long, global = true)]
    pub view: Option<View>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a key and any missing parents
    Create(CreateArgs),
    /// Print one value, or every value of a key
    Get(GetArgs),
    /// Create or overwrite a value
    Set(SetArgs),
    /// Delete a value
    DeleteValue(DeleteValueArgs),
    /// Delete a key
    DeleteKey(DeleteKeyArgs),
    /// List subkeys
    List(ListArgs),
    /// Move a key with all values and subkeys
    Move(MoveArgs),
    /// Print a key's whole subtree
    Dump(DumpArgs),
}

impl Command {
    /// Whether the command changes the store and must save it afterwards.
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            Command::Create(_)
                | Command::Set(_)
                | Command::DeleteValue(_)
                | Command::DeleteKey(_)
                | Command::Move(_)
        )
    }
}

#[derive(Args)]
pub struct CreateArgs {
    /// Key path, e.g. HKCU\Software\Vendor
    pub path: NodePath,
}

#[derive(Args)]
pub struct GetArgs {
    pub path: NodePath,
    /// Value name; omit to print every value
    pub name: Option<String>,
}

#[derive(Args)]
pub struct SetArgs {
    pub path: NodePath,
    pub name: String,
    pub value: String,
    /// Value type: string, multi, u32, u64 or blob
    #[arg(long, default_value = "string")]
    pub kind: ValueKind,
}

#[derive(Args)]
pub struct DeleteValueArgs {
    pub path: NodePath,
    pub name: String,
}

#[derive(Args)]
pub struct DeleteKeyArgs {
    pub path: NodePath,
    /// Delete subkeys and values first
    #[arg(long)]
    pub tree: bool,
}

#[derive(Args)]
pub struct ListArgs {
    pub path: NodePath,
    #[arg(short, long)]
    pub recursive: bool,
}

#[derive(Args)]
pub struct MoveArgs {
    pub source: NodePath,
    pub dest: NodePath,
}

#[derive(Args)]
pub struct DumpArgs {
    /// Key to dump; omit to dump every root
    pub path: Option<NodePath>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use hivekit_types::RootKey;

    #[test]
    fn parse_create() {
        let cli = Cli::try_parse_from(["hivekit", "create", "HKCU\\Software\\Test"]).unwrap();
        if let Command::Create(args) = cli.command {
            assert_eq!(args.path.root(), RootKey::CurrentUser);
            assert_eq!(args.path.subkey(), "Software\\Test");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_set_with_kind() {
        let cli = Cli::try_parse_from([
            "hivekit", "set", "HKLM/Software/Test", "Count", "0x10", "--kind", "u32",
        ])
        .unwrap();
        if let Command::Set(args) = cli.command {
            assert_eq!(args.kind, ValueKind::U32);
            assert_eq!(args.value, "0x10");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn set_defaults_to_string() {
        let cli = Cli::try_parse_from(["hivekit", "set", "HKCU\\x", "name", "waffles"]).unwrap();
        if let Command::Set(args) = cli.command {
            assert_eq!(args.kind, ValueKind::String);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "hivekit", "list", "HKCU\\Software", "--view", "32", "--store", "s.json", "-v",
        ])
        .unwrap();
        assert_eq!(cli.view, Some(View::Force32));
        assert_eq!(cli.store, Some(PathBuf::from("s.json")));
        assert!(cli.verbose);
    }

    #[test]
    fn parse_delete_key_tree() {
        let cli = Cli::try_parse_from(["hivekit", "delete-key", "HKCU\\x", "--tree"]).unwrap();
        if let Command::DeleteKey(args) = cli.command {
            assert!(args.tree);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_dump_without_path() {
        let cli = Cli::try_parse_from(["hivekit", "dump"]).unwrap();
        assert!(matches!(cli.command, Command::Dump(DumpArgs { path: None })));
    }

    #[test]
    fn only_writes_mutate() {
        let write = Cli::try_parse_from(["hivekit", "move", "HKCU\\a", "HKCU\\b"]).unwrap();
        assert!(write.command.mutates());
        let read = Cli::try_parse_from(["hivekit", "get", "HKCU\\a"]).unwrap();
        assert!(!read.command.mutates());
    }

    #[test]
    fn bad_root_is_rejected() {
        assert!(Cli::try_parse_from(["hivekit", "create", "HKXX\\Software"]).is_err());
        assert!(Cli::try_parse_from(["hivekit", "list", "HKCU", "--view", "16"]).is_err());
    }
}
