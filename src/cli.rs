use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::compiler::CompileOptions;

#[derive(Parser, Debug)]
#[command(name = "rowmap")]
#[command(version, about = "Compile annotated type descriptions into persistence schemas")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that compiles a unit
#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    /// Unit description (JSON)
    pub unit: PathBuf,

    /// Do not look up missing types in sibling unit files
    #[arg(long)]
    pub no_external: bool,

    /// Fail when an embedded type cannot be found
    #[arg(long)]
    pub strict_embeds: bool,
}

impl CompileArgs {
    pub fn options(&self) -> CompileOptions {
        CompileOptions {
            external_lookup: !self.no_external,
            strict_embedding: self.strict_embeds,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the schema descriptor and DDL of a unit
    Compile {
        #[command(flatten)]
        args: CompileArgs,

        /// Output directory (defaults to the unit's directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compile a unit and report its types and diagnostics
    Check {
        #[command(flatten)]
        args: CompileArgs,
    },

    /// Create the unit's tables in a SQLite database
    Apply {
        #[command(flatten)]
        args: CompileArgs,

        /// SQLite database path
        db: PathBuf,

        /// Remove the database first if it exists
        #[arg(long)]
        replace: bool,
    },

    /// List the types a unit emits and their tables
    ListTypes {
        #[command(flatten)]
        args: CompileArgs,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compile() {
        let cli = Cli::try_parse_from(["rowmap", "compile", "units/person.json", "-o", "out", "--strict-embeds"])
            .unwrap();
        match cli.command {
            Commands::Compile { args, output } => {
                assert_eq!(args.unit, PathBuf::from("units/person.json"));
                assert_eq!(output, Some(PathBuf::from("out")));
                let options = args.options();
                assert!(options.external_lookup);
                assert!(options.strict_embedding);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from(["rowmap", "apply", "unit.json", "app.db", "--replace", "--no-external"])
            .unwrap();
        match cli.command {
            Commands::Apply { args, db, replace } => {
                assert_eq!(db, PathBuf::from("app.db"));
                assert!(replace);
                assert!(!args.options().external_lookup);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_list_types_requires_unit() {
        assert!(Cli::try_parse_from(["rowmap", "list-types"]).is_err());
    }
}
