use anyhow::{Context, Result};
use rowmap::{
    cli::{Cli, Commands},
    compile_file,
    parser::DESCRIPTOR_SUFFIX,
    writer::{render_ddl, render_descriptor, SqliteWriter},
    CompiledUnit,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse_args();

    match cli.command {
        Commands::Compile { args, output } => {
            let start = Instant::now();
            let unit = compile_file(&args.unit, args.options())?;
            print_diagnostics(&unit);

            let out_dir = match output {
                Some(dir) => dir,
                None => unit_dir(&args.unit),
            };
            std::fs::create_dir_all(&out_dir)
                .with_context(|| format!("Failed to create output directory: {:?}", out_dir))?;

            let stem = args
                .unit
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Unit path has no file name")?;

            let descriptor_path = out_dir.join(format!("{}{}", stem, DESCRIPTOR_SUFFIX));
            let descriptor = render_descriptor(&unit).context("Failed to render descriptor")?;
            std::fs::write(&descriptor_path, descriptor)
                .with_context(|| format!("Failed to write: {:?}", descriptor_path))?;

            let ddl_path = out_dir.join(format!("{}.sql", stem));
            std::fs::write(&ddl_path, render_ddl(&unit)?)
                .with_context(|| format!("Failed to write: {:?}", ddl_path))?;

            println!(
                "Compiled {} types into {:?} and {:?} in {:.2}s",
                unit.emitted().count(),
                descriptor_path,
                ddl_path,
                start.elapsed().as_secs_f64()
            );
        }

        Commands::Check { args } => {
            let unit = compile_file(&args.unit, args.options())?;
            print_diagnostics(&unit);
            println!(
                "{:?}: {} types, {} tables, {} diagnostics",
                args.unit,
                unit.emitted().count(),
                unit.tables().count(),
                unit.diagnostics.len()
            );
            if unit.needs_uuid_support {
                println!("  uuid primary keys present");
            }
        }

        Commands::Apply { args, db, replace } => {
            let unit = compile_file(&args.unit, args.options())?;
            print_diagnostics(&unit);

            let mut writer = SqliteWriter::new(&db, replace)?;
            let tables = writer.apply_unit(&unit)?;
            println!("Created {} tables in {:?}", tables, db);
        }

        Commands::ListTypes { args } => {
            let unit = compile_file(&args.unit, args.options())?;
            println!("Types in {:?}:\n", args.unit);
            for def in unit.emitted() {
                if def.is_table() {
                    println!("  {} -> {}", def.name, def.table_name);
                } else {
                    println!("  {} (no table)", def.name);
                }
            }
        }
    }

    Ok(())
}

fn unit_dir(unit: &Path) -> PathBuf {
    match unit.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn print_diagnostics(unit: &CompiledUnit) {
    for diagnostic in &unit.diagnostics {
        println!("warning: {}", diagnostic);
    }
}
