//! hgeo CLI - Tool for inspecting and converting geometry documents.

use std::env;
use std::process::ExitCode;

use hgeo::io::SaveOptions;
use hgeo::Detail;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "info";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            _ => filtered_args.push(arg),
        }
    }
    init_tracing(level);

    let Some(&command) = filtered_args.first() else {
        print_help();
        return ExitCode::SUCCESS;
    };

    let result = match command {
        // Info command - summary of each file
        "info" | "i" => {
            if filtered_args.len() < 2 {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: hgeo info <file>...");
                return ExitCode::FAILURE;
            }
            filtered_args[1..].iter().try_for_each(|path| cmd_info(path))
        }

        // Convert command - load and re-save
        "convert" | "c" => {
            let files: Vec<&str> = filtered_args[1..]
                .iter()
                .copied()
                .filter(|a| !a.starts_with("--"))
                .collect();
            if files.len() != 2 {
                eprintln!("Error: expected input and output files");
                eprintln!("Usage: hgeo convert <in> <out> [--pretty] [--gzip]");
                return ExitCode::FAILURE;
            }
            let pretty = filtered_args.contains(&"--pretty");
            let gzip = filtered_args.contains(&"--gzip");
            cmd_convert(files[0], files[1], pretty, gzip)
        }

        "help" | "h" | "--help" | "-h" => {
            print_help();
            Ok(())
        }

        other => {
            eprintln!("Unknown command: {}", other);
            print_help();
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Install the fmt subscriber. `RUST_LOG` overrides the flag level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_help() {
    println!("hgeo - Geometry document toolkit");
    println!();
    println!("USAGE:");
    println!("    hgeo [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info    <file>...            Show counts, attributes, groups, primitives");
    println!("    c, convert <in> <out>           Load and re-save in expanded form");
    println!("    h, help                         Show this help");
    println!();
    println!("CONVERT OPTIONS:");
    println!("    --pretty         Indent the JSON output");
    println!("    --gzip           Gzip the output (implied for *.gz)");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Only show errors");
    println!();
    println!("Set RUST_LOG to override the log filter.");
}

fn cmd_info(path: &str) -> hgeo::Result<()> {
    info!("Opening document: {}", path);
    let detail = Detail::open(path)?;
    debug!("Document loaded");

    println!("Document: {}", path);
    print!("{}", detail.summary());

    // Walk the first primitive down to point positions.
    if let Some(prim) = detail.primitives.first() {
        println!();
        println!("Primitive 0 ({}):", prim.kind().name());
        for (i, &vertex) in prim.vertices.iter().enumerate() {
            let point = detail.vertex_point(vertex);
            let position = point.and_then(|p| detail.point_position(p));
            match (point, position) {
                (Some(p), Some(pos)) => {
                    println!("  [{}] vertex {} -> point {} -> {}", i, vertex, p, pos)
                }
                (Some(p), None) => println!("  [{}] vertex {} -> point {}", i, vertex, p),
                _ => println!("  [{}] vertex {}", i, vertex),
            }
        }
    }
    println!();
    Ok(())
}

fn cmd_convert(input: &str, output: &str, pretty: bool, gzip: bool) -> hgeo::Result<()> {
    info!("Converting {} -> {}", input, output);
    let detail = Detail::open(input)?;

    let mut options = SaveOptions::for_path(output).with_pretty(pretty);
    if gzip && options.compression == 0 {
        options = options.with_compression(hgeo::io::DEFAULT_COMPRESSION);
    }
    detail.save(output, &options)?;

    info!(
        "Wrote {} points, {} vertices, {} primitives",
        detail.point_count(),
        detail.vertex_count(),
        detail.primitive_count()
    );
    Ok(())
}
