//! Flame evolve CLI - Breed fractal flame genomes stored as JSON documents.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use flame_evolve::{
    animation::LinearInterpolator,
    compute::{ChaosGame, PaletteCatalog, VariationCatalog, evolution::Breeder},
    schema::{BreederConfig, Genome, GenomeDocument, read_document, write_document},
};

type CliBreeder = Breeder<ChaosGame, LinearInterpolator>;

fn usage(program: &str) -> ! {
    eprintln!("Usage: {program} [--config <config.json>] <command> [args]");
    eprintln!();
    eprintln!("Breed fractal flame genomes from JSON genome documents.");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  random <out.json> [count]              Random genome (optionally with count xforms)");
    eprintln!("  mutate <in.json> <out.json> [mode]     Mutate the first genome");
    eprintln!("  cross <a.json> <b.json> <out.json> [mode]");
    eprintln!("                                         Cross the first genomes of two documents");
    eprintln!("  improve <in.json> <out.json> [tries]   Hill-climb color coordinates");
    eprintln!("  spin <in.json> <out.json> [frames]     Rotation loop plus transitions between genomes");
    eprintln!("  bounds <in.json>                       Trimmed bounding box of each genome");
    eprintln!();
    eprintln!("Example configuration is printed with the --example flag.");
    std::process::exit(1);
}

fn fail(context: &str, e: impl std::fmt::Display) -> ! {
    eprintln!("Error {context}: {e}");
    std::process::exit(1);
}

fn load_genomes(path: &str) -> Vec<Genome> {
    let genomes = read_document(path)
        .unwrap_or_else(|e| fail(&format!("reading {path}"), e))
        .into_genomes();
    if genomes.is_empty() {
        fail(&format!("reading {path}"), "document holds no genomes");
    }
    genomes
}

fn load_first(path: &str) -> Genome {
    load_genomes(path).swap_remove(0)
}

fn save(path: &str, genomes: Vec<Genome>) {
    write_document(path, &GenomeDocument::new(genomes))
        .unwrap_or_else(|e| fail(&format!("writing {path}"), e));
    println!("Wrote {path}");
}

fn parse_arg<T: std::str::FromStr>(arg: Option<&String>, name: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    arg.map(|s| {
        s.parse()
            .unwrap_or_else(|e| fail(&format!("parsing {name} '{s}'"), e))
    })
}

fn build_breeder(config: BreederConfig) -> CliBreeder {
    let variations = Arc::new(VariationCatalog::builtin());
    let palettes = Arc::new(PaletteCatalog::builtin());
    let seed = config.seed.unwrap_or_else(rand::random);
    let renderer = ChaosGame::new(Arc::clone(&variations), seed);
    Breeder::new(
        BreederConfig {
            seed: Some(seed),
            ..config
        },
        variations,
        palettes,
        renderer,
        LinearInterpolator,
    )
    .unwrap_or_else(|e| fail("creating breeder", e))
}

fn main() {
    env_logger::init();

    let mut args: Vec<String> = std::env::args().collect();
    let program = args.first().cloned().unwrap_or_else(|| "flame-evolve".into());

    if args.get(1).is_some_and(|a| a == "--example") {
        print_example_config();
        return;
    }

    let mut config = BreederConfig::default();
    if args.get(1).is_some_and(|a| a == "--config") {
        let Some(path) = args.get(2).cloned() else {
            usage(&program);
        };
        let text = fs::read_to_string(Path::new(&path))
            .unwrap_or_else(|e| fail("reading config file", e));
        config = serde_json::from_str(&text).unwrap_or_else(|e| fail("parsing config", e));
        args.drain(1..3);
    }

    if args.len() < 2 {
        usage(&program);
    }

    let mut breeder = build_breeder(config);
    let start = Instant::now();

    match (args[1].as_str(), &args[2..]) {
        ("random", [out, rest @ ..]) => {
            let count = parse_arg(rest.first(), "count");
            let genome = breeder.random_genome(count);
            println!("Random genome with {} xforms", genome.xforms.len());
            save(out, vec![genome]);
        }
        ("mutate", [input, out, rest @ ..]) => {
            let mut genome = load_first(input);
            let mode = parse_arg(rest.first(), "mutation mode");
            let description = breeder
                .mutate(&mut genome, mode, 0)
                .unwrap_or_else(|e| fail("mutating", e));
            println!("{description}");
            save(out, vec![genome]);
        }
        ("cross", [a, b, out, rest @ ..]) => {
            let (p0, p1) = (load_first(a), load_first(b));
            let mode = parse_arg(rest.first(), "cross mode");
            let (child, description) = breeder.cross(&p0, &p1, mode);
            println!("{description}");
            save(out, vec![child]);
        }
        ("improve", [input, out, rest @ ..]) => {
            let mut genome = load_first(input);
            let tries = parse_arg(rest.first(), "tries")
                .unwrap_or(breeder.config().mutation.color_coord_tries);
            let resolution = breeder.config().mutation.color_resolution;
            let score = breeder
                .improve_colors(&mut genome, tries, false, resolution)
                .unwrap_or_else(|e| fail("improving colors", e));
            println!("Color score: {score:.6}");
            save(out, vec![genome]);
        }
        ("spin", [input, out, rest @ ..]) => {
            let genomes = load_genomes(input);
            let frames: usize = parse_arg(rest.first(), "frames").unwrap_or(10).max(1);
            let mut sequence = Vec::new();
            let mut frame = 0.0;
            for (i, genome) in genomes.iter().enumerate() {
                for f in 0..frames {
                    let blend = f as f64 / frames as f64;
                    sequence.push(breeder.spin(frame, genome, blend));
                    frame += 1.0;
                }
                if let Some(next) = genomes.get(i + 1) {
                    let pair = [genome.clone(), next.clone()];
                    for f in 0..frames {
                        let blend = f as f64 / frames as f64;
                        sequence.push(breeder.spin_inter(frame, &pair, blend, f == 0));
                        frame += 1.0;
                    }
                }
            }
            println!("{} frames", sequence.len());
            save(out, sequence);
        }
        ("bounds", [input]) => {
            for genome in load_genomes(input) {
                match breeder.estimate_bounds(&genome) {
                    Ok(bb) => println!(
                        "{}: [{:.6}, {:.6}] x [{:.6}, {:.6}]",
                        genome.name, bb.min.x, bb.max.x, bb.min.y, bb.max.y
                    ),
                    Err(e) => eprintln!("{}: {e}", genome.name),
                }
            }
        }
        _ => usage(&program),
    }

    println!("Time: {:.2}s", start.elapsed().as_secs_f32());
}

fn print_example_config() {
    let config = BreederConfig {
        seed: Some([1, 2, 3]),
        ..Default::default()
    };

    println!("Example configuration (config.json):");
    println!("{}", serde_json::to_string_pretty(&config).unwrap());
}
