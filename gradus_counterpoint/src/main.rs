// CLI entry point for the counterpoint composer.
//
// Builds a starting score from a cantus firmus and a set of generated
// voices, wires the default rule catalogue, and runs the solver. The result
// is printed as text, one voice per line; `--json` also emits a structured
// form.
//
// Usage:
//   compose [OPTIONS]
//     --cantus "<PITCHES>"   Whole-note cantus, e.g. "c3 d3 e3 g3 f3 d3 c3".
//                            An empty string drops the cantus voice.
//     --cantus-clef <CLEF>   treble | treble8vb | alto | bass (default: bass)
//     --voices <LIST>        Comma list of role:species, e.g. "alto:1,tenor:2"
//                            (default: alto:1)
//     --root <PITCH>         Scale root (default: c0)
//     --minor                Compose in the complete minor scale
//     --harmony              Solve a chord background and compose against it
//     --measures <N>         Target measures (default: cantus length)
//     --measure-length <N>   Whole units per measure (default: 4)
//     --reward <F>           Search reward per advanced unit (default: 250)
//     --limit-steps <N>      Give up after N expansions
//     --timeout <SECS>       Give up after a wall-clock limit
//     --json <FILE>          Write the result as JSON ("-" for stdout)

use std::io::Write;
use std::time::{Duration, Instant};

use log::info;
use serde_json::json;

use gradus_core::time::whole;
use gradus_core::{Pitch, Scale};

use gradus_counterpoint::rules::DegreeMatrix;
use gradus_counterpoint::{
    CandidateRule, Clef, CounterpointContext, CounterpointSolver, HarmonyRule, LocalRule,
    OrnamentRules, Parameters, RewardStrategy, Score, ScoreBuilder, Species,
};

struct Config {
    cantus: Vec<Pitch>,
    cantus_clef: Clef,
    voices: Vec<(Role, u32)>,
    root: Pitch,
    minor: bool,
    harmony: bool,
    measures: Option<usize>,
    measure_length: i64,
    reward: f64,
    limit_steps: Option<u64>,
    timeout: Option<u64>,
    json: Option<String>,
}

#[derive(Clone, Copy)]
enum Role {
    Soprano,
    Alto,
    Tenor,
    Bass,
}

impl Default for Config {
    fn default() -> Config {
        let cantus = ["c3", "d3", "e3", "g3", "f3", "d3", "c3"]
            .iter()
            .map(|ex| parse_pitch(ex))
            .collect();
        Config {
            cantus,
            cantus_clef: Clef::Bass,
            voices: vec![(Role::Alto, 1)],
            root: parse_pitch("c0"),
            minor: false,
            harmony: false,
            measures: None,
            measure_length: 4,
            reward: 250.0,
            limit_steps: None,
            timeout: None,
            json: None,
        }
    }
}

fn main() {
    env_logger::init();
    let config = parse_args();

    let target = config
        .measures
        .unwrap_or(if config.cantus.is_empty() { 8 } else { config.cantus.len() });
    let (ctx, scale) = build_context(&config, target);

    let mut builder = ScoreBuilder::new(&ctx, scale);
    for &(role, species) in &config.voices {
        let species = std::sync::Arc::new(species_for(species));
        builder = match role {
            Role::Soprano => builder.soprano(species),
            Role::Alto => builder.alto(species),
            Role::Tenor => builder.tenor(species),
            Role::Bass => builder.bass(species),
        };
    }
    if !config.cantus.is_empty() {
        builder = builder.whole_note_cantus(config.cantus_clef, &config.cantus);
    }
    let score = builder.build();

    let mut solver = CounterpointSolver::new(ctx);
    solver.limit_steps = config.limit_steps;
    solver.deadline = config.timeout.map(|s| Instant::now() + Duration::from_secs(s));
    solver.on_progress = Some(Box::new(|p| {
        info!(
            "measure {}/{} (furthest {}), {} expansions",
            p.measure_index, p.total_measures, p.furthest, p.iteration
        );
    }));

    let Some(result) = solver.solve(score, RewardStrategy::Constant(config.reward)) else {
        eprintln!("No solution found.");
        std::process::exit(2);
    };

    println!("{result}");
    if let Some(path) = &config.json {
        write_json(&result, path);
    }
}

/// The default rule catalogue for the chosen mode.
fn build_context(config: &Config, target: usize) -> (CounterpointContext, Scale) {
    let params = Parameters { measure_length: whole(config.measure_length) };
    let mut ctx = CounterpointContext::new(target, params);

    if config.minor {
        ctx.candidate_rules_before.push(CandidateRule::MinorResolution { root: config.root });
    } else {
        ctx.candidate_rules_before.push(CandidateRule::ScaleTones);
        ctx.candidate_rules_before
            .push(CandidateRule::DirectionalDegreeMatrix(DegreeMatrix::major()));
    }
    ctx.candidate_rules_before.extend([
        CandidateRule::PassingToneContinuation,
        CandidateRule::NeighborResolution,
        CandidateRule::SuspensionResolution,
    ]);
    ctx.candidate_rules_after.extend([
        CandidateRule::MelodyIntervals,
        CandidateRule::LeapPreparationBefore,
        CandidateRule::LeapPreparationAfter,
    ]);

    if config.harmony {
        ctx.harmony_rules.push(HarmonyRule::ValidChords);
        ctx.harmonic_tone_rules.push(CandidateRule::ChordTone);
    } else {
        ctx.harmonic_tone_rules.push(CandidateRule::VerticalConsonanceStrict);
    }
    ctx.ornament_rules = OrnamentRules {
        passing: vec![CandidateRule::MakePassingTone],
        neighbor: vec![CandidateRule::MakeNeighborTone],
        suspension: vec![CandidateRule::MakeSuspension],
    };
    ctx.local_rules.extend([
        LocalRule::ForbidVoiceOverlap,
        LocalRule::ForbidPerfectsBySimilarMotion,
        LocalRule::ForbidNearbyPerfects,
        LocalRule::LimitConsecutiveLeaps,
        LocalRule::PrioritizeVoiceMotion,
    ]);

    let scale = if config.minor {
        Scale::complete_minor(config.root)
    } else {
        Scale::major(config.root)
    };
    (ctx, scale)
}

fn species_for(n: u32) -> Species {
    match n {
        1 => Species::first(),
        2 => Species::second(),
        3 => Species::third(),
        4 => Species::fourth(),
        5 => Species::fifth(),
        other => {
            eprintln!("Unknown species: {other} (expected 1-5)");
            std::process::exit(1);
        }
    }
}

fn write_json(score: &Score, path: &str) {
    let value = json!({
        "parameters": score.parameters,
        "voices": score.voices.iter().map(|v| json!({
            "name": v.name,
            "clef": v.clef,
            "generated": v.is_generated(),
            "measures": v.measures.iter()
                .map(|m| m.notes.clone())
                .collect::<Vec<_>>(),
        })).collect::<Vec<_>>(),
        "harmony": score.harmony.chords,
    });
    let out = match serde_json::to_string_pretty(&value) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to serialize score: {e}");
            std::process::exit(1);
        }
    };
    if path == "-" {
        let mut stdout = std::io::stdout();
        let _ = writeln!(stdout, "{out}");
    } else if let Err(e) = std::fs::write(path, out) {
        eprintln!("Failed to write {path}: {e}");
        std::process::exit(1);
    }
}

fn parse_pitch(ex: &str) -> Pitch {
    ex.parse().unwrap_or_else(|_| {
        eprintln!("Invalid pitch: {ex}");
        std::process::exit(1);
    })
}

fn parse_clef(ex: &str) -> Clef {
    match ex {
        "treble" => Clef::Treble,
        "treble8vb" => Clef::Treble8vb,
        "alto" => Clef::Alto,
        "bass" => Clef::Bass,
        other => {
            eprintln!("Unknown clef: {other}");
            std::process::exit(1);
        }
    }
}

fn parse_voices(ex: &str) -> Vec<(Role, u32)> {
    ex.split(',')
        .map(|part| {
            let (role, species) = part.split_once(':').unwrap_or((part, "1"));
            let role = match role {
                "soprano" => Role::Soprano,
                "alto" => Role::Alto,
                "tenor" => Role::Tenor,
                "bass" => Role::Bass,
                other => {
                    eprintln!("Unknown voice role: {other}");
                    std::process::exit(1);
                }
            };
            let species = species.parse().unwrap_or_else(|_| {
                eprintln!("Invalid species number: {species}");
                std::process::exit(1);
            });
            (role, species)
        })
        .collect()
}

/// Parse command-line arguments into a `Config`. Uses simple
/// `std::env::args()` matching — no clap dependency.
fn parse_args() -> Config {
    let mut config = Config::default();
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    fn value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
        args.get(i).map(String::as_str).unwrap_or_else(|| {
            eprintln!("{flag} requires a value");
            std::process::exit(1);
        })
    }

    while i < args.len() {
        match args[i].as_str() {
            "--cantus" => {
                i += 1;
                config.cantus = value(&args, i, "--cantus")
                    .split_whitespace()
                    .map(parse_pitch)
                    .collect();
            }
            "--cantus-clef" => {
                i += 1;
                config.cantus_clef = parse_clef(value(&args, i, "--cantus-clef"));
            }
            "--voices" => {
                i += 1;
                config.voices = parse_voices(value(&args, i, "--voices"));
            }
            "--root" => {
                i += 1;
                config.root = parse_pitch(value(&args, i, "--root"));
            }
            "--minor" => config.minor = true,
            "--harmony" => config.harmony = true,
            "--measures" => {
                i += 1;
                config.measures = Some(parse_number(value(&args, i, "--measures"), "--measures"));
            }
            "--measure-length" => {
                i += 1;
                config.measure_length =
                    parse_number(value(&args, i, "--measure-length"), "--measure-length");
            }
            "--reward" => {
                i += 1;
                config.reward = parse_number(value(&args, i, "--reward"), "--reward");
            }
            "--limit-steps" => {
                i += 1;
                config.limit_steps =
                    Some(parse_number(value(&args, i, "--limit-steps"), "--limit-steps"));
            }
            "--timeout" => {
                i += 1;
                config.timeout = Some(parse_number(value(&args, i, "--timeout"), "--timeout"));
            }
            "--json" => {
                i += 1;
                config.json = Some(value(&args, i, "--json").to_string());
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config
}

fn parse_number<T: std::str::FromStr>(ex: &str, flag: &str) -> T {
    ex.parse().unwrap_or_else(|_| {
        eprintln!("{flag} requires a valid number");
        std::process::exit(1);
    })
}

fn print_usage() {
    println!("Usage: compose [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --cantus \"<PITCHES>\"   Whole-note cantus (default: c3 d3 e3 g3 f3 d3 c3)");
    println!("  --cantus-clef <CLEF>   treble | treble8vb | alto | bass (default: bass)");
    println!("  --voices <LIST>        Comma list of role:species (default: alto:1)");
    println!("  --root <PITCH>         Scale root (default: c0)");
    println!("  --minor                Compose in the complete minor scale");
    println!("  --harmony              Solve a chord background first");
    println!("  --measures <N>         Target measures (default: cantus length)");
    println!("  --measure-length <N>   Whole units per measure (default: 4)");
    println!("  --reward <F>           Search reward per advanced unit (default: 250)");
    println!("  --limit-steps <N>      Give up after N expansions");
    println!("  --timeout <SECS>       Give up after a wall-clock limit");
    println!("  --json <FILE>          Write the result as JSON (\"-\" for stdout)");
    println!("  --help, -h             Show this help");
}
