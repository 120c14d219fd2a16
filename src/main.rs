use std::io::{self, Read};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::{LevelFilter, debug};
use serde::Serialize;

use regex_workbench::builder::{Builder, BuilderPreset, Component, ComponentKind};
use regex_workbench::checker::{Analysis, analyze, sample_inputs};
use regex_workbench::library::{self, Category, CategoryGroup, Preset};
use regex_workbench::templates::{self, Country, DateFormat, IpVersion, Protocol, Template};
use regex_workbench::{Engine, EngineConfig, Flags, Match, ValidationResult};

#[derive(Parser)]
#[command(name = "regex-workbench", version, about = "Build, check and test regular expressions")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check pattern syntax
    Validate {
        pattern: String,
        #[arg(short, long, default_value = "")]
        flags: String,
    },
    /// Run a pattern against text (read from stdin when omitted)
    Test {
        pattern: String,
        text: Option<String>,
        #[arg(short, long, default_value = "g")]
        flags: String,
        /// Maximum number of matches to report
        #[arg(long)]
        limit: Option<usize>,
        /// Backtracking step budget per attempt
        #[arg(long)]
        budget: Option<u64>,
    },
    /// Generate a pattern from a template
    Generate {
        #[command(subcommand)]
        template: TemplateArgs,
    },
    /// Browse the preset library
    Library(LibraryArgs),
    /// Analyze a pattern for complexity, issues and tips
    Check {
        pattern: String,
        /// Also list sample inputs worth testing
        #[arg(long)]
        samples: bool,
    },
    /// Join builder components into a pattern
    Build {
        /// Start from a preset: email, phone, url or date
        #[arg(long)]
        preset: Option<BuilderPreset>,
        /// Component names (e.g. word, one-or-more) or `lit:TEXT` for literal text
        components: Vec<String>,
    },
}

#[derive(Subcommand)]
enum TemplateArgs {
    Email {
        #[arg(long)]
        no_subdomains: bool,
    },
    Phone {
        #[arg(long, default_value = "cn")]
        country: Country,
        #[arg(long)]
        allow_spaces: bool,
    },
    IdCard {
        #[arg(long)]
        no_x: bool,
        #[arg(long)]
        loose_length: bool,
    },
    Url {
        #[arg(long, default_value = "any")]
        protocol: Protocol,
        #[arg(long)]
        no_subdomains: bool,
    },
    Ip {
        #[arg(long, default_value = "v4")]
        version: IpVersion,
    },
    Date {
        #[arg(long, default_value = "YYYY-MM-DD")]
        format: DateFormat,
        #[arg(long, default_value = "-")]
        separator: String,
    },
    Number {
        #[arg(long)]
        allow_negative: bool,
        #[arg(long)]
        no_decimals: bool,
        #[arg(long, default_value_t = 1)]
        min_length: u32,
        #[arg(long, default_value_t = 10)]
        max_length: u32,
    },
    Custom {
        pattern: String,
    },
    /// Every template with default options
    All,
}

impl TemplateArgs {
    fn into_templates(self) -> Vec<Template> {
        let template = match self {
            TemplateArgs::All => return Template::defaults(),
            TemplateArgs::Email { no_subdomains } => Template::Email {
                allow_subdomains: !no_subdomains,
            },
            TemplateArgs::Phone {
                country,
                allow_spaces,
            } => Template::Phone {
                country,
                allow_spaces,
            },
            TemplateArgs::IdCard { no_x, loose_length } => Template::IdCard {
                allow_x: !no_x,
                strict_length: !loose_length,
            },
            TemplateArgs::Url {
                protocol,
                no_subdomains,
            } => Template::Url {
                protocol,
                allow_subdomains: !no_subdomains,
            },
            TemplateArgs::Ip { version } => Template::Ip { version },
            TemplateArgs::Date { format, separator } => Template::Date { format, separator },
            TemplateArgs::Number {
                allow_negative,
                no_decimals,
                min_length,
                max_length,
            } => Template::Number {
                allow_negative,
                allow_decimals: !no_decimals,
                min_length,
                max_length,
            },
            TemplateArgs::Custom { pattern } => Template::Custom { pattern },
        };
        vec![template]
    }
}

#[derive(Args)]
struct LibraryArgs {
    /// Only presets of this category (e.g. email, id_card)
    #[arg(long, conflicts_with_all = ["group", "search"])]
    category: Option<Category>,
    /// Only presets of this group: contact, identity, network, format, text
    #[arg(long, conflicts_with = "search")]
    group: Option<CategoryGroup>,
    /// Case-insensitive search over patterns and descriptions
    #[arg(long)]
    search: Option<String>,
}

/// Print `value` as pretty JSON; false if it could not be serialized.
fn print_json<T: Serialize>(value: &T) -> bool {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{text}");
            true
        }
        Err(e) => {
            eprintln!("Error serializing output: {e}");
            false
        }
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok { ExitCode::SUCCESS } else { ExitCode::from(1) }
}

fn parse_flags(flags: &str) -> Result<Flags, ExitCode> {
    flags.parse().map_err(|e| {
        eprintln!("Error: {e}");
        ExitCode::from(2)
    })
}

fn run_validate(engine: &Engine, pattern: &str, flags: &str, json: bool) -> ExitCode {
    let flags = match parse_flags(flags) {
        Ok(flags) => flags,
        Err(code) => return code,
    };
    let result = engine.validate(pattern, flags);
    if json {
        return exit_code(print_json(&result) && result.valid);
    }
    match &result.error {
        None => println!("VALID"),
        Some(e) => println!("ERROR:{e}"),
    }
    exit_code(result.valid)
}

fn print_match(index: usize, m: &Match) {
    println!("MATCH {index}:{} [{}..{}]", m.text, m.start, m.end);
    for (i, capture) in m.captures.iter().enumerate() {
        match capture {
            Some(c) => println!("  GROUP {}:{}", i + 1, c.text),
            None => println!("  GROUP {}:", i + 1),
        }
    }
}

fn run_test(engine: &Engine, pattern: &str, text: &str, flags: &str, json: bool) -> ExitCode {
    let report = engine.test(pattern, text, flags);
    if json {
        return exit_code(print_json(&report) && report.success);
    }
    if let Some(error) = &report.error {
        println!("ERROR:{}", error.message);
        return ExitCode::from(1);
    }
    if report.matches.is_empty() {
        println!("NO_MATCH");
    }
    for (i, m) in report.matches.iter().enumerate() {
        print_match(i + 1, m);
    }
    if report.truncated {
        println!("(stopped after {} matches)", report.count);
    }
    debug!("test finished in {:?}", report.elapsed);
    ExitCode::SUCCESS
}

fn run_generate(engine: &Engine, args: TemplateArgs, json: bool) -> ExitCode {
    #[derive(Serialize)]
    struct Generated {
        template: &'static str,
        pattern: String,
    }

    let mut generated = Vec::new();
    for template in args.into_templates() {
        match templates::generate(engine, &template) {
            Ok(pattern) => generated.push(Generated {
                template: template.kind(),
                pattern,
            }),
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::from(1);
            }
        }
    }
    if json {
        return exit_code(print_json(&generated));
    }
    if let [single] = generated.as_slice() {
        println!("{}", single.pattern);
    } else {
        for g in &generated {
            println!("{:<8} {}", g.template, g.pattern);
        }
    }
    ExitCode::SUCCESS
}

fn run_library(args: LibraryArgs, json: bool) -> ExitCode {
    let presets: Vec<&Preset> = if let Some(category) = args.category {
        library::by_category(category).collect()
    } else if let Some(group) = args.group {
        library::by_group(group).collect()
    } else if let Some(query) = &args.search {
        library::search(query)
    } else {
        library::presets().iter().collect()
    };
    if json {
        return exit_code(print_json(&presets));
    }
    for preset in presets {
        println!(
            "{}.{:<26} {}\n    {}",
            preset.category, preset.key, preset.description, preset.pattern
        );
    }
    ExitCode::SUCCESS
}

fn run_check(pattern: &str, samples: bool, json: bool) -> ExitCode {
    let analysis = analyze(pattern);
    let samples = if samples { sample_inputs(pattern) } else { Vec::new() };
    if json {
        #[derive(Serialize)]
        struct CheckOutput<'a> {
            #[serde(flatten)]
            analysis: &'a Analysis,
            samples: &'a [&'static str],
        }
        let printed = print_json(&CheckOutput {
            analysis: &analysis,
            samples: &samples,
        });
        return exit_code(printed && analysis.valid);
    }
    match &analysis.error {
        None => println!("VALID ({} chars)", analysis.length),
        Some(e) => println!("ERROR:{e}"),
    }
    println!("complexity: {:?}", analysis.complexity);
    for issue in &analysis.issues {
        println!("issue: {}", issue.message());
    }
    for tip in &analysis.tips {
        println!("tip: {}", tip.message());
    }
    for sample in &samples {
        println!("sample: {sample}");
    }
    exit_code(analysis.valid)
}

fn run_build(engine: &Engine, preset: Option<BuilderPreset>, names: &[String], json: bool) -> ExitCode {
    let mut builder = preset.map(Builder::from_preset).unwrap_or_default();
    for name in names {
        let component = match name.strip_prefix("lit:") {
            Some(text) => Component::literal(text),
            None => match name.parse::<ComponentKind>() {
                Ok(kind) => Component::new(kind),
                Err(e) => {
                    eprintln!("Error: {e}");
                    return ExitCode::from(2);
                }
            },
        };
        builder.push(component);
    }
    let pattern = builder.pattern();
    let validation = engine.validate(&pattern, Flags::default());
    if json {
        #[derive(Serialize)]
        struct Built<'a> {
            pattern: &'a str,
            components: &'a [Component],
            validation: &'a ValidationResult,
        }
        let printed = print_json(&Built {
            pattern: &pattern,
            components: builder.components(),
            validation: &validation,
        });
        return exit_code(printed && validation.valid);
    }
    println!("{pattern}");
    if let Some(e) = &validation.error {
        println!("ERROR:{e}");
    }
    exit_code(validation.valid)
}

fn read_stdin() -> io::Result<String> {
    let mut text = String::new();
    io::stdin().read_to_string(&mut text)?;
    Ok(text)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let json = cli.json;
    match cli.command {
        Command::Validate { pattern, flags } => run_validate(&Engine::default(), &pattern, &flags, json),
        Command::Test {
            pattern,
            text,
            flags,
            limit,
            budget,
        } => {
            let text = match text {
                Some(text) => text,
                None => match read_stdin() {
                    Ok(text) => text,
                    Err(e) => {
                        eprintln!("Error reading stdin: {e}");
                        return ExitCode::from(1);
                    }
                },
            };
            let mut config = EngineConfig::default();
            if let Some(limit) = limit {
                config = config.with_match_limit(limit);
            }
            if let Some(budget) = budget {
                config = config.with_step_budget(budget);
            }
            run_test(&Engine::new(config), &pattern, &text, &flags, json)
        }
        Command::Generate { template } => run_generate(&Engine::default(), template, json),
        Command::Library(args) => run_library(args, json),
        Command::Check { pattern, samples } => run_check(&pattern, samples, json),
        Command::Build { preset, components } => {
            run_build(&Engine::default(), preset, &components, json)
        }
    }
}
