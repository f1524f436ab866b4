mod rules;
mod test_runner;

use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use engine::{Combination, MatchResult, MatcherRegistry};
use notepat::{CompileError, Compiler, Pattern};

use crate::rules::{RuleError, RuleSet, RulesFile};

#[derive(Parser)]
#[command(name = "notepat", version, about = "Match free-form notes against templates")]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Increase log verbosity (-v debug, -vv trace). Overrides RUST_LOG.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Match inputs against a template and print the extracted fields
    Match(MatchArgs),

    /// List the ranked combinations of a template
    Expand(ExpandArgs),

    /// Compile a template without matching
    Check(CheckArgs),

    /// Match inputs against the templates of a rules file
    Rules(RulesArgs),

    /// Run .test.md test files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct MatchArgs {
    /// Template source
    template: String,

    /// Inputs to match, one per argument
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Also print the combination that matched
    #[arg(long)]
    combination: bool,

    /// Print the input with captured values marked
    #[arg(long)]
    highlight: bool,
}

#[derive(clap::Args)]
struct ExpandArgs {
    /// Template source
    template: String,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Template source
    template: String,

    /// Dump the compiled pattern tree
    #[arg(long)]
    ast: bool,
}

#[derive(clap::Args)]
struct RulesArgs {
    /// TOML rules file
    file: String,

    /// Inputs to match, one per argument
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

#[derive(Serialize)]
struct MatchOutput<'a> {
    input: &'a str,
    result: Option<&'a MatchResult>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let exit_code = match cli.command {
        Command::Match(args) => do_match(args, color_choice),
        Command::Expand(args) => do_expand(args, color_choice),
        Command::Check(args) => do_check(args, color_choice),
        Command::Rules(args) => do_rules(args, color_choice),
        Command::Test(args) => {
            let path = Path::new(&args.path);
            if args.list_categories {
                test_runner::list_categories(path);
                0
            } else {
                test_runner::run_tests(path, cli.no_color, &args.category)
            }
        }
    };
    process::exit(exit_code);
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Compile `template`, rendering any errors as diagnostics on stderr.
fn compile_or_report(template: &str, color_choice: ColorChoice) -> Option<Pattern> {
    let mut files = SimpleFiles::new();
    let file_id = files.add("<template>".to_string(), template.to_string());

    match Compiler::new(template, file_id).compile() {
        Ok(pattern) => Some(pattern),
        Err(errors) => {
            emit_compile_errors(&files, &errors, color_choice);
            None
        }
    }
}

fn emit_compile_errors(
    files: &SimpleFiles<String, String>,
    errors: &[CompileError],
    color_choice: ColorChoice,
) {
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    for error in errors {
        let diagnostic = error.to_diagnostic();
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, files, &diagnostic);
    }
}

fn do_match(args: MatchArgs, color_choice: ColorChoice) -> i32 {
    let Some(pattern) = compile_or_report(&args.template, color_choice) else {
        return 1;
    };

    let matchers = MatcherRegistry::builtin();
    if let Err(error) = matchers.validate(&pattern) {
        eprintln!("error: {}", error);
        return 1;
    }
    let combinations = engine::expand(&pattern);

    let mut results = Vec::with_capacity(args.inputs.len());
    for input in &args.inputs {
        match engine::match_combinations(input, &combinations, &matchers) {
            Ok(result) => results.push(result),
            Err(error) => {
                eprintln!("error: {}", error);
                return 1;
            }
        }
    }

    if args.json {
        let outputs: Vec<MatchOutput> = args
            .inputs
            .iter()
            .zip(&results)
            .map(|(input, result)| MatchOutput {
                input,
                result: result.as_ref(),
            })
            .collect();
        print_json(&outputs);
    } else {
        for (input, result) in args.inputs.iter().zip(&results) {
            print_result(input, None, result.as_ref(), args.combination, args.highlight);
        }
    }

    if results.iter().all(Option::is_some) { 0 } else { 1 }
}

fn do_expand(args: ExpandArgs, color_choice: ColorChoice) -> i32 {
    let Some(pattern) = compile_or_report(&args.template, color_choice) else {
        return 1;
    };
    let combinations = engine::expand(&pattern);
    print_combinations(&combinations);
    0
}

fn print_combinations(combinations: &[Combination]) {
    let width = combinations.len().to_string().len();
    for (rank, combination) in combinations.iter().enumerate() {
        println!(
            "{:>width$}. [{:>3}] {}",
            rank + 1,
            combination.score,
            combination,
            width = width
        );
    }
}

fn do_check(args: CheckArgs, color_choice: ColorChoice) -> i32 {
    let Some(pattern) = compile_or_report(&args.template, color_choice) else {
        return 1;
    };
    if args.ast {
        println!("{:#?}", pattern);
    } else {
        eprintln!("ok: {}", pattern);
    }
    0
}

fn do_rules(args: RulesArgs, color_choice: ColorChoice) -> i32 {
    let file = match RulesFile::load(Path::new(&args.file)) {
        Ok(file) => file,
        Err(error) => {
            eprintln!("error: {}", error);
            return 1;
        }
    };

    let mut rules = match RuleSet::new(file) {
        Ok(rules) => rules,
        Err(RuleError::Compile {
            rule,
            template,
            errors,
        }) => {
            eprintln!("error: rule '{}' has an invalid template", rule);
            let mut files = SimpleFiles::new();
            files.add(format!("rule '{}'", rule), template);
            emit_compile_errors(&files, &errors, color_choice);
            return 1;
        }
        Err(error) => {
            eprintln!("error: {}", error);
            return 1;
        }
    };
    tracing::debug!(rules = rules.len(), "rules loaded");

    let mut exit_code = 0;
    let mut outputs = Vec::new();
    for input in &args.inputs {
        let matched = match rules.match_input(input) {
            Ok(matched) => matched,
            Err(error) => {
                eprintln!("error: {}", error);
                return 1;
            }
        };
        if matched.is_none() {
            exit_code = 1;
        }
        if args.json {
            outputs.push(
                serde_json::json!({
                    "input": input,
                    "rule": matched.as_ref().map(|(rule, _)| *rule),
                    "result": matched.as_ref().map(|(_, result)| result),
                }),
            );
        } else {
            let (rule, result) = match &matched {
                Some((rule, result)) => (Some(*rule), Some(result)),
                None => (None, None),
            };
            print_result(input, rule, result, false, false);
        }
    }

    if args.json {
        print_json(&outputs);
    }
    exit_code
}

fn print_result(
    input: &str,
    rule: Option<&str>,
    result: Option<&MatchResult>,
    show_combination: bool,
    highlight: bool,
) {
    let Some(result) = result else {
        println!("{}: no match", input);
        return;
    };

    match rule {
        Some(rule) => println!("{}: matched '{}'", input, rule),
        None => println!("{}:", input),
    }
    if highlight {
        println!("  {}", result.highlight(input, "[", "]"));
    }
    if show_combination {
        if let Some(combination) = &result.combination {
            println!("  via {} (score {})", combination, combination.score);
        }
    }
    for field in &result.fields {
        let name = field.name.as_deref().unwrap_or("_");
        println!("  {} ({}) = {}", name, field.input_type, field.value);
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(error) => eprintln!("error: cannot serialize output: {}", error),
    }
}
