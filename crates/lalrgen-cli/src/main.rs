use anyhow::Context as _;
use clap::Parser;
use lalrgen::{
    codegen::Codegen,
    lookahead::LookaheadMode,
    report,
    syntax,
    util::DisplayWith as _,
};
use std::{fs, path::PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path of the `.g4` grammar definition file.
    input: PathBuf,

    /// Print the LALR(1) states with their lookahead sets.
    #[arg(long)]
    show_states: bool,

    /// Print the ACTION/GOTO table.
    #[arg(long)]
    show_table: bool,

    /// Print the FIRST and FOLLOW sets.
    #[arg(long)]
    show_sets: bool,

    /// Print grammar statistics and the LALR(1) verdict.
    #[arg(long)]
    analyze: bool,

    /// Write a plain-BNF rendering of the parser rules.
    #[arg(long, value_name = "OUT")]
    convert_bnf: Option<PathBuf>,

    /// Write the generated parser and harness sources into the directory.
    #[arg(long, value_name = "DIR")]
    emit: Option<PathBuf>,

    /// Use DeRemer-Pennello lookahead propagation instead of the FOLLOW
    /// approximation.
    #[arg(long)]
    propagate: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::debug!("parsed CLI args = {:?}", args);

    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let g4 = syntax::parse(&source)
        .with_context(|| format!("errored while reading {}", args.input.display()))?;

    if let Some(out) = &args.convert_bnf {
        fs::write(out, syntax::to_bnf(&g4))
            .with_context(|| format!("failed to write {}", out.display()))?;
        println!("wrote {}", out.display());
    }

    let (mut grammar, lexicon) = syntax::to_grammar(&g4);

    let errors = grammar.validate();
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("error: {}", error);
        }
        anyhow::bail!("the grammar has {} structural error(s)", errors.len());
    }

    grammar.augment();

    let mode = if args.propagate {
        LookaheadMode::Propagate
    } else {
        LookaheadMode::Follow
    };
    let (automaton, states, table) = lalrgen::compute(&grammar, mode);

    if args.show_sets {
        print!("{}", grammar.display_sets());
    }
    if args.show_states {
        for state in &states {
            print!("{}", state.display(&grammar));
        }
    }
    if args.show_table {
        print!("{}", table.display(&grammar));
    }
    if args.analyze {
        let terminals = grammar.symbols().terminals().count();
        let nonterminals = grammar.symbols().nonterminals().count();
        let sr = table
            .conflicts()
            .iter()
            .filter(|c| c.kind == report::ConflictKind::ShiftReduce)
            .count();
        let rr = table.conflicts().len() - sr;
        println!(
            "grammar {}: {} terminals, {} nonterminals, {} productions",
            g4.name,
            terminals,
            nonterminals,
            grammar.productions().count(),
        );
        println!("automaton: {} states", automaton.states.len());
        println!(
            "conflicts: {} ({} shift/reduce, {} reduce/reduce)",
            table.conflicts().len(),
            sr,
            rr,
        );
        println!(
            "verdict: {}",
            if table.has_conflicts() {
                "not LALR(1) under the current lookahead scheme"
            } else {
                "LALR(1)"
            }
        );
    }

    if table.has_conflicts() {
        print!("{}", report::render(&grammar, &table));
    }

    if let Some(dir) = &args.emit {
        let codegen = Codegen::new(&grammar, &table, &lexicon, &g4.name)
            .context("failed to prepare code generation")?;
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let parser_file = dir.join(format!("{}.rs", codegen.module_name()));
        fs::write(&parser_file, codegen.to_string())
            .with_context(|| format!("failed to write {}", parser_file.display()))?;

        let harness_file = dir.join("main.rs");
        fs::write(&harness_file, codegen.harness())
            .with_context(|| format!("failed to write {}", harness_file.display()))?;

        println!(
            "wrote {} and {}",
            parser_file.display(),
            harness_file.display()
        );
    }

    Ok(())
}
