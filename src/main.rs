use std::path::PathBuf;

use clap::Parser;
use cutting_stock::input::{load_problem, parse_product};
use cutting_stock::report::Report;
use cutting_stock::{MicroLpSolver, Problem, Settings, optimize};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "cutting_stock",
    about = "1D cutting stock optimizer using column generation"
)]
struct Cli {
    /// JSON problem file (sProducts, pProductSize, pProductDemand, pBarSize)
    #[arg(long, conflicts_with_all = ["bar_size", "products"])]
    input: Option<PathBuf>,

    /// Length of a stock bar
    #[arg(long, required_unless_present = "input")]
    bar_size: Option<f64>,

    /// Products as ID:LENGTH:DEMAND (e.g. A:3:5 B:4:3)
    #[arg(long, num_args = 1.., required_unless_present = "input")]
    products: Vec<String>,

    /// Stop generating patterns after this many iterations
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log every column-generation iteration
    #[arg(short, long)]
    verbose: bool,
}

fn load(cli: &Cli) -> cutting_stock::Result<Problem> {
    match &cli.input {
        Some(path) => load_problem(path),
        None => {
            let products = cli
                .products
                .iter()
                .map(|s| parse_product(s))
                .collect::<cutting_stock::Result<Vec<_>>>()?;
            Problem::new(products, cli.bar_size.unwrap_or_default())
        }
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let problem = load(&cli).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let settings = Settings::default().with_max_iterations(cli.max_iterations);
    let outcome = optimize(problem.clone(), settings, MicroLpSolver::new()).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let report = Report::from_outcome(&problem, &outcome);
    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        print!("{}", report.render());
    }
}
