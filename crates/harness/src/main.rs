use clap::{Parser, Subcommand};

use tracebench_harness::runner::{self, TestSuite};
use tracebench_harness::{HarnessConfig, RunContext};
use tracebench_variants::{BuildLayout, SystemRunner, VariantBuilder, VariantKey};

const DEFAULT_LOG_FILTER: &str = "tracebench_harness=info,tracebench_variants=info,\
    tracebench_agent=info,tracebench_agent_client=info";

#[derive(Parser)]
#[command(
    name = "tracebench",
    about = "Integration harness for the httpd tracing module: mock agent and lazy variant builds"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the variants the selected scenarios need, start the agent, run them
    Run {
        #[command(flatten)]
        config: HarnessConfig,

        /// Only run scenarios whose name contains this substring
        #[arg(long)]
        filter: Option<String>,
    },

    /// Build module variants and print their artifact paths
    Build {
        /// Module source tree; searched upwards from the working directory when unset
        #[arg(long, env = "TRACEBENCH_PROJECT_ROOT")]
        project_root: Option<std::path::PathBuf>,

        /// Variant to build (primary/no_rum, extended/rum); all when omitted
        #[arg(long)]
        variant: Vec<VariantKey>,
    },

    /// List scenarios and their markers
    List {
        #[arg(long)]
        filter: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, filter } => run(config, filter.as_deref()).await,
        Commands::Build {
            project_root,
            variant,
        } => build(project_root, variant),
        Commands::List { filter } => {
            list(filter.as_deref());
            Ok(true)
        }
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn run(config: HarnessConfig, filter: Option<&str>) -> anyhow::Result<bool> {
    let tests = runner::collect(filter);
    if tests.is_empty() {
        eprintln!("no scenarios match");
        return Ok(true);
    }

    let mut ctx = RunContext::bootstrap(config, &tests)?;
    let suite = runner::run_all(&mut ctx, &tests).await;
    ctx.finish()?;

    print_suite(&suite);
    Ok(suite.failed() == 0)
}

fn build(
    project_root: Option<std::path::PathBuf>,
    variants: Vec<VariantKey>,
) -> anyhow::Result<bool> {
    let root = match project_root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    let mut builder =
        VariantBuilder::discover(&root, BuildLayout::default(), Box::new(SystemRunner))?;

    let keys = if variants.is_empty() {
        VariantKey::ALL.to_vec()
    } else {
        variants
    };
    for key in keys {
        let path = builder.build(key)?;
        println!("{key}\t{}", path.display());
    }
    Ok(true)
}

fn list(filter: Option<&str>) {
    for test in runner::collect(filter) {
        let markers: Vec<&str> = test.markers.iter().map(String::as_str).collect();
        println!("{:<28} [{}]", test.name, markers.join(", "));
    }
}

fn print_suite(suite: &TestSuite) {
    for result in &suite.results {
        let status = if result.passed { "PASS" } else { "FAIL" };
        println!(
            "  {status}  {:<28} {:>6}ms",
            result.name,
            result.duration.as_millis()
        );
        if let Some(error) = &result.error {
            println!("        {error}");
        }
    }
    println!(
        "\n{} passed, {} failed, {} total",
        suite.passed(),
        suite.failed(),
        suite.total()
    );
}
