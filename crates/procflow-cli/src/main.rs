use procflow::layout::{Direction, LayoutOptions, LayoutReport};
use procflow::{
    Diagnostics, LaidOutGraph, LevelSchema, Pipeline, PipelineError, RawRow,
    layout_options_from_str, rows_from_csv, rows_from_json_str,
};
use serde::Serialize;
use std::io::Read;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Build(procflow::Error),
    Pipeline(PipelineError),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Build(err) => write!(f, "{err}"),
            CliError::Pipeline(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<procflow::Error> for CliError {
    fn from(value: procflow::Error) -> Self {
        Self::Build(value)
    }
}

impl From<PipelineError> for CliError {
    fn from(value: PipelineError) -> Self {
        Self::Pipeline(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    Tree,
    Graph,
    #[default]
    Layout,
    Export,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    schema: Option<String>,
    config: Option<String>,
    csv: bool,
    direction: Option<Direction>,
    seed: Option<u64>,
    iterations: Option<usize>,
    no_obstacle_avoidance: bool,
    scope: Option<String>,
    pretty: bool,
    nodes_csv: Option<String>,
    edges_csv: Option<String>,
    out: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LayoutOut<'a> {
    #[serde(flatten)]
    graph: &'a LaidOutGraph,
    report: &'a LayoutReport,
    diagnostics: &'a Diagnostics,
}

fn usage() -> &'static str {
    "procflow-cli\n\
\n\
USAGE:\n\
  procflow-cli tree [--schema <path>] [--csv] [--scope <id>] [--pretty] [--out <path>] [<path>|-]\n\
  procflow-cli graph [--schema <path>] [--csv] [--scope <id>] [--pretty] [--out <path>] [<path>|-]\n\
  procflow-cli [layout] [--schema <path>] [--config <path>] [--csv] [--direction tb|lr] [--seed <n>] [--iterations <n>] [--no-obstacle-avoidance] [--scope <id>] [--pretty] [--out <path>] [<path>|-]\n\
  procflow-cli export --nodes-csv <path> --edges-csv <path> [layout flags] [--out <json-path>] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', rows are read from stdin.\n\
  - Rows are a JSON array of objects; pass --csv (or use a .csv path) for CSV with a header row.\n\
  - --schema and --config accept JSON or YAML files.\n\
  - Diagnostics are summarised on stderr; set PROCFLOW_LOG (e.g. 'debug') for details.\n\
"
}

fn next_value<'a>(it: &mut impl Iterator<Item = &'a String>) -> Result<&'a String, CliError> {
    it.next().ok_or(CliError::Usage(usage()))
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "tree" => args.command = Command::Tree,
            "graph" => args.command = Command::Graph,
            "layout" => args.command = Command::Layout,
            "export" => args.command = Command::Export,
            "--csv" => args.csv = true,
            "--pretty" => args.pretty = true,
            "--no-obstacle-avoidance" => args.no_obstacle_avoidance = true,
            "--schema" => args.schema = Some(next_value(&mut it)?.clone()),
            "--config" => args.config = Some(next_value(&mut it)?.clone()),
            "--scope" => args.scope = Some(next_value(&mut it)?.clone()),
            "--nodes-csv" => args.nodes_csv = Some(next_value(&mut it)?.clone()),
            "--edges-csv" => args.edges_csv = Some(next_value(&mut it)?.clone()),
            "--out" => args.out = Some(next_value(&mut it)?.clone()),
            "--direction" => {
                let dir = next_value(&mut it)?;
                args.direction = Some(
                    dir.parse::<Direction>()
                        .map_err(|_| CliError::Usage(usage()))?,
                );
            }
            "--seed" => {
                let seed = next_value(&mut it)?;
                args.seed = Some(seed.parse::<u64>().map_err(|_| CliError::Usage(usage()))?);
            }
            "--iterations" => {
                let n = next_value(&mut it)?;
                args.iterations = Some(n.parse::<usize>().map_err(|_| CliError::Usage(usage()))?);
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    if matches!(args.command, Command::Export) && args.nodes_csv.is_none() && args.edges_csv.is_none()
    {
        return Err(CliError::Usage(usage()));
    }
    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn read_rows(args: &Args) -> Result<Vec<RawRow>, CliError> {
    let text = read_input(args.input.as_deref())?;
    let is_csv = args.csv
        || args
            .input
            .as_deref()
            .is_some_and(|p| p.to_ascii_lowercase().ends_with(".csv"));
    let rows = if is_csv {
        rows_from_csv(text.as_bytes())?
    } else {
        rows_from_json_str(&text)?
    };
    Ok(rows)
}

fn build_pipeline(args: &Args) -> Result<Pipeline, CliError> {
    let schema = match &args.schema {
        Some(path) => LevelSchema::from_config_str(&std::fs::read_to_string(path)?)?,
        None => LevelSchema::standard(),
    };
    let mut options = match &args.config {
        Some(path) => layout_options_from_str(&std::fs::read_to_string(path)?)?,
        None => LayoutOptions::default(),
    };
    if let Some(direction) = args.direction {
        options.direction = direction;
    }
    if let Some(seed) = args.seed {
        options.random_seed = seed;
    }
    if let Some(iterations) = args.iterations {
        options.iterations = iterations;
    }
    if args.no_obstacle_avoidance {
        options.avoid_obstacles = false;
    }
    options.validate().map_err(PipelineError::from)?;

    let mut pipeline = Pipeline::new()
        .with_schema(schema)
        .with_layout_options(options);
    if let Some(scope) = &args.scope {
        pipeline = pipeline.with_scope(scope.clone());
    }
    Ok(pipeline)
}

fn to_json(value: &impl Serialize, pretty: bool) -> Result<String, CliError> {
    let mut text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    text.push('\n');
    Ok(text)
}

fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None => {
            print!("{text}");
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

fn report_diagnostics(diagnostics: &Diagnostics) {
    if diagnostics.is_empty() {
        return;
    }
    let parts: Vec<String> = diagnostics
        .summary()
        .iter()
        .map(|(kind, n)| format!("{kind}: {n}"))
        .collect();
    tracing::warn!(
        total = diagnostics.len(),
        summary = %parts.join(", "),
        "input produced diagnostics"
    );
}

fn run(args: Args) -> Result<(), CliError> {
    let rows = read_rows(&args)?;
    let pipeline = build_pipeline(&args)?;

    match args.command {
        Command::Tree => {
            let build = pipeline.build_tree(&rows);
            report_diagnostics(&build.diagnostics);
            let text = match &args.scope {
                Some(id) => {
                    let root = build
                        .tree
                        .get(id)
                        .ok_or_else(|| procflow::Error::UnknownNode { id: id.clone() })?;
                    to_json(&build.tree.subtree_view(root), args.pretty)?
                }
                None => to_json(&build.tree.view(), args.pretty)?,
            };
            write_text(&text, args.out.as_deref())
        }
        Command::Graph => {
            let mut build = pipeline.build_tree(&rows);
            let extraction = pipeline.extract(&build.tree)?;
            build.diagnostics.extend(extraction.diagnostics);
            report_diagnostics(&build.diagnostics);
            write_text(
                &to_json(&extraction.graph, args.pretty)?,
                args.out.as_deref(),
            )
        }
        Command::Layout => {
            let output = pipeline.run(&rows)?;
            report_diagnostics(&output.diagnostics);
            let text = to_json(
                &LayoutOut {
                    graph: &output.laid_out,
                    report: &output.report,
                    diagnostics: &output.diagnostics,
                },
                args.pretty,
            )?;
            write_text(&text, args.out.as_deref())
        }
        Command::Export => {
            let output = pipeline.run(&rows)?;
            report_diagnostics(&output.diagnostics);
            if let Some(path) = &args.nodes_csv {
                output
                    .laid_out
                    .write_nodes_csv(std::fs::File::create(path)?)?;
            }
            if let Some(path) = &args.edges_csv {
                output
                    .laid_out
                    .write_edges_csv(std::fs::File::create(path)?)?;
            }
            if let Some(path) = &args.out {
                std::fs::write(path, output.laid_out.to_json(args.pretty)?)?;
            }
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("PROCFLOW_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    init_tracing();
    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
