use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use eco_config::{load_network_config, load_tenant_configs};
use eco_topology::{AssemblyOptions, Topology, TopologyAssembler};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

fn input_args() -> [Arg; 3] {
    [
        Arg::new("network")
            .long("network")
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help("Network config (JSON, YAML or TOML)"),
        Arg::new("apps")
            .long("apps")
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help("Tenant config list (JSON, YAML or TOML)"),
        Arg::new("band-width")
            .long("band-width")
            .default_value("100")
            .value_parser(value_parser!(u32))
            .help("Priorities reserved per tenant band"),
    ]
}

fn cli() -> Command {
    Command::new("eco-synth")
        .version(eco_topology::VERSION)
        .about("Synthesize the shared and per-tenant app ecosystem topology")
        .subcommand_required(true)
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Increase log verbosity (-v warn, -vv info, -vvv debug, -vvvv trace)"),
        )
        .subcommand(
            Command::new("synth")
                .about("Assemble the topology and write the manifest")
                .args(input_args())
                .arg(
                    Arg::new("out")
                        .long("out")
                        .short('o')
                        .value_parser(value_parser!(PathBuf))
                        .help("Output file (stdout if omitted)"),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .default_value("json")
                        .value_parser(["json", "yaml"])
                        .help("Manifest format"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Assemble the topology and print a summary")
                .args(input_args()),
        )
        .subcommand(
            Command::new("priorities")
                .about("Print the routing table sorted by priority")
                .args(input_args()),
        )
        .subcommand(
            Command::new("schema")
                .about("Print the JSON Schema of a config document")
                .arg(
                    Arg::new("document")
                        .required(true)
                        .value_parser(["network", "apps"])
                        .help("Which document"),
                ),
        )
}

fn init_tracing(matches: &ArgMatches) -> Result<()> {
    let verbosity_level = match matches.get_count("verbosity") {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::WARN,
        2 => tracing::Level::INFO,
        3 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    // RUST_LOG overrides -v
    let env_filter = EnvFilter::builder()
        .with_default_directive(verbosity_level.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let subscriber = Registry::default().with(fmt_layer).with(env_filter);
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;
    Ok(())
}

fn assemble(args: &ArgMatches) -> Result<Topology> {
    let network_path = args
        .get_one::<PathBuf>("network")
        .context("--network is required")?;
    let apps_path = args
        .get_one::<PathBuf>("apps")
        .context("--apps is required")?;
    let band_width = args
        .get_one::<u32>("band-width")
        .copied()
        .unwrap_or_else(|| AssemblyOptions::default().band_width);

    let network = load_network_config(network_path)
        .with_context(|| format!("loading {}", network_path.display()))?;
    let tenants = load_tenant_configs(apps_path)
        .with_context(|| format!("loading {}", apps_path.display()))?;

    let assembler = TopologyAssembler::new(AssemblyOptions::with_band_width(band_width))?;
    let topology = assembler.assemble(&network, &tenants).map_err(|err| {
        tracing::error!(kind = err.kind(), "{}", err);
        err
    })?;
    Ok(topology)
}

fn synth(args: &ArgMatches) -> Result<()> {
    let topology = assemble(args)?;
    let manifest = topology.manifest();
    let rendered = match args.get_one::<String>("format").map(String::as_str) {
        Some("yaml") => manifest.to_yaml()?,
        _ => manifest.to_json()?,
    };

    match args.get_one::<PathBuf>("out") {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!("Wrote manifest to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn validate(args: &ArgMatches) -> Result<()> {
    let topology = assemble(args)?;
    let graph = topology.graph();
    println!(
        "OK: {} stacks, {} resources, {} tenants, fingerprint {}",
        graph.stacks().count(),
        graph.resource_count(),
        topology.tenants().len(),
        topology.fingerprint()
    );
    Ok(())
}

fn priorities(args: &ArgMatches) -> Result<()> {
    let topology = assemble(args)?;
    let mut table = topology.routing_table();
    table.sort_by_key(|route| route.priority);

    println!("{:>8}  {:<20}  {:<7}  {:<40}  PATH", "PRIORITY", "TENANT", "RULE", "HOST");
    for route in table {
        println!(
            "{:>8}  {:<20}  {:<7}  {:<40}  {}",
            route.priority,
            route.tenant,
            route.rule,
            route.host,
            route.path.as_deref().unwrap_or("*")
        );
    }
    Ok(())
}

fn schema(args: &ArgMatches) -> Result<()> {
    let schema = match args.get_one::<String>("document").map(String::as_str) {
        Some("network") => eco_config::network_schema(),
        _ => eco_config::tenants_schema(),
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn run(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("synth", args)) => synth(args),
        Some(("validate", args)) => validate(args),
        Some(("priorities", args)) => priorities(args),
        Some(("schema", args)) => schema(args),
        _ => Ok(()),
    }
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    if let Err(err) = init_tracing(&matches) {
        eprintln!("error: {err:#}");
        return ExitCode::FAILURE;
    }

    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
