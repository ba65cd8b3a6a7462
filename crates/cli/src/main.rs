use clap::{Parser, Subcommand};
use lib::params::{ParamMap, ParamValue};
use lib::pipeline::RequestOrigin;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "runbook")]
#[command(about = "Runbook console", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and default files (config, data
    /// directory, example catalog).
    Init {
        /// Config file path (default: RUNBOOK_CONFIG_PATH or ~/.runbook/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the HTTP gateway. Serves the command catalog, the execute
    /// endpoint, execution history, and the activity log.
    Gateway {
        /// Config file path (default: RUNBOOK_CONFIG_PATH or ~/.runbook/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config or 8650)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Execute a catalog command locally through the same pipeline the
    /// gateway uses (attributed to the local operator).
    Run {
        /// Command name in the catalog
        name: String,

        /// Parameter as key=value; repeat for multiple parameters
        #[arg(long = "param", short = 'p', value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Config file path (default: RUNBOOK_CONFIG_PATH or ~/.runbook/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("runbook {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Gateway { config, port }) => {
            if let Err(e) = run_gateway(config, port).await {
                log::error!("gateway failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Run {
            name,
            params,
            config,
        }) => {
            if let Err(e) = run_command(config, &name, &params).await {
                eprintln!("run failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_gateway(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting gateway on {}:{}",
        config.gateway.bind,
        config.gateway.port
    );
    lib::gateway::run_gateway(config, path).await
}

/// Parse repeated `-p key=value` flags into a parameter map. Values arrive as
/// text; the validator accepts numeric and boolean strings where declared.
fn parse_params(pairs: &[String]) -> anyhow::Result<ParamMap> {
    let mut map = ParamMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("invalid parameter '{}': expected key=value", pair))?;
        if key.trim().is_empty() {
            anyhow::bail!("invalid parameter '{}': empty key", pair);
        }
        map.insert(key.to_string(), ParamValue::Text(value.to_string()));
    }
    Ok(map)
}

async fn run_command(
    config_path: Option<std::path::PathBuf>,
    name: &str,
    params: &[String],
) -> anyhow::Result<()> {
    let (config, path) = lib::config::load_config(config_path)?;
    lib::init::require_initialized(&path, &config)?;

    let data_dir = lib::config::resolve_data_dir(&config, &path);
    let catalog = lib::catalog::CatalogStore::load(data_dir.join("catalog.json")).await;
    let executions =
        Arc::new(lib::audit::ExecutionStore::load(data_dir.join("executions.json")).await);
    let activities =
        Arc::new(lib::audit::ActivityStore::load(data_dir.join("activities.json")).await);
    let auditor = lib::audit::Auditor::new(executions, activities);

    let command = catalog
        .get_by_name(name)
        .await
        .ok_or_else(|| anyhow::anyhow!("command not found: {}", name))?;

    let inputs = parse_params(params)?;
    let operator = lib::config::local_operator(&config);
    let origin = RequestOrigin {
        operator_id: operator.id,
        ip_address: "local".to_string(),
        user_agent: format!("runbook-cli/{}", env!("CARGO_PKG_VERSION")),
    };

    let record = lib::pipeline::execute(&command, &inputs, &origin, &auditor).await?;
    print!("{}", record.result);
    log::info!(
        "execution {} finished in {}ms",
        record.id,
        record.duration_ms
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_params_splits_on_first_equals() {
        let map = parse_params(&["message=hello".to_string(), "kv=a=b".to_string()]).unwrap();
        assert_eq!(map["message"], ParamValue::Text("hello".to_string()));
        assert_eq!(map["kv"], ParamValue::Text("a=b".to_string()));
    }

    #[test]
    fn parse_params_rejects_malformed_pairs() {
        assert!(parse_params(&["no-equals".to_string()]).is_err());
        assert!(parse_params(&["=value".to_string()]).is_err());
    }
}
