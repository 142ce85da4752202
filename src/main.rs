// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use clusterwait::{
    client::{ClusterClient, ResourceRef, Target},
    condition::{ConditionSet, FieldPath},
    config::{Backend, Config},
    constants::{MACHINE_SET_ROLLOUT_FIELDS, WORKLOAD_ROLLOUT_FIELDS},
    kube_client::KubeClusterClient,
    logging::{init_logging, LogFormat},
    matcher::MatchMode,
    oc::OcClient,
    operators::{list_cluster_operators, wait_co_becomes, wait_cos_healthy},
    poll::{run, Outcome, PollSpec},
    query::ConditionQuery,
    rollout::{control_plane_machine_set, wait_for_rollout},
    topology::effective_spec,
};
use futures::future::join_all;
use std::path::PathBuf;
use tracing::{debug, error, info};

/// Wait for OpenShift cluster state to converge.
#[derive(Debug, Parser)]
#[command(name = "clusterwait", version, about)]
struct Cli {
    /// Configuration file (defaults to $CLUSTERWAIT_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Client backend, overriding the configuration
    #[arg(long, global = true, value_enum)]
    backend: Option<Backend>,

    /// Seconds between polls
    #[arg(long, global = true)]
    interval: Option<u64>,

    /// Overall timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Re-check a match after the configured stability delay before accepting it
    #[arg(long, global = true)]
    stable: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Wait for cluster operators
    Operator(OperatorArgs),
    /// Wait for arbitrary fields of one resource
    Condition(ConditionArgs),
    /// Wait for a replica rollout to complete
    Rollout(RolloutArgs),
}

#[derive(Debug, Args)]
struct OperatorArgs {
    /// Operator names
    names: Vec<String>,

    /// Wait for every cluster operator
    #[arg(long, conflicts_with = "names")]
    all: bool,

    /// Expected condition statuses (`Available=True`); defaults to healthy
    #[arg(long = "expect", value_name = "CONDITION=STATUS")]
    expect: Vec<String>,
}

#[derive(Debug, Args)]
struct ConditionArgs {
    /// Resource kind
    kind: String,

    /// Resource name
    #[arg(required_unless_present = "selector")]
    name: Option<String>,

    /// Label selector resolving to exactly one resource
    #[arg(short = 'l', long, conflicts_with = "name")]
    selector: Option<String>,

    /// Namespace
    #[arg(short = 'n', long)]
    namespace: Option<String>,

    /// Condition types to read from `.status.conditions`
    #[arg(long, value_delimiter = ',')]
    conditions: Vec<String>,

    /// Extra fields as `key={jsonpath}`
    #[arg(long = "field", value_name = "KEY=JSONPATH")]
    fields: Vec<String>,

    /// Expected values (`key=value`)
    #[arg(long = "expect", value_name = "KEY=VALUE", required = true)]
    expect: Vec<String>,

    /// Comparison mode
    #[arg(long, default_value = "exact")]
    mode: MatchMode,
}

#[derive(Debug, Args)]
struct RolloutArgs {
    /// Resource kind (deployment, statefulset, machineset, ...)
    #[arg(required_unless_present = "control_plane")]
    kind: Option<String>,

    /// Resource name
    #[arg(required_unless_present = "control_plane")]
    name: Option<String>,

    /// Namespace
    #[arg(short = 'n', long)]
    namespace: Option<String>,

    /// Wait for the control plane machine set instead
    #[arg(long, conflicts_with_all = ["kind", "name"])]
    control_plane: bool,
}

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("clusterwait")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(LogFormat::from_env()).map_err(|e| anyhow!(e))?;
    debug!("Logging initialized with file and line number tracking");

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(interval) = cli.interval {
        config.poll.interval_secs = interval;
    }
    if let Some(timeout) = cli.timeout {
        config.poll.timeout_secs = timeout;
    }
    config.validate()?;

    let client: Box<dyn ClusterClient> = match config.backend {
        Backend::Oc => Box::new(OcClient::from_config(&config)),
        Backend::Kube => Box::new(KubeClusterClient::from_config(&config).await?),
    };
    debug!(backend = ?config.backend, "Cluster client initialized");

    let mut spec = effective_spec(client.as_ref(), config.poll_spec(), config.timeout_multiplier()).await;
    if cli.stable {
        spec = spec.with_stability(config.stable_delay());
    }
    info!(interval = ?spec.interval, timeout = ?spec.timeout, "Starting wait");

    let outcomes = match cli.command {
        Command::Operator(args) => operator(client.as_ref(), args, &spec).await?,
        Command::Condition(args) => vec![condition(client.as_ref(), args, &spec).await?],
        Command::Rollout(args) => vec![rollout(client.as_ref(), args, &config, &spec).await?],
    };

    let failed = outcomes
        .iter()
        .filter(|(target, outcome)| match outcome {
            Outcome::Converged(snapshot) => {
                info!(resource = %target, observed = %snapshot, "Converged");
                false
            }
            Outcome::TimedOut(report) => {
                error!(resource = %target, "{report}");
                true
            }
            Outcome::QueryError(e) => {
                error!(resource = %target, error = %e, "Wait cannot converge");
                true
            }
        })
        .count();

    if failed > 0 {
        bail!("{failed} of {} wait(s) did not converge", outcomes.len());
    }
    Ok(())
}

async fn operator(
    client: &dyn ClusterClient,
    args: OperatorArgs,
    spec: &PollSpec,
) -> Result<Vec<(String, Outcome)>> {
    let names = if args.all {
        list_cluster_operators(client)
            .await
            .context("failed to list cluster operators")?
    } else {
        args.names
    };
    if names.is_empty() {
        bail!("no cluster operators given; pass names or --all");
    }

    if args.expect.is_empty() {
        return Ok(wait_cos_healthy(client, &names, spec).await);
    }

    let expected = parse_expected(&args.expect)?;
    let waits = names.into_iter().map(|name| {
        let expected = &expected;
        async move {
            let outcome = wait_co_becomes(client, &name, expected, spec).await;
            (name, outcome)
        }
    });
    Ok(join_all(waits).await)
}

async fn condition(
    client: &dyn ClusterClient,
    args: ConditionArgs,
    spec: &PollSpec,
) -> Result<(String, Outcome)> {
    let target = match (args.name, args.selector) {
        (_, Some(selector)) => Target::Selected {
            kind: args.kind,
            namespace: args.namespace,
            selector,
        },
        (Some(name), None) => Target::Named(ResourceRef {
            kind: args.kind,
            name,
            namespace: args.namespace,
        }),
        (None, None) => bail!("either a name or --selector is required"),
    };

    let names: Vec<&str> = args.conditions.iter().map(String::as_str).collect();
    let mut query = ConditionQuery::conditions(client, target, &names);
    for field in &args.fields {
        let (key, path) = field
            .split_once('=')
            .ok_or_else(|| anyhow!("field '{field}' is not KEY=JSONPATH"))?;
        let path = FieldPath::parse(path).with_context(|| format!("invalid jsonpath for '{key}'"))?;
        query = query.field(key, path);
    }

    let expected = parse_expected(&args.expect)?;
    let outcome = run(spec, &query, &expected, args.mode).await;
    Ok((query.target().to_string(), outcome))
}

async fn rollout(
    client: &dyn ClusterClient,
    args: RolloutArgs,
    config: &Config,
    spec: &PollSpec,
) -> Result<(String, Outcome)> {
    let (target, fields) = if args.control_plane {
        (
            control_plane_machine_set(&config.machine_api_namespace),
            MACHINE_SET_ROLLOUT_FIELDS,
        )
    } else {
        let (Some(kind), Some(name)) = (args.kind, args.name) else {
            bail!("kind and name are required unless --control-plane is set");
        };
        let fields = if kind.to_ascii_lowercase().contains("machineset") {
            MACHINE_SET_ROLLOUT_FIELDS
        } else {
            WORKLOAD_ROLLOUT_FIELDS
        };
        let target = match args.namespace {
            Some(ns) => ResourceRef::namespaced(kind, name, ns),
            None => ResourceRef::cluster(kind, name),
        };
        (target, fields)
    };

    let outcome = wait_for_rollout(client, &target, fields, spec).await;
    Ok((target.to_string(), outcome))
}

fn parse_expected(pairs: &[String]) -> Result<ConditionSet> {
    ConditionSet::parse_pairs(pairs.iter().map(String::as_str))
        .map_err(|pair| anyhow!("expected value '{pair}' is not KEY=VALUE"))
}
