use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, ValueEnum};

use graphplan::config::Config;
use graphplan::core::PlanResult;
use graphplan::query::lurql::{LurqlPlan, LurqlQuery, ModelDefinition, ModelGraph, ModelView};
use graphplan::query::optimizer::{CostBasedPlanner, DefaultCostModel};
use graphplan::query::planner::plan::{CallingConvention, PlanNode};
use graphplan::query::planner::rewrite::{
    CollapseProjectRule, CombineFilterRule, ConverterRule, EliminateFilterRule, HeuristicPlanner,
    ImplementRule, RemoveNoopProjectRule, RewriteProgram, RuleRegistry, SharedRuleRegistry,
};
use graphplan::utils::logging;

#[derive(Parser)]
#[clap(version = "0.1.0", author = "GraphPlan Contributors")]
enum Cli {
    /// Compile a LURQL query against a model and print the plan
    Explain {
        /// Model definition (JSON)
        #[clap(short, long)]
        model: PathBuf,
        /// Query syntax tree (JSON)
        #[clap(short, long)]
        query: PathBuf,
        /// Print the plan as JSON
        #[clap(long)]
        json: bool,
        #[clap(short, long)]
        config: Option<PathBuf>,
    },
    /// Run the heuristic rewrite rules over a relational plan (JSON)
    Rewrite {
        #[clap(short, long)]
        plan: PathBuf,
        #[clap(short, long)]
        config: Option<PathBuf>,
    },
    /// Pick the cheapest physical plan for a relational plan (JSON)
    Optimize {
        #[clap(short, long)]
        plan: PathBuf,
        #[clap(long, value_enum, default_value = "iterator")]
        convention: ConventionArg,
        #[clap(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ConventionArg {
    Iterator,
    Native,
    Columnar,
}

impl From<ConventionArg> for CallingConvention {
    fn from(arg: ConventionArg) -> Self {
        match arg {
            ConventionArg::Iterator => CallingConvention::Iterator,
            ConventionArg::Native => CallingConvention::Native,
            ConventionArg::Columnar => CallingConvention::Columnar,
        }
    }
}

fn main() -> PlanResult<()> {
    let cli = Cli::parse();
    let config_path = match &cli {
        Cli::Explain { config, .. } | Cli::Rewrite { config, .. } | Cli::Optimize { config, .. } => {
            config.clone()
        }
    };
    let config = match config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    logging::init(&config.log)?;

    let result = run(cli, &config);
    if let Err(ref e) = result {
        log::error!("{}", e);
    }
    logging::shutdown();
    result
}

fn run(cli: Cli, config: &Config) -> PlanResult<()> {
    match cli {
        Cli::Explain {
            model, query, json, ..
        } => {
            let definition: ModelDefinition = read_json(&model)?;
            let query: LurqlQuery = read_json(&query)?;
            let model: Arc<dyn ModelView> = Arc::new(ModelGraph::from_definition(&definition)?);

            let plan = LurqlPlan::compile(model, &query)?;
            if json {
                println!("{}", plan.explain_json()?);
            } else {
                for line in plan.explain() {
                    println!("{}", line);
                }
            }
        }
        Cli::Rewrite { plan, .. } => {
            let plan: PlanNode = read_json(&plan)?;
            let registry = standard_registry(config)?;
            let rules = registry.read().active_rules();
            let program = RewriteProgram::builder().add_group(rules).build();

            let mut planner = HeuristicPlanner::with_config(registry, config.rewrite.clone());
            planner.set_program(program);
            planner.set_root(plan);
            let best = planner.find_best_plan()?;
            println!("{}", best);
            println!("transformations: {}", planner.stats().transformations);
        }
        Cli::Optimize {
            plan, convention, ..
        } => {
            let plan: PlanNode = read_json(&plan)?;
            let registry = standard_registry(config)?;
            {
                let mut registry = registry.write();
                for target in CallingConvention::physical() {
                    registry.add(ImplementRule::all_operators(target));
                    for from in CallingConvention::physical() {
                        if from != target {
                            registry.add(ConverterRule::new(from, target));
                        }
                    }
                }
            }

            let mut planner = CostBasedPlanner::with_config(
                registry,
                Arc::new(DefaultCostModel::new()),
                config.optimizer.clone(),
            );
            planner.set_root(&plan)?;
            let best = planner.find_best_plan(convention.into())?;
            println!("{}", best);
            if let Some(cost) = planner.stats().best_cost {
                println!("{}", cost);
            }
        }
    }
    Ok(())
}

/// 逻辑规则加上配置中的排除过滤器
fn standard_registry(config: &Config) -> PlanResult<SharedRuleRegistry> {
    let mut registry = RuleRegistry::new();
    registry.add(EliminateFilterRule::new());
    registry.add(CombineFilterRule::new());
    registry.add(RemoveNoopProjectRule::new());
    registry.add(CollapseProjectRule::new());
    registry.set_exclusion_filter(config.rewrite.exclusion_regex()?);
    Ok(registry.into_shared())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> PlanResult<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
