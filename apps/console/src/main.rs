use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use resource_core::ResourceController;
use rest_adapter::{load_settings, RestAdapter, RestResourceSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{
    domain::{EntityId, FilterValue, Filters, ViewMode},
    protocol::Identifiable,
};

/// Schema-free record: any JSON object with a numeric `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Record {
    id: EntityId,
    #[serde(flatten)]
    fields: serde_json::Map<String, Value>,
}

impl Identifiable for Record {
    fn id(&self) -> EntityId {
        self.id
    }
}

#[derive(Parser, Debug)]
struct Cli {
    /// Resource path under the API root, e.g. `productos`.
    #[arg(long)]
    resource: String,
    /// Overrides the configured API root.
    #[arg(long)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List {
        /// One of: active, inactive, deleted, all.
        #[arg(long, default_value = "active")]
        view: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(long)]
        search: Option<String>,
        /// Repeatable `key=value` filter.
        #[arg(long = "filter")]
        filters: Vec<String>,
    },
    Show {
        id: i64,
    },
    Create {
        /// JSON object with the new record's fields.
        data: String,
    },
    Update {
        id: i64,
        data: String,
        /// Send only the provided fields instead of a full replacement.
        #[arg(long)]
        partial: bool,
    },
    Delete {
        id: i64,
        /// Permanent removal instead of the recoverable kind.
        #[arg(long)]
        hard: bool,
    },
    Restore {
        id: i64,
    },
    Stats,
}

type Controller = ResourceController<RestAdapter<Record>>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }
    let spec = RestResourceSpec::new(cli.resource.clone(), cli.resource.clone());
    let adapter = Arc::new(RestAdapter::from_settings(&settings, spec)?);
    let controller = ResourceController::new(adapter);

    match cli.command {
        Command::List {
            view,
            page,
            page_size,
            search,
            filters,
        } => list(&controller, &view, page, page_size, search, filters).await,
        Command::Show { id } => {
            controller.fetch_one(EntityId(id)).await;
            ensure_ok(&controller).await?;
            let state = controller.state().await;
            let record = state
                .current_item
                .ok_or_else(|| anyhow!("record {id} not loaded"))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Command::Create { data } => {
            let data: Value = serde_json::from_str(&data).context("data must be a JSON object")?;
            controller.create(data).await;
            ensure_ok(&controller).await?;
            println!("created");
            Ok(())
        }
        Command::Update { id, data, partial } => {
            let data: Value = serde_json::from_str(&data).context("data must be a JSON object")?;
            controller.update(EntityId(id), data, partial).await;
            ensure_ok(&controller).await?;
            println!("updated {id}");
            Ok(())
        }
        Command::Delete { id, hard } => {
            if hard {
                controller.hard_delete(EntityId(id)).await;
            } else {
                controller.soft_delete(EntityId(id)).await;
            }
            ensure_ok(&controller).await?;
            println!("deleted {id}");
            Ok(())
        }
        Command::Restore { id } => {
            controller.restore(EntityId(id)).await;
            ensure_ok(&controller).await?;
            println!("restored {id}");
            Ok(())
        }
        Command::Stats => {
            controller.initialize().await;
            ensure_ok(&controller).await?;
            match controller.state().await.stats {
                Some(stats) => println!("{}", serde_json::to_string_pretty(&stats)?),
                None => println!("no stats endpoint for this resource"),
            }
            Ok(())
        }
    }
}

async fn list(
    controller: &Controller,
    view: &str,
    page: u32,
    page_size: Option<u32>,
    search: Option<String>,
    raw_filters: Vec<String>,
) -> Result<()> {
    let mode = parse_view_mode(view)?;
    if mode != ViewMode::Active {
        controller.set_view_mode(mode).await;
    }
    if !raw_filters.is_empty() {
        let mut filters = Filters::new();
        for raw in &raw_filters {
            let (key, value) = parse_filter(raw)?;
            filters.insert(key, value);
        }
        controller.set_filters(filters).await;
    }
    if let Some(size) = page_size {
        controller.change_page_size(size).await;
    }

    if let Some(query) = search {
        controller.search(&query, Filters::new()).await;
    } else {
        controller.go_to_page(page).await;
    }
    ensure_ok(controller).await?;

    let state = controller.state().await;
    for record in &state.items {
        println!("{} {}", record.id.0, serde_json::to_string(&record.fields)?);
    }
    println!(
        "page {} of {} ({} items)",
        state.pagination.page, state.pagination.total_pages, state.pagination.total_items
    );
    Ok(())
}

async fn ensure_ok(controller: &Controller) -> Result<()> {
    let state = controller.state().await;
    if let Some(error) = state.error {
        if let Some(fields) = state.validation_errors {
            for (field, message) in fields {
                eprintln!("  {field}: {message}");
            }
        }
        bail!(error);
    }
    Ok(())
}

fn parse_view_mode(raw: &str) -> Result<ViewMode> {
    match raw {
        "active" => Ok(ViewMode::Active),
        "inactive" => Ok(ViewMode::Inactive),
        "deleted" => Ok(ViewMode::Deleted),
        "all" => Ok(ViewMode::All),
        other => bail!("unknown view mode '{other}'"),
    }
}

fn parse_filter(raw: &str) -> Result<(String, FilterValue)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("filter '{raw}' is not key=value"))?;
    let value = if let Ok(parsed) = value.parse::<bool>() {
        FilterValue::Bool(parsed)
    } else if let Ok(parsed) = value.parse::<i64>() {
        FilterValue::Int(parsed)
    } else if let Ok(parsed) = value.parse::<f64>() {
        FilterValue::Float(parsed)
    } else {
        FilterValue::Text(value.to_string())
    };
    Ok((key.to_string(), value))
}
