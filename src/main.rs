//! `parts-catalog` command-line front end
//!
//! A thin text view over the catalog session: load the data file, run one
//! command, print the result, and save the file back after mutations.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use parts_catalog::{
    CatalogConfig, CatalogError, CatalogSession, DataSource, Part, PartFields,
};

#[derive(Debug, Parser)]
#[command(name = "parts-catalog", version, about = "Browse and edit an images.json parts catalog")]
struct Cli {
    /// Catalog document to load (overrides the config file)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Per-image probe timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the visible part cards
    List {
        /// Only show this customer's parts (exact name)
        #[arg(long)]
        customer: Option<String>,
        /// Case-insensitive search across all fields
        #[arg(long, short)]
        query: Option<String>,
    },
    /// Print the customer navigation summary
    Groups,
    /// Add a part and save the catalog
    Add(FieldArgs),
    /// Edit a part and save the catalog
    Edit {
        id: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Soft-delete a part and save the catalog
    Delete { id: String },
    /// Merge another images.json into the catalog and save it
    Import { file: PathBuf },
    /// Write the catalog, deleted parts included, to a file
    Export { out: PathBuf },
}

/// Form fields; on edit, omitted flags keep the stored value
#[derive(Debug, Args)]
struct FieldArgs {
    #[arg(long)]
    customer_group: Option<String>,
    #[arg(long)]
    customer: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    part_no: Option<String>,
    #[arg(long)]
    contribution: Option<String>,
    #[arg(long)]
    classification: Option<String>,
    #[arg(long)]
    segment: Option<String>,
    #[arg(long)]
    weight: Option<String>,
    #[arg(long)]
    image: Option<String>,
}

impl FieldArgs {
    fn apply(self, base: PartFields) -> PartFields {
        PartFields {
            customer_group: self.customer_group.unwrap_or(base.customer_group),
            customer_name: self.customer.unwrap_or(base.customer_name),
            model: self.model.unwrap_or(base.model),
            part_name: self.name.unwrap_or(base.part_name),
            part_no: self.part_no.unwrap_or(base.part_no),
            contribution: self.contribution.unwrap_or(base.contribution),
            classification: self.classification.unwrap_or(base.classification),
            segment: self.segment.unwrap_or(base.segment),
            component_weight: self.weight.unwrap_or(base.component_weight),
            image_locator: self.image.unwrap_or(base.image_locator),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> parts_catalog::Result<()> {
    let mut config = CatalogConfig::load(cli.config.as_deref())?;
    if let Some(data) = cli.data {
        config.data_file = data;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.probe_timeout_ms = timeout_ms;
    }

    let mut session =
        CatalogSession::with_image_root(config.resolved_image_root(), config.probe_timeout());
    // A missing data file is an empty catalog; the first save creates it.
    // Anything else aborts so a broken file is never overwritten.
    match session.load(DataSource::File(config.data_file.clone())).await {
        Ok(()) => {}
        Err(err) if is_missing_file(&err) => {
            warn!(path = %config.data_file.display(), "no catalog file yet, starting empty");
        }
        Err(err) => return Err(err),
    }

    match cli.command.unwrap_or(Command::List {
        customer: None,
        query: None,
    }) {
        Command::List { customer, query } => {
            let title = customer.as_deref().unwrap_or("ALL PARTS").to_string();
            session.set_active_customer(customer);
            if let Some(query) = query {
                session.set_query(query);
            }
            print_cards(&title, session.visible_parts());
        }
        Command::Groups => {
            println!("ALL Customers ({})", session.view().available);
            for (customer, parts) in session.customer_groups() {
                println!("  {customer} ({})", parts.len());
            }
        }
        Command::Add(fields) => {
            let part = session.add(fields.apply(PartFields::new())).await?;
            report_saved("added", &part);
            session.export_to(&config.data_file).await?;
        }
        Command::Edit { id, fields } => {
            let base = session
                .library()
                .get(&id)
                .map(PartFields::from_part)
                .unwrap_or_default();
            let part = session.update(&id, fields.apply(base)).await?;
            report_saved("updated", &part);
            session.export_to(&config.data_file).await?;
        }
        Command::Delete { id } => {
            session.delete(&id)?;
            println!("deleted {id} (soft)");
            session.export_to(&config.data_file).await?;
        }
        Command::Import { file } => {
            let summary = session.import_file(&file).await?;
            println!(
                "merged {}: {} replaced, {} added, {} with valid images",
                file.display(),
                summary.replaced,
                summary.appended,
                summary.valid
            );
            session.export_to(&config.data_file).await?;
        }
        Command::Export { out } => {
            session.export_to(&out).await?;
            println!("exported {} parts to {}", session.library().len(), out.display());
        }
    }

    Ok(())
}

fn print_cards(title: &str, parts: &[Part]) {
    println!("{title}: {} parts", parts.len());
    for part in parts {
        println!();
        println!("[{}] {} / {}", part.id, part.customer_group(), part.customer_name());
        println!("  model:          {}", part.model());
        println!("  part:           {} ({})", part.part_name(), part.part_no());
        println!("  contribution:   {}", part.contribution());
        println!("  classification: {}", part.classification());
        println!("  segment:        {}", part.segment());
        println!("  weight:         {}", part.component_weight());
        println!("  image:          {}", part.image_locator());
    }
}

fn report_saved(action: &str, part: &Part) {
    let image = if part.image_valid {
        "image ok"
    } else {
        "image did not load; hidden until fixed"
    };
    println!("{action} {} ({image})", part.id);
}

fn is_missing_file(err: &CatalogError) -> bool {
    matches!(err, CatalogError::Io { source, .. } if source.kind() == ErrorKind::NotFound)
}
