//! CLI binary for inspecting, validating, and normalizing route documents.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use routeweave_dsl::Format;
use routeweave_tree::{
    document_placeholders, document_to_raw, duplicate_identities, project, walk,
    ConnectorCatalog, Document, MetadataCatalog, NodeFactory, Severity, StepNode, Validator,
};
use routeweave_types::StepKind;

#[derive(Parser)]
#[command(
    name = "rw",
    version,
    about = "Inspect, validate, and normalize integration route documents"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON file overlaying the built-in step metadata catalog
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// JSON file overlaying the built-in connector catalog
    #[arg(long, global = true)]
    connectors: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a route document
    Validate {
        /// Path to the .yaml or .json document
        document: PathBuf,
    },

    /// Show a summary of a route document
    Info {
        /// Path to the .yaml or .json document
        document: PathBuf,
    },

    /// List the {{placeholders}} a document uses
    Placeholders {
        /// Path to the .yaml or .json document
        document: PathBuf,
    },

    /// Print the step tree of a document
    Tree {
        /// Path to the .yaml or .json document
        document: PathBuf,

        /// Identity of the selected step; step groups on its path are expanded
        #[arg(short, long)]
        select: Option<String>,

        /// Show steps inside collapsed step groups too
        #[arg(long)]
        all: bool,
    },

    /// Rewrite a document in canonical form, minting missing identities
    Normalize {
        /// Path to the .yaml or .json document
        document: PathBuf,

        /// Output file (format by extension); prints to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Give every step a fresh identity
        #[arg(long)]
        regenerate: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let catalogs = Catalogs::load(cli.catalog.as_deref(), cli.connectors.as_deref())?;

    match cli.command {
        Commands::Validate { document } => {
            cmd_validate(&catalogs, &document)?;
        }
        Commands::Info { document } => {
            cmd_info(&catalogs, &document)?;
        }
        Commands::Placeholders { document } => {
            cmd_placeholders(&catalogs, &document)?;
        }
        Commands::Tree { document, select, all } => {
            cmd_tree(&catalogs, &document, select.as_deref(), all)?;
        }
        Commands::Normalize {
            document,
            output,
            regenerate,
        } => {
            cmd_normalize(&catalogs, &document, output.as_deref(), regenerate)?;
        }
    }

    Ok(())
}

struct Catalogs {
    metadata: MetadataCatalog,
    connectors: ConnectorCatalog,
}

impl Catalogs {
    fn load(metadata: Option<&Path>, connectors: Option<&Path>) -> anyhow::Result<Self> {
        let metadata = match metadata {
            Some(path) => MetadataCatalog::load(path)?,
            None => MetadataCatalog::builtin(),
        };
        let connectors = match connectors {
            Some(path) => ConnectorCatalog::load(path)?,
            None => ConnectorCatalog::builtin(),
        };
        Ok(Self {
            metadata,
            connectors,
        })
    }

    fn load_document(&self, path: &Path, regenerate: bool) -> anyhow::Result<Document> {
        let raw = routeweave_dsl::load_document(path)?;
        let factory = NodeFactory::new(&self.metadata);
        let document = factory.create_document(&raw)?;
        if !regenerate {
            return Ok(document);
        }
        Ok(Document::new(
            document
                .flows
                .iter()
                .map(|flow| factory.clone_node(flow, true))
                .collect(),
        ))
    }

    fn title(&self, node: &StepNode) -> String {
        if node.kind == StepKind::Opaque {
            format!("{} (unknown)", node.kind_name())
        } else {
            self.metadata.display_title(node.kind)
        }
    }
}

fn cmd_validate(catalogs: &Catalogs, path: &Path) -> anyhow::Result<()> {
    let document = catalogs.load_document(path, false)?;
    let diagnostics =
        Validator::new(&catalogs.metadata, &catalogs.connectors).validate_document(&document);

    if diagnostics.is_empty() {
        println!("Document is valid");
        return Ok(());
    }

    let mut has_error = false;
    for diag in &diagnostics {
        let severity = match diag.severity {
            Severity::Error => {
                has_error = true;
                "ERROR"
            }
            Severity::Warning => "WARN",
            Severity::Info => "INFO",
        };
        match &diag.node_id {
            Some(id) => println!("[{}] {} ({}): {}", severity, diag.rule, id, diag.message),
            None => println!("[{}] {}: {}", severity, diag.rule, diag.message),
        }
        if let Some(fix) = &diag.fix {
            println!("        fix: {fix}");
        }
    }

    if has_error {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_info(catalogs: &Catalogs, path: &Path) -> anyhow::Result<()> {
    let document = catalogs.load_document(path, false)?;

    println!("Document: {}", path.display());
    println!("Flows: {}", document.len());
    println!("Steps: {}", document.node_count());

    let duplicates = duplicate_identities(&document);
    if !duplicates.is_empty() {
        println!("Duplicate identities: {}", duplicates.join(", "));
    }

    println!("\nFlows:");
    for flow in &document.flows {
        let entry = flow
            .slot("from")
            .and_then(|slot| slot.value.iter().next())
            .or((flow.kind == StepKind::From).then_some(flow))
            .and_then(|from| from.field_str("uri"));
        println!(
            "  {} [{}] nodes={}{}",
            flow.id,
            catalogs.title(flow),
            flow.identities().len(),
            entry.map(|uri| format!(" from={uri}")).unwrap_or_default()
        );
    }

    Ok(())
}

fn cmd_placeholders(catalogs: &Catalogs, path: &Path) -> anyhow::Result<()> {
    let document = catalogs.load_document(path, false)?;
    for name in document_placeholders(&document) {
        println!("{name}");
    }
    Ok(())
}

fn cmd_tree(
    catalogs: &Catalogs,
    path: &Path,
    select: Option<&str>,
    all: bool,
) -> anyhow::Result<()> {
    let document = project(&catalogs.load_document(path, false)?, select);

    let _ = walk(&document, |visit| {
        let node = visit.node;
        if !node.visible && !all {
            return ControlFlow::<()>::Continue(());
        }
        let indent = "  ".repeat(visit.depth);
        let marker = if select == Some(node.id.as_str()) { "> " } else { "" };
        let detail = node
            .field_str("uri")
            .or_else(|| node.field_str("message"))
            .or_else(|| node.expression.as_ref().and_then(|e| e.expression_text()))
            .map(|text| format!(": {text}"))
            .unwrap_or_default();
        println!("{indent}{marker}{} [{}]{detail}", catalogs.title(node), node.id);
        ControlFlow::Continue(())
    });

    Ok(())
}

fn cmd_normalize(
    catalogs: &Catalogs,
    path: &Path,
    output: Option<&Path>,
    regenerate: bool,
) -> anyhow::Result<()> {
    let document = catalogs.load_document(path, regenerate)?;
    let raw = document_to_raw(&document);

    match output {
        Some(output) => {
            routeweave_dsl::save_document(output, &raw)?;
            tracing::info!(path = %output.display(), flows = document.len(), "Wrote normalized document");
        }
        None => {
            let text = routeweave_dsl::to_string(&raw, Format::from_path(path))?;
            print!("{text}");
            if !text.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}
