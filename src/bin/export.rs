//! Schema Export CLI
//!
//! Builds the schema of one class from metadata files and prints the rendered
//! document (JSON Schema, OpenAPI components or Swagger definitions).

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use resource_schema::{
    BuildRequest, ClassSchemaBuilder, MetadataRegistry, OperationType, SchemaConfig, SchemaKind,
    SchemaVersion, SerializationContext,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-export")]
#[command(about = "Export the JSON Schema of a resource class")]
struct Cli {
    /// Metadata files (TOML or JSON), added to the configured ones
    #[arg(short, long, num_args = 1..)]
    metadata: Vec<PathBuf>,

    /// Fully qualified class name
    #[arg(short, long)]
    class: String,

    /// Serialization format (defaults to the configured one)
    #[arg(short, long)]
    format: Option<String>,

    /// Schema direction
    #[arg(short, long, value_enum, default_value_t = KindArg::Output)]
    kind: KindArg,

    /// Target vocabulary (defaults to the configured one)
    #[arg(short = 'V', long, value_enum)]
    version: Option<VersionArg>,

    /// Serializer groups, overriding operation and class defaults
    #[arg(short, long, value_delimiter = ',')]
    groups: Vec<String>,

    /// Operation type the operation name belongs to
    #[arg(long, value_enum, requires = "operation")]
    operation_type: Option<OperationTypeArg>,

    /// Operation name whose groups apply
    #[arg(long, requires = "operation_type")]
    operation: Option<String>,

    /// Config file
    #[arg(long)]
    config: Option<String>,

    /// Print compact JSON
    #[arg(long)]
    compact: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Input,
    Output,
}

#[derive(Clone, Copy, ValueEnum)]
enum VersionArg {
    JsonSchema,
    Openapi,
    Swagger,
}

#[derive(Clone, Copy, ValueEnum)]
enum OperationTypeArg {
    Item,
    Collection,
}

impl From<KindArg> for SchemaKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Input => SchemaKind::Input,
            KindArg::Output => SchemaKind::Output,
        }
    }
}

impl From<VersionArg> for SchemaVersion {
    fn from(version: VersionArg) -> Self {
        match version {
            VersionArg::JsonSchema => SchemaVersion::JsonSchema,
            VersionArg::Openapi => SchemaVersion::OpenApi,
            VersionArg::Swagger => SchemaVersion::Swagger,
        }
    }
}

impl From<OperationTypeArg> for OperationType {
    fn from(operation_type: OperationTypeArg) -> Self {
        match operation_type {
            OperationTypeArg::Item => OperationType::Item,
            OperationTypeArg::Collection => OperationType::Collection,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = SchemaConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;

    let mut metadata = MetadataRegistry::new();
    for path in config.metadata.paths.iter().chain(&cli.metadata) {
        metadata
            .load_path(path)
            .with_context(|| format!("Failed to load metadata from {}", path.display()))?;
    }
    if metadata.is_empty() {
        bail!("No class metadata loaded; pass --metadata or set [metadata] paths");
    }
    info!(classes = metadata.len(), "metadata loaded");

    let version = match cli.version {
        Some(version) => version.into(),
        None => config.schema_version().context("Invalid [schema] configuration")?,
    };
    let format = cli.format.as_deref().unwrap_or(&config.schema.default_format);

    let mut request = BuildRequest::new(&cli.class, format, cli.kind.into());
    if let (Some(operation_type), Some(operation)) = (cli.operation_type, cli.operation.as_deref()) {
        request = request.for_operation(operation_type.into(), operation);
    }

    let context = (!cli.groups.is_empty()).then(|| SerializationContext::with_groups(cli.groups.iter().cloned()));

    let builder = ClassSchemaBuilder::with_value_types(Rc::new(metadata), config.value_type_registry());
    let document = builder
        .build_schema(&request, version, None, context.as_ref())
        .with_context(|| format!("Failed to build schema for {}", cli.class))?;
    info!(definitions = document.definitions().len(), %version, "schema built");

    let rendered = document.to_json();
    let output = if cli.compact {
        serde_json::to_string(&rendered)?
    } else {
        serde_json::to_string_pretty(&rendered)?
    };
    println!("{}", output);

    Ok(())
}
