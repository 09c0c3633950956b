use anyhow::{Context as AnyhowContext, Result, bail};
use clap::{Parser, Subcommand};
use flowtext::document::format::parse_edit;
use flowtext::document::locator;
use flowtext::dsl::builder::DocumentBuilder;
use flowtext::dsl::{Interface, InterfaceInput, MAIN, NodeTemplate, Variable};
use flowtext::edit::{self, Outcome};
use flowtext::graph::Extractor;
use flowtext::loader;
use flowtext::refactor;
use flowtext::schema::ConstructSchema;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Construct schema YAML replacing the built-in catalog
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// Rewrite the document file instead of printing the result
    #[arg(long, global = true)]
    in_place: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an empty document with a `main` workflow
    Init { file: PathBuf },

    /// Print the extracted graph tree as JSON
    Tree {
        file: PathBuf,
        #[arg(long, short)]
        workflow: Option<String>,
    },

    /// Print the line range of a block
    Find {
        file: PathBuf,
        name: String,
        #[arg(long, short)]
        workflow: Option<String>,
    },

    /// List workflow names
    Workflows { file: PathBuf },

    /// Append a node with the schema's default inputs
    AddNode {
        file: PathBuf,
        opcode: String,
        #[arg(long, short, default_value = MAIN)]
        workflow: String,
        /// Template parameters (name=default)
        #[arg(long = "param", short = 'p', value_parser = parse_key_val)]
        params: Vec<(String, serde_json::Value)>,
    },

    DeleteNode { file: PathBuf, id: String },

    DuplicateNode { file: PathBuf, id: String },

    /// Point `next` (or a branch with --label) of FROM at TO
    Connect {
        file: PathBuf,
        from: String,
        to: String,
        #[arg(long, short)]
        label: Option<String>,
        /// Workflow holding FROM; needed for any `start` but the first
        #[arg(long, short)]
        workflow: Option<String>,
    },

    /// Remove the connection FROM -> TO
    Disconnect {
        file: PathBuf,
        from: String,
        to: String,
        #[arg(long, short)]
        label: Option<String>,
    },

    /// Set an input from free text (`$name` is a variable)
    SetInput {
        file: PathBuf,
        node: String,
        key: String,
        value: String,
    },

    ValidateChain {
        file: PathBuf,
        #[arg(long, short, default_value = MAIN)]
        workflow: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Propose an interface for a chain
    AnalyzeChain {
        file: PathBuf,
        #[arg(long, short, default_value = MAIN)]
        workflow: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Move a chain into a new workflow and call it
    Extract {
        file: PathBuf,
        #[arg(long, short, default_value = MAIN)]
        workflow: String,
        /// Name of the new workflow
        #[arg(long, short)]
        name: String,
        /// Use the analyzed variables as the new interface
        #[arg(long)]
        infer: bool,
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

fn parse_key_val(s: &str) -> Result<(String, serde_json::Value), String> {
    let pos = s.find('=').ok_or_else(|| format!("invalid KEY=value: no `=` found in `{}`", s))?;
    let key = s[..pos].to_string();
    let val_str = &s[pos + 1..];
    let val = serde_json::from_str(val_str).unwrap_or_else(|_| serde_json::Value::String(val_str.to_string()));
    Ok((key, val))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints or saves a command outcome; a failed command is an error exit.
fn finish(file: &Path, in_place: bool, outcome: Outcome) -> Result<()> {
    if !outcome.success {
        bail!(outcome.error.unwrap_or_else(|| "command failed".to_string()));
    }
    if let Some(id) = &outcome.id {
        info!("Created {}", id);
    }
    if in_place {
        loader::save_document(file, &outcome.document)?;
        info!("Wrote {}", file.display());
    } else {
        print!("{}", outcome.document);
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let schema: ConstructSchema = loader::resolve_schema(cli.schema.as_deref())?;

    match cli.command {
        Commands::Init { file } => {
            if file.exists() {
                bail!("{} already exists", file.display());
            }
            let doc = DocumentBuilder::new().workflow(MAIN).build().build();
            loader::save_document(&file, &doc)?;
            info!("Initialized {}", file.display());
        }
        Commands::Tree { file, workflow } => {
            let doc = loader::load_document(&file)?;
            let extractor = Extractor::new(&schema);
            match workflow {
                Some(name) => {
                    let tree = extractor
                        .extract_workflow(&doc, &name)
                        .with_context(|| format!("workflow '{}' not found", name))?;
                    print_json(&tree)?;
                }
                None => print_json(&extractor.extract(&doc))?,
            }
        }
        Commands::Find {
            file,
            name,
            workflow,
        } => {
            let doc = loader::load_document(&file)?;
            let block = locator::find_block(&doc, &name, workflow.as_deref())
                .with_context(|| format!("block '{}' not found", name))?;
            println!("{}..{} indent {}", block.start, block.end, block.indent);
        }
        Commands::Workflows { file } => {
            let doc = loader::load_document(&file)?;
            for name in edit::list_workflows(&doc) {
                println!("{}", name);
            }
        }
        Commands::AddNode {
            file,
            opcode,
            workflow,
            params,
        } => {
            let doc = loader::load_document(&file)?;
            let template = params
                .into_iter()
                .fold(NodeTemplate::new(opcode.as_str()), |t, (k, v)| t.param(&k, v));
            info!("Adding {} to {}", opcode, workflow);
            let result = edit::create_node(&doc, &workflow, &template, &schema);
            finish(&file, cli.in_place, Outcome::from_created(&doc, result))?;
        }
        Commands::DeleteNode { file, id } => {
            let doc = loader::load_document(&file)?;
            info!("Deleting {}", id);
            finish(&file, cli.in_place, Outcome::from_result(&doc, edit::delete_node(&doc, &id)))?;
        }
        Commands::DuplicateNode { file, id } => {
            let doc = loader::load_document(&file)?;
            let result = edit::duplicate_node(&doc, &id);
            finish(&file, cli.in_place, Outcome::from_created(&doc, result))?;
        }
        Commands::Connect {
            file,
            from,
            to,
            label,
            workflow,
        } => {
            let doc = loader::load_document(&file)?;
            info!("Connecting {} -> {}", from, to);
            let to = Some(to.as_str());
            let result = match (label, workflow) {
                (Some(label), Some(wf)) => {
                    edit::set_branch_in(&doc, &wf, &from, &label, to, &schema)
                }
                (Some(label), None) => edit::set_branch(&doc, &from, &label, to, &schema),
                (None, Some(wf)) => edit::set_next_in(&doc, &wf, &from, to),
                (None, None) => edit::set_next(&doc, &from, to),
            };
            finish(&file, cli.in_place, Outcome::from_result(&doc, result))?;
        }
        Commands::Disconnect {
            file,
            from,
            to,
            label,
        } => {
            let doc = loader::load_document(&file)?;
            info!("Disconnecting {} -> {}", from, to);
            let result = edit::disconnect(&doc, &from, &to, label.as_deref(), &schema);
            finish(&file, cli.in_place, Outcome::from_result(&doc, result))?;
        }
        Commands::SetInput {
            file,
            node,
            key,
            value,
        } => {
            let doc = loader::load_document(&file)?;
            let value = parse_edit(&value);
            let result = edit::set_input(&doc, &node, &key, &value);
            finish(&file, cli.in_place, Outcome::from_result(&doc, result))?;
        }
        Commands::ValidateChain {
            file,
            workflow,
            ids,
        } => {
            let doc = loader::load_document(&file)?;
            let selection = refactor::validate(&doc, &workflow, &ids, &schema)?;
            print_json(&selection)?;
        }
        Commands::AnalyzeChain {
            file,
            workflow,
            ids,
        } => {
            let doc = loader::load_document(&file)?;
            let selection = refactor::validate(&doc, &workflow, &ids, &schema)?;
            let analysis =
                refactor::analyze_chain_variables(&doc, &workflow, &selection.chain, &schema)?;
            print_json(&analysis)?;
        }
        Commands::Extract {
            file,
            workflow,
            name,
            infer,
            ids,
        } => {
            let doc = loader::load_document(&file)?;
            let mut interface = Interface::default();
            let mut variables = Vec::new();
            if infer {
                let selection = refactor::validate(&doc, &workflow, &ids, &schema)?;
                let analysis =
                    refactor::analyze_chain_variables(&doc, &workflow, &selection.chain, &schema)?;
                interface.inputs = analysis
                    .inputs
                    .iter()
                    .map(|n| InterfaceInput::new(n.as_str(), "any", true))
                    .collect();
                interface.outputs = analysis.outputs.clone();
                // Outputs need a declaration inside the new workflow.
                variables = analysis
                    .outputs
                    .iter()
                    .map(|n| Variable::new(n.as_str(), serde_json::Value::Null))
                    .collect();
            }
            let extraction =
                refactor::extract(&doc, &workflow, &ids, &name, &interface, &variables, &schema)?;
            info!(
                "Extracted {} nodes into {} (call node {})",
                extraction.moved.len(),
                extraction.workflow,
                extraction.call_id
            );
            let outcome = Outcome::from_created(&doc, Ok((extraction.document, extraction.call_id)));
            finish(&file, cli.in_place, outcome)?;
        }
    }
    Ok(())
}
