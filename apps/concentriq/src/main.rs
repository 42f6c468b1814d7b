//! Concentriq from the command line.
//!
//! Subcommands mirror the platform's resources: groups, organizations,
//! image sets, folders, images, and annotations. Every listing supports
//! `--json` for machine output; the default rendering is terse text.
//!
//! Credentials come from `~/.secrets/concentriq.json` (see
//! `concentriq-client`), overridable per-invocation with `--secrets` or the
//! `CONCENTRIQ_*` environment variables.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use concentriq_client::{Client, ClientConfig, ClientError};
use concentriq_model::{AnnotationFilters, FolderFilters, ImageFilters, SortBy};

#[derive(Debug, Parser)]
#[command(name = "concentriq", version, about = "Concentriq digital pathology from the command line")]
struct Cli {
    /// Path to the secrets file.
    #[arg(long, global = true)]
    secrets: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Groups you belong to.
    #[command(subcommand)]
    Group(GroupCommand),
    /// Organizations (admin only).
    #[command(subcommand)]
    Org(OrgCommand),
    /// Image sets (repositories).
    #[command(subcommand)]
    Imageset(ImagesetCommand),
    /// Folders inside image sets.
    #[command(subcommand)]
    Folder(FolderCommand),
    /// Whole-slide images.
    #[command(subcommand)]
    Image(ImageCommand),
    /// Annotations.
    #[command(subcommand)]
    Annotation(AnnotationCommand),
    /// Local configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
enum GroupCommand {
    /// List available groups.
    List,
    /// Detailed info about one group.
    Info { id: i64 },
}

#[derive(Debug, Subcommand)]
enum OrgCommand {
    /// List organizations.
    List,
}

#[derive(Debug, Subcommand)]
enum ImagesetCommand {
    /// List image sets.
    List,
    /// Detailed info about one image set.
    Info { id: i64 },
    /// Create an image set inside a group.
    Create {
        name: String,
        #[arg(long)]
        group: i64,
    },
    /// Delete an image set.
    Delete { id: i64 },
    /// Export an image set's metadata as CSV.
    ExportCsv {
        id: i64,
        /// Write to a file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
enum FolderCommand {
    /// List folders.
    List {
        /// Restrict to one image set.
        #[arg(long)]
        imageset: Option<i64>,
        /// Include per-folder metadata.
        #[arg(long)]
        include_metadata: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ImageCommand {
    /// List images.
    List {
        /// Restrict to one image set.
        #[arg(long)]
        imageset: Option<i64>,
        /// Filter by name.
        #[arg(long)]
        name: Option<String>,
        /// Walk all pages instead of the unpaginated listing.
        #[arg(long)]
        all: bool,
    },
    /// Detailed info about one image.
    Info { id: i64 },
    /// Upload a slide file into an image set.
    Upload {
        path: PathBuf,
        #[arg(long)]
        imageset: i64,
        /// Optional destination folder.
        #[arg(long)]
        folder: Option<i64>,
    },
    /// Resolve the pre-signed download URL of an image.
    DownloadUrl { id: i64 },
    /// Delete an image.
    Delete { id: i64 },
}

#[derive(Debug, Subcommand)]
enum AnnotationCommand {
    /// List annotations.
    List {
        /// Restrict to one image.
        #[arg(long)]
        image: Option<i64>,
    },
    /// Export an image's annotations as GeoJSON.
    ExportGeojson {
        image: i64,
        /// Write to a file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Skip shapes without a GeoJSON representation.
        #[arg(long)]
        ignore_unsupported: bool,
    },
    /// Import annotations from a GeoJSON file.
    ImportGeojson {
        image: i64,
        path: PathBuf,
        /// Keep going when the API rejects a feature.
        #[arg(long)]
        skip_errors: bool,
    },
    /// Import annotations from the XML exchange format.
    ImportXml { image: i64, path: PathBuf },
    /// Export an image's annotations as the XML exchange format.
    ExportXml {
        image: i64,
        /// Write to a file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Show the active configuration (password elided).
    Show,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .expect("static filter is valid");
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => Ok(()),
        // Platform errors get the terse rendering the API intended, not a
        // backtrace-laden crash.
        Err(err) => match err.downcast_ref::<ClientError>() {
            Some(ClientError::Api(_)) => {
                eprintln!("{err}");
                std::process::exit(1);
            }
            _ => Err(err),
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ClientConfig::from_secrets_file(cli.secrets.as_deref())
        .context("cannot load configuration; create a secrets file or set CONCENTRIQ_* variables")?;

    if let Command::Config(ConfigCommand::Show) = &cli.command {
        return show_config(&config, cli.json);
    }

    let client = Client::new(config)?;
    let json = cli.json;

    match cli.command {
        Command::Group(command) => run_group(&client, command, json).await,
        Command::Org(command) => run_org(&client, command, json).await,
        Command::Imageset(command) => run_imageset(&client, command, json).await,
        Command::Folder(command) => run_folder(&client, command, json).await,
        Command::Image(command) => run_image(&client, command, json).await,
        Command::Annotation(command) => run_annotation(&client, command, json).await,
        Command::Config(_) => unreachable!("handled before client construction"),
    }
}

fn show_config(config: &ClientConfig, json: bool) -> Result<()> {
    if json {
        print_json(&serde_json::json!({
            "apiUrl": config.api_url,
            "user": config.user,
            "sslCertificate": config.ssl_certificate,
        }))
    } else {
        println!("api_url: {}", config.api_url);
        println!("user: {}", config.user);
        if let Some(cert) = &config.ssl_certificate {
            println!("ssl_certificate: {}", cert.display());
        }
        Ok(())
    }
}

async fn run_group(client: &Client, command: GroupCommand, json: bool) -> Result<()> {
    match command {
        GroupCommand::List => {
            let groups = client.group_list().await?;
            if json {
                return print_json(&groups);
            }
            for group in groups {
                println!(
                    "{:>6}  {:<32} {:>10}  {}",
                    group.id,
                    group.name,
                    group
                        .image_set_count
                        .map_or_else(|| "-".to_owned(), |count| count.to_string()),
                    group.owner_name,
                );
            }
            Ok(())
        }
        GroupCommand::Info { id } => {
            let group = client.group_get(id).await?;
            print_json(&group)
        }
    }
}

async fn run_org(client: &Client, command: OrgCommand, json: bool) -> Result<()> {
    match command {
        OrgCommand::List => {
            let organizations = client.organization_list().await?;
            if json {
                return print_json(&organizations);
            }
            for organization in organizations {
                println!(
                    "{:>6}  {:<32} {}",
                    organization.id, organization.name, organization.billing_email
                );
            }
            Ok(())
        }
    }
}

async fn run_imageset(client: &Client, command: ImagesetCommand, json: bool) -> Result<()> {
    match command {
        ImagesetCommand::List => {
            let imagesets = client.imageset_list().await?;
            if json {
                return print_json(&imagesets);
            }
            for imageset in imagesets {
                println!(
                    "{:>6}  {:<40} {:>6} images  {}",
                    imageset.id, imageset.name, imageset.image_count, imageset.owner_name,
                );
            }
            Ok(())
        }
        ImagesetCommand::Info { id } => {
            let imageset = client.imageset_get(id).await?;
            print_json(&imageset)
        }
        ImagesetCommand::Create { name, group } => {
            let imageset = client.imageset_create(&name, group).await?;
            if json {
                return print_json(&imageset);
            }
            println!("created image set {} ({})", imageset.id, imageset.name);
            Ok(())
        }
        ImagesetCommand::Delete { id } => {
            let deleted = client.imageset_delete(id).await?;
            println!("{}", if deleted { "deleted" } else { "not deleted" });
            Ok(())
        }
        ImagesetCommand::ExportCsv { id, output } => {
            let csv = client.imageset_export_metadata_csv(id).await?;
            write_output(output, &csv)
        }
    }
}

async fn run_folder(client: &Client, command: FolderCommand, json: bool) -> Result<()> {
    match command {
        FolderCommand::List {
            imageset,
            include_metadata,
        } => {
            let filters = imageset.map(|id| FolderFilters {
                image_set_id: Some(vec![id]),
                ..FolderFilters::default()
            });
            let folders = client.folder_list(filters.as_ref(), include_metadata).await?;
            if json {
                return print_json(&folders);
            }
            for folder in folders {
                println!(
                    "{:>6}  {:<40} set {:>6}  {}",
                    folder.id, folder.label, folder.image_set_id, folder.image_set_name,
                );
            }
            Ok(())
        }
    }
}

async fn run_image(client: &Client, command: ImageCommand, json: bool) -> Result<()> {
    match command {
        ImageCommand::List {
            imageset,
            name,
            all,
        } => {
            let mut filters = ImageFilters::default();
            if let Some(id) = imageset {
                filters.image_set_id = Some(vec![id]);
            }
            if let Some(name) = name {
                filters.name = Some(vec![name]);
            }
            let filters =
                (filters.image_set_id.is_some() || filters.name.is_some()).then_some(filters);

            let images = if all {
                client
                    .image_list_all(filters.as_ref(), 200, SortBy::Created, false)
                    .await?
            } else {
                client.image_list(filters.as_ref()).await?
            };

            if json {
                return print_json(&images);
            }
            for image in images {
                println!(
                    "{:>7}  {:<48} {:>11}  {:?}",
                    image.id, image.name, image.filesize, image.status,
                );
            }
            Ok(())
        }
        ImageCommand::Info { id } => {
            let image = client.image_get(id).await?;
            print_json(&image)
        }
        ImageCommand::Upload {
            path,
            imageset,
            folder,
        } => {
            let image = client.image_upload(&path, imageset, folder).await?;
            if json {
                return print_json(&image);
            }
            println!("uploaded image {} ({:?})", image.id, image.status);
            Ok(())
        }
        ImageCommand::DownloadUrl { id } => {
            let url = client.image_download_url(id).await?;
            println!("{url}");
            Ok(())
        }
        ImageCommand::Delete { id } => {
            let deleted = client.image_delete(id).await?;
            println!("{}", if deleted { "deleted" } else { "not deleted" });
            Ok(())
        }
    }
}

async fn run_annotation(client: &Client, command: AnnotationCommand, json: bool) -> Result<()> {
    match command {
        AnnotationCommand::List { image } => {
            let filters = image.map(|id| AnnotationFilters {
                image_id: Some(vec![id]),
                ..AnnotationFilters::default()
            });
            let annotations = client.annotation_list(filters.as_ref()).await?;
            if json {
                return print_json(&annotations);
            }
            for annotation in annotations {
                println!(
                    "{:>7}  image {:>7}  {:<10} {}",
                    annotation.id.unwrap_or_default(),
                    annotation.image_id,
                    annotation.shape,
                    annotation.text,
                );
            }
            Ok(())
        }
        AnnotationCommand::ExportGeojson {
            image,
            output,
            ignore_unsupported,
        } => {
            let features = client
                .annotation_export_geojson(image, ignore_unsupported)
                .await?;
            let rendered = serde_json::to_string_pretty(&features)?;
            write_output(output, &rendered)
        }
        AnnotationCommand::ImportGeojson {
            image,
            path,
            skip_errors,
        } => {
            let created = client
                .annotation_import_geojson(&path, image, skip_errors)
                .await?;
            println!("imported {} annotations", created.len());
            Ok(())
        }
        AnnotationCommand::ImportXml { image, path } => {
            client.annotation_import_xml(&path, image).await?;
            println!("imported annotations from {}", path.display());
            Ok(())
        }
        AnnotationCommand::ExportXml { image, output } => {
            let xml = client.annotation_export_xml(image).await?;
            write_output(output, &xml)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_output(output: Option<PathBuf>, contents: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(&path, contents)
                .with_context(|| format!("cannot write {}", path.display()))?;
            println!("wrote {}", path.display());
        }
        None => println!("{contents}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_should_have_consistent_command_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_should_parse_representative_invocations() {
        let cli = Cli::try_parse_from(["concentriq", "group", "list", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Command::Group(GroupCommand::List)));

        let cli = Cli::try_parse_from([
            "concentriq",
            "image",
            "upload",
            "slide.svs",
            "--imageset",
            "7",
            "--folder",
            "3",
        ])
        .unwrap();
        match cli.command {
            Command::Image(ImageCommand::Upload {
                path,
                imageset,
                folder,
            }) => {
                assert_eq!(path, PathBuf::from("slide.svs"));
                assert_eq!(imageset, 7);
                assert_eq!(folder, Some(3));
            }
            other => panic!("unexpected parse: {other:?}"),
        }

        let cli = Cli::try_parse_from([
            "concentriq",
            "annotation",
            "export-geojson",
            "42",
            "--ignore-unsupported",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Annotation(AnnotationCommand::ExportGeojson {
                image: 42,
                output: None,
                ignore_unsupported: true,
            })
        ));
    }

    #[test]
    fn test_should_reject_upload_without_imageset() {
        let result = Cli::try_parse_from(["concentriq", "image", "upload", "slide.svs"]);
        assert!(result.is_err());
    }
}
