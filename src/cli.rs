use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

use cryptdrive::client::{open_download, seal_for_upload};
use cryptdrive::{DriveStorage, StoreConfig};

#[derive(Parser)]
#[command(name = "cryptdrive")]
#[command(about = "Encrypted, chunked drive storage", long_about = None)]
pub struct Cli {
    /// Storage root for this drive
    #[arg(short, long, env = "CRYPTDRIVE_ROOT")]
    pub root: Option<PathBuf>,

    /// JSON config file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Number of files processed at once by export and import
    #[arg(long)]
    pub workers: Option<usize>,

    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encrypt a local file into the drive
    Encrypt {
        file: PathBuf,
        #[arg(short, long, default_value = "/")]
        folder: String,
        /// Name to record instead of the local file name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Decrypt a stored file
    Decrypt {
        file_id: String,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List files in a folder
    List {
        #[arg(short, long, default_value = "/")]
        folder: String,
        /// List every file regardless of folder
        #[arg(long)]
        all: bool,
    },

    /// Show details of one file
    Info { file_id: String },

    /// Move a file to another folder
    Move { file_id: String, to: String },

    /// Delete a file
    Delete {
        file_id: String,
        /// Keep the chunk bytes on disk
        #[arg(long)]
        keep_chunks: bool,
    },

    /// Create a folder
    Mkdir {
        name: String,
        #[arg(short, long, default_value = "/")]
        parent: String,
    },

    /// List folders
    Folders {
        #[arg(short, long, default_value = "/")]
        parent: String,
        #[arg(long)]
        all: bool,
    },

    /// Show one folder record
    Folder { path: String },

    /// Delete a folder
    Rmdir {
        path: String,
        #[arg(short, long)]
        recursive: bool,
    },

    /// Show files and subfolders of a folder
    Contents {
        #[arg(default_value = "/")]
        path: String,
    },

    /// Decrypt a whole folder tree into a local directory
    Export {
        #[arg(short, long, default_value = "/")]
        folder: String,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Encrypt several local files into one folder
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(short, long, default_value = "/")]
        folder: String,
    },

    /// Check a file's chunks without decrypting it
    Verify { file_id: String },

    /// Delete chunk files that no record references
    Reconcile,

    /// Encrypt locally with a password and store only wrapped keys
    ZkUpload {
        file: PathBuf,
        #[arg(short, long, default_value = "/")]
        folder: String,
        #[arg(long, env = "CRYPTDRIVE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Fetch a zero-knowledge file and decrypt it locally
    ZkDownload {
        file_id: String,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, env = "CRYPTDRIVE_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

pub fn load_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => {
            let root = dirs::data_dir()
                .map(|dir| dir.join("cryptdrive"))
                .unwrap_or_else(|| PathBuf::from("./storage"));
            StoreConfig::new(root)
        }
    };

    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    if let Some(chunk_size) = cli.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(workers) = cli.workers {
        config.batch_width = workers;
    }
    config.validate()?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn execute_command(storage: &DriveStorage, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Encrypt { file, folder, name } => {
            let summary = storage.encrypt_file(&file, &folder, name.as_deref()).await?;
            print_json(&summary)
        }
        Commands::Decrypt { file_id, output } => {
            let path = storage.decrypt_file(&file_id, &output).await?;
            print_json(&serde_json::json!({ "file_id": file_id, "output": path }))
        }
        Commands::List { folder, all } => {
            let files = if all {
                storage.list_all_files().await?
            } else {
                storage.list_files(&folder).await?
            };
            print_json(&files)
        }
        Commands::Info { file_id } => print_json(&storage.get_file_info(&file_id).await?),
        Commands::Move { file_id, to } => {
            let record = storage.move_file(&file_id, &to).await?;
            print_json(&serde_json::json!({ "file_id": file_id, "new_folder_path": record.folder_path }))
        }
        Commands::Delete { file_id, keep_chunks } => {
            storage.delete_file(&file_id, !keep_chunks).await?;
            print_json(&serde_json::json!({ "file_id": file_id, "deleted": true }))
        }
        Commands::Mkdir { name, parent } => print_json(&storage.create_folder(&name, &parent).await?),
        Commands::Folders { parent, all } => {
            let folders = if all {
                storage.list_all_folders().await?
            } else {
                storage.list_folders(&parent).await?
            };
            print_json(&folders)
        }
        Commands::Folder { path } => match storage.get_folder(&path).await? {
            Some(folder) => print_json(&folder),
            None => anyhow::bail!("folder {} has no record", path),
        },
        Commands::Rmdir { path, recursive } => print_json(&storage.delete_folder(&path, recursive).await?),
        Commands::Contents { path } => print_json(&storage.get_folder_contents(&path).await?),
        Commands::Export { folder, output } => print_json(&storage.export_folder(&folder, &output).await?),
        Commands::Import { files, folder } => print_json(&storage.import_files(files, &folder).await?),
        Commands::Verify { file_id } => {
            storage.verify_file(&file_id).await?;
            print_json(&serde_json::json!({ "file_id": file_id, "verified": true }))
        }
        Commands::Reconcile => print_json(&storage.reconcile().await?),
        Commands::ZkUpload { file, folder, password } => {
            let plaintext = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let name = file
                .file_name()
                .and_then(|n| n.to_str())
                .context("file has no usable name")?;
            let sealed = seal_for_upload(&plaintext, name, &folder, &password)?;

            // the facade takes a path, like an upload spooled to disk
            let mut spool = tempfile::NamedTempFile::new()?;
            spool.write_all(&sealed.ciphertext)?;
            spool.flush()?;
            let summary = storage
                .save_client_encrypted_file(spool.path(), sealed.upload)
                .await?;
            print_json(&summary)
        }
        Commands::ZkDownload { file_id, output, password } => {
            let payload = storage.read_client_encrypted_file(&file_id).await?;
            let (metadata, plaintext) = open_download(&payload, &password)?;
            tokio::fs::write(&output, &plaintext)
                .await
                .with_context(|| format!("failed to write {}", output.display()))?;
            print_json(&serde_json::json!({
                "file_id": file_id,
                "name": metadata.name,
                "size": metadata.size,
                "output": output,
            }))
        }
    }
}
