//! Command-line entry points.
//!
//! Usage:
//!   strokewatch serve [--bind <addr>]
//!   strokewatch import [<csv>]
//!   strokewatch train --input-csv <csv> [--output-model <path>] [--c <C>] [--penalty l2|none]
//!   strokewatch sync-mirror [--rebuild] [--requeue-parked] [--limit <n>]

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::api;
use crate::config::{AppConfig, ConfigError, DEFAULT_RELAY_BATCH};
use crate::core_state::{CoreError, CoreState};
use crate::db::repository::{count_parked_mirror_events, count_pending_mirror_events};
use crate::db::DatabaseError;
use crate::import::{import_patients, ImportError};
use crate::mirror::MirrorError;
use crate::training::{train_and_save, Penalty, TrainConfig, TrainingError};

#[derive(Parser)]
#[command(name = "strokewatch")]
#[command(version)]
#[command(about = "Patient records with a mirrored document store and stroke-risk scoring", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory (overrides STROKEWATCH_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Model artifact path (overrides STROKEWATCH_MODEL_PATH)
    #[arg(long, global = true)]
    pub model: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API and the mirror relay
    Serve {
        /// Listen address, e.g. 127.0.0.1:8080
        #[arg(long)]
        bind: Option<std::net::SocketAddr>,
    },

    /// Load patients from a stroke dataset CSV into the record store
    Import {
        #[arg(default_value = "data/patients.csv")]
        csv: PathBuf,
    },

    /// Train the stroke-risk model and write the artifact
    Train {
        /// Path to the stroke dataset CSV
        #[arg(long)]
        input_csv: PathBuf,

        /// Where to save the trained model (defaults to the configured model path)
        #[arg(long)]
        output_model: Option<PathBuf>,

        /// Version tag stored in the bundle
        #[arg(long, default_value = "logreg_v1")]
        model_version: String,

        /// Inverse regularization strength
        #[arg(long = "C", alias = "c", default_value_t = 1.0)]
        c: f64,

        /// Regularization: l2 or none
        #[arg(long, default_value = "l2")]
        penalty: Penalty,

        #[arg(long, default_value_t = 1000)]
        max_iter: usize,

        /// Fraction of rows held out for evaluation
        #[arg(long, default_value_t = 0.2)]
        test_size: f64,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Push pending record-store changes to the mirror
    ///
    /// Do not run this while `serve` is up against the same data directory:
    /// event ordering is only guaranteed within one process, so a stale
    /// upsert could land after a delete.
    SyncMirror {
        /// Queue every patient first, repopulating the mirror from scratch
        #[arg(long)]
        rebuild: bool,

        /// Replace parked events with fresh ones built from the current rows
        #[arg(long)]
        requeue_parked: bool,

        /// Maximum events applied per pass
        #[arg(long, default_value_t = DEFAULT_RELAY_BATCH)]
        limit: usize,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Training(#[from] TrainingError),
    #[error(transparent)]
    Mirror(#[from] MirrorError),
    #[error("{0}")]
    Server(String),
}

impl Cli {
    /// Environment configuration with command-line overrides applied.
    pub fn config(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::from_env()?;
        if let Some(dir) = &self.data_dir {
            config = config.with_data_dir(dir);
        }
        if let Some(model) = &self.model {
            config.model_path = model.clone();
        }
        if let Commands::Serve { bind: Some(bind) } = &self.command {
            config.bind_addr = *bind;
        }
        Ok(config)
    }

    pub fn execute(self) -> Result<(), CliError> {
        let config = self.config()?;
        match self.command {
            Commands::Serve { .. } => {
                let core = Arc::new(CoreState::bootstrap(config)?);
                let runtime = tokio::runtime::Runtime::new().map_err(CoreError::Io)?;
                runtime.block_on(api::serve(core)).map_err(CliError::Server)
            }
            Commands::Import { csv } => {
                let core = CoreState::bootstrap(config)?;
                let conn = core.open_db()?;
                let report = import_patients(&conn, &csv)?;
                println!("Imported {} patients from {}", report.imported, csv.display());
                println!("Run `strokewatch sync-mirror --rebuild` to populate the mirror.");
                Ok(())
            }
            Commands::Train {
                input_csv,
                output_model,
                model_version,
                c,
                penalty,
                max_iter,
                test_size,
                seed,
            } => {
                let output = output_model.unwrap_or_else(|| config.model_path.clone());
                let cfg = TrainConfig {
                    c,
                    penalty,
                    max_iter,
                    test_size,
                    seed,
                    version: model_version,
                    ..TrainConfig::new(&input_csv, &output)
                };
                let report = train_and_save(&cfg)?;

                println!("Samples: {}, classes: {}", report.samples, report.classes);
                if !report.held_out {
                    println!("Dataset too small or single-class: trained and evaluated on all rows.");
                }
                println!("Accuracy: {:.4}", report.accuracy);
                match report.roc_auc {
                    Some(auc) => println!("ROC-AUC: {auc:.4}"),
                    None => println!("Skipping ROC-AUC (only one class in evaluation set)."),
                }
                println!("Classification report:\n{}", report.classification);
                println!("Model saved to {}", report.output.display());
                Ok(())
            }
            Commands::SyncMirror {
                rebuild,
                requeue_parked,
                limit,
            } => {
                let core = CoreState::bootstrap(config)?;
                let conn = core.open_db()?;
                if requeue_parked {
                    let requeued = core.relay().requeue_parked(&conn)?;
                    println!("Requeued {requeued} parked patients");
                }
                if rebuild {
                    let queued = core.relay().rebuild(&conn)?;
                    println!("Queued {queued} patients for the mirror");
                }

                let mut applied = 0;
                loop {
                    let report = core.relay().drain(&conn, limit.max(1))?;
                    applied += report.applied;
                    if report.failed > 0 || report.applied + report.parked == 0 {
                        break;
                    }
                }
                let pending = count_pending_mirror_events(&conn)?;
                let parked = count_parked_mirror_events(&conn)?;
                println!(
                    "Applied {applied} mirror events, {pending} still pending, {parked} parked"
                );
                Ok(())
            }
        }
    }
}
