//! Generic CLI commands for one resource collection.
//!
//! The binary mounts [`ResourceCommand`] once per entity and hands it to
//! [`run`] with a client bound to that entity's collection.

use std::io::Write;

use clap::Subcommand;
use serde_json::Value;
use tracing::debug;

use crate::document;
use crate::envelope::{ListResult, Status};
use crate::error::{ClientError, Result};
use crate::output;
use crate::traits::{ListQuery, ResourceApi};

/// Subcommands shared by every resource.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum ResourceCommand {
    /// List active records
    List {
        /// Equality filter, repeatable
        #[arg(short, long = "filter", value_name = "FIELD=VALUE", value_parser = parse_filter)]
        filters: Vec<(String, String)>,

        #[arg(long)]
        offset: Option<u64>,

        #[arg(long)]
        limit: Option<u64>,
    },
    /// Show every version, of one record or of all records
    History {
        /// URN, surrogate id, or name
        identifier: Option<String>,
    },
    /// Create records from a JSON or YAML document
    Create {
        /// File path, '-' for stdin, or inline JSON
        data: String,
    },
    /// Show the active version of a record
    Show {
        /// URN, surrogate id, or name
        identifier: String,
    },
    /// Delete a record
    Delete {
        /// URN, surrogate id, or name
        identifier: String,
    },
    /// Update a record from a JSON or YAML document
    Update {
        /// URN, surrogate id, or name
        identifier: String,
        /// File path, '-' for stdin, or inline JSON
        data: String,
    },
}

fn parse_filter(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((field, value)) if !field.is_empty() => Ok((field.to_string(), value.to_string())),
        _ => Err(format!("expected FIELD=VALUE, got '{}'", raw)),
    }
}

/// Execute one command, writing results to `out`.
///
/// Documents are applied in order; the first failure stops the command.
pub async fn run<A>(api: &A, command: ResourceCommand, out: &mut dyn Write) -> Result<()>
where
    A: ResourceApi + ?Sized,
{
    debug!(collection = api.collection(), command = ?command, "running resource command");

    match command {
        ResourceCommand::List {
            filters,
            offset,
            limit,
        } => {
            let query = ListQuery {
                filters,
                offset,
                limit,
            };
            let result = api.list(&query).await?;
            print_records(out, result)?;
        }
        ResourceCommand::History { identifier } => {
            let result = match identifier {
                Some(identifier) => api.history(&identifier).await?,
                None => api.list_history(&ListQuery::default()).await?,
            };
            print_records(out, result)?;
        }
        ResourceCommand::Create { data } => {
            for body in document::load(&data)? {
                let result = api.create(&body).await?;
                print_status(out, result.status)?;
            }
        }
        ResourceCommand::Show { identifier } => {
            let result = api.get(&identifier).await?;
            let records: Vec<Value> = result.record.into_iter().collect();
            writeln!(out, "{}", output::table(&records))?;
        }
        ResourceCommand::Delete { identifier } => {
            let result = api.delete(&identifier).await?;
            print_status(out, result.status)?;
        }
        ResourceCommand::Update { identifier, data } => {
            for body in document::load(&data)? {
                let result = api.update(&identifier, &body).await?;
                print_status(out, result.status)?;
            }
        }
    }
    Ok(())
}

fn print_records(out: &mut dyn Write, result: ListResult<Value>) -> Result<()> {
    if result.records.is_empty() {
        writeln!(out, "No items found")?;
    } else {
        writeln!(out, "{}", output::table(&result.records))?;
    }
    Ok(())
}

fn print_status(out: &mut dyn Write, status: Status) -> Result<()> {
    writeln!(out, "{}", status)?;
    Ok(())
}

/// Write a failed command's error: the structured details when the server
/// sent them, the raw body otherwise.
pub fn report_error(err: &ClientError, out: &mut dyn Write) -> std::io::Result<()> {
    match err {
        ClientError::Api {
            status,
            details,
            body,
        } => {
            writeln!(out, "ERROR {}", status)?;
            if details.is_empty() {
                writeln!(out, "{}", body)?;
            }
            for detail in details {
                writeln!(out, "  {}", detail)?;
            }
        }
        other => writeln!(out, "ERROR {}", other)?,
    }
    Ok(())
}
