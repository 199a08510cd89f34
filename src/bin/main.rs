// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use rent_ledger::{
    DocumentRepository, JsonCollection, MemoryRepository, Record, RecordId, RecordUpdate,
    RentError, RentObject, RentObjectInfo, RentObjectRepository, RentObjectUpdate, UserId,
    logging, retry_on_conflict,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use thiserror::Error;

/// Attempts for writes that may race with another writer of the same store.
const RETRY_ATTEMPTS: usize = 3;

/// Columns an import file must carry; expense columns default to zero.
const IMPORT_REQUIRED_COLUMNS: &[&str] = &["date", "rent"];

/// Flags `add-record` cannot do without.
const ADD_RECORD_REQUIRED_FIELDS: &[&str] = &["date"];

/// Rent Ledger - Track rental properties and their income and expenses
///
/// Objects are stored per user in a JSON document file. Listings and
/// reports are written to stdout as CSV.
#[derive(Parser, Debug)]
#[command(name = "rent-ledger")]
#[command(about = "Tracks rental property ledgers", long_about = None)]
struct Cli {
    /// JSON document store; without it state lives only for this invocation
    #[arg(long, value_name = "FILE", env = "RENT_LEDGER_STORE", global = true)]
    store: Option<PathBuf>,

    /// Owner of the objects being managed
    #[arg(long, env = "RENT_LEDGER_USER", default_value_t = 1, global = true)]
    user: i64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a rent object
    AddObject {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value_t = Decimal::ZERO)]
        area: Decimal,
    },
    /// Delete a rent object and its ledger
    RemoveObject { name: String },
    /// Rename or describe a rent object
    UpdateObject {
        name: String,
        #[arg(long = "name", value_name = "NEW_NAME")]
        new_name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        area: Option<Decimal>,
    },
    /// List all rent objects with their totals
    List,
    /// Add a record; prints its position in the ledger
    AddRecord {
        name: String,
        #[command(flatten)]
        fields: RecordFields,
    },
    /// Delete the record at INDEX
    DeleteRecord { name: String, index: usize },
    /// Patch the record at INDEX with the given fields
    UpdateRecord {
        name: String,
        index: usize,
        #[command(flatten)]
        fields: RecordFields,
    },
    /// Print the ledger in date order
    Records { name: String },
    /// Append records from a CSV file
    ///
    /// Expected header: date,rent[,heat,exploitation,mop,renovation,tbo,electricity,earth_rent,other,security]
    Import {
        name: String,
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
    /// Print per-record income, expenses and profit, raw and per area
    Report { name: String },
}

/// Record fields accepted on the command line.
#[derive(Args, Debug, Default)]
struct RecordFields {
    /// RFC 3339 timestamp or YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    date: Option<DateTime<Utc>>,
    #[arg(long, allow_hyphen_values = true)]
    rent: Option<Decimal>,
    #[arg(long, allow_hyphen_values = true)]
    heat: Option<Decimal>,
    #[arg(long, allow_hyphen_values = true)]
    exploitation: Option<Decimal>,
    #[arg(long, allow_hyphen_values = true)]
    mop: Option<Decimal>,
    #[arg(long, allow_hyphen_values = true)]
    renovation: Option<Decimal>,
    #[arg(long, allow_hyphen_values = true)]
    tbo: Option<Decimal>,
    #[arg(long, allow_hyphen_values = true)]
    electricity: Option<Decimal>,
    #[arg(long, allow_hyphen_values = true)]
    earth_rent: Option<Decimal>,
    #[arg(long, allow_hyphen_values = true)]
    other: Option<Decimal>,
    #[arg(long, allow_hyphen_values = true)]
    security: Option<Decimal>,
}

impl RecordFields {
    fn into_update(self) -> RecordUpdate {
        RecordUpdate {
            date: self.date,
            rent: self.rent,
            heat: self.heat,
            exploitation: self.exploitation,
            mop: self.mop,
            renovation: self.renovation,
            tbo: self.tbo,
            electricity: self.electricity,
            earth_rent: self.earth_rent,
            other: self.other,
            security: self.security,
        }
    }

    /// Builds a new record; absent amounts are zero.
    fn into_record(self) -> Result<Record, RentError> {
        let update = self.into_update();
        let present = [update.date.is_some()];
        let missing: Vec<String> = ADD_RECORD_REQUIRED_FIELDS
            .iter()
            .zip(present)
            .filter(|(_, present)| !present)
            .map(|(field, _)| field.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(RentError::MissingFields(missing));
        }
        Ok(Record::default().update(&update))
    }
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Rent(#[from] RentError),
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

fn main() {
    logging::init_tracing();
    let cli = Cli::parse();
    let user = UserId(cli.user);

    let result = match cli.store {
        Some(path) => match JsonCollection::open(&path) {
            Ok(collection) => run(
                &DocumentRepository::new(collection),
                user,
                cli.command,
                std::io::stdout(),
            ),
            Err(e) => {
                eprintln!("Error opening store '{}': {}", path.display(), e);
                process::exit(1);
            }
        },
        None => run(&MemoryRepository::new(), user, cli.command, std::io::stdout()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Executes one command against `repository`, writing any output to `out`.
fn run<R: RentObjectRepository, W: Write>(
    repository: &R,
    user: UserId,
    command: Command,
    mut out: W,
) -> Result<(), CliError> {
    match command {
        Command::AddObject {
            name,
            description,
            area,
        } => repository.add(user, RentObject::new(name, description, area))?,
        Command::RemoveObject { name } => repository.delete(user, &name)?,
        Command::UpdateObject {
            name,
            new_name,
            description,
            area,
        } => {
            let patch = RentObjectUpdate {
                name: new_name,
                description,
                area,
            };
            retry_on_conflict(RETRY_ATTEMPTS, || repository.update(user, &name, &patch))?
        }
        Command::List => write_objects(&repository.get_all(user)?, out)?,
        Command::AddRecord { name, fields } => {
            let record = fields.into_record()?;
            let index = retry_on_conflict(RETRY_ATTEMPTS, || {
                repository.add_record(user, &name, record)
            })?;
            writeln!(out, "{}", index)?;
        }
        Command::DeleteRecord { name, index } => {
            let id = record_id_at(repository, user, &name, index)?;
            retry_on_conflict(RETRY_ATTEMPTS, || {
                repository.delete_record_by_id(user, &name, id)
            })?
        }
        Command::UpdateRecord {
            name,
            index,
            fields,
        } => {
            let patch = fields.into_update();
            let id = record_id_at(repository, user, &name, index)?;
            retry_on_conflict(RETRY_ATTEMPTS, || {
                repository.update_record_by_id(user, &name, id, &patch)
            })?
        }
        Command::Records { name } => {
            let records =
                retry_on_conflict(RETRY_ATTEMPTS, || repository.get_all_records(user, &name))?;
            let mut wtr = Writer::from_writer(out);
            for record in records {
                wtr.serialize(record)?;
            }
            wtr.flush()?;
        }
        Command::Import { name, input } => {
            let file = File::open(&input)?;
            let imported = import_records(repository, user, &name, BufReader::new(file))?;
            tracing::info!(name = %name, imported, "import finished");
            writeln!(out, "{}", imported)?;
        }
        Command::Report { name } => {
            let info = retry_on_conflict(RETRY_ATTEMPTS, || {
                repository.modify(user, &name, |object| Ok(RentObjectInfo::project(object)))
            })?;
            write_report(&info, out)?;
        }
    }
    Ok(())
}

/// Resolves a position in the stored ledger to the record's stable id.
///
/// Positions match the order last printed by `records` or `report`, so a
/// retried write keeps targeting the record the user picked even if another
/// writer reorders the ledger in between.
fn record_id_at<R: RentObjectRepository>(
    repository: &R,
    user: UserId,
    name: &str,
    index: usize,
) -> Result<RecordId, RentError> {
    repository.get_by_name(user, name)?.record_id_at(index)
}

/// Raw CSV row of an import file.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(deserialize_with = "csv::invalid_option")]
    date: Option<String>,
    #[serde(deserialize_with = "csv::invalid_option")]
    rent: Option<Decimal>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    heat: Option<Decimal>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    exploitation: Option<Decimal>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    mop: Option<Decimal>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    renovation: Option<Decimal>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    tbo: Option<Decimal>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    electricity: Option<Decimal>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    earth_rent: Option<Decimal>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    other: Option<Decimal>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    security: Option<Decimal>,
}

impl CsvRecord {
    /// Converts the row into a record.
    ///
    /// Returns `None` when the date or rent is missing or unparsable.
    fn into_record(self) -> Option<Record> {
        let date = parse_date(self.date.as_deref()?).ok()?;
        let update = RecordUpdate {
            date: Some(date),
            rent: Some(self.rent?),
            heat: self.heat,
            exploitation: self.exploitation,
            mop: self.mop,
            renovation: self.renovation,
            tbo: self.tbo,
            electricity: self.electricity,
            earth_rent: self.earth_rent,
            other: self.other,
            security: self.security,
        };
        Some(Record::default().update(&update))
    }
}

/// Appends every valid row of a CSV reader to the object's ledger.
///
/// Rows with a missing or malformed date or rent are skipped and logged.
/// Returns the number of records added.
///
/// # CSV Format
///
/// ```csv
/// date,rent,heat,earth_rent
/// 2024-01-31,1000.00,120.50,500
/// 2024-02-29,1000.00,98.10,500
/// ```
///
/// # Errors
///
/// - [`RentError::MissingFields`] if a required column is absent from the header.
/// - [`RentError::ObjectNotFound`] if the object does not exist.
/// - A CSV error if the header cannot be read.
fn import_records<R: RentObjectRepository, I: Read>(
    repository: &R,
    user: UserId,
    name: &str,
    reader: I,
) -> Result<usize, CliError> {
    // Fail before reading rows if the object is unknown.
    repository.get_by_name(user, name)?;

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    check_columns(rdr.headers()?)?;

    let mut imported = 0;
    for (row, result) in rdr.deserialize::<CsvRecord>().enumerate() {
        let record = match result.map(CsvRecord::into_record) {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::warn!(row = row + 1, "skipping row without valid date and rent");
                continue;
            }
            Err(e) => {
                tracing::warn!(row = row + 1, error = %e, "skipping malformed row");
                continue;
            }
        };
        retry_on_conflict(RETRY_ATTEMPTS, || repository.add_record(user, name, record))?;
        imported += 1;
    }

    Ok(imported)
}

fn check_columns(headers: &StringRecord) -> Result<(), RentError> {
    let missing: Vec<String> = IMPORT_REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|header| header == **column))
        .map(|column| column.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(RentError::MissingFields(missing))
    }
}

/// Object summary row for `list`.
#[derive(Debug, Serialize)]
struct ObjectRow<'a> {
    name: &'a str,
    description: &'a str,
    area: Decimal,
    records: usize,
    income: Decimal,
    expenses: Decimal,
    profit: Decimal,
}

fn write_objects<W: Write>(objects: &[RentObject], writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for object in objects {
        wtr.serialize(ObjectRow {
            name: &object.name,
            description: &object.description,
            area: object.area,
            records: object.len(),
            income: object.income(),
            expenses: object.expenses(),
            profit: object.profit(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Flat report row; CSV cannot nest the record inside its figures.
#[derive(Debug, Serialize)]
struct ReportRow {
    date: DateTime<Utc>,
    rent: Decimal,
    expenses: Decimal,
    income: Decimal,
    profit: Decimal,
    income_by_area: Decimal,
    expenses_by_area: Decimal,
    profit_by_area: Decimal,
}

/// Writes the projection as CSV, one row per record in date order.
///
/// Columns: `date, rent, expenses, income, profit, income_by_area, expenses_by_area, profit_by_area`
fn write_report<W: Write>(info: &RentObjectInfo, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for record_info in &info.records_info {
        wtr.serialize(ReportRow {
            date: record_info.record.date,
            rent: record_info.record.rent,
            expenses: record_info.expenses,
            income: record_info.income,
            profit: record_info.profit,
            income_by_area: record_info.income_by_area,
            expenses_by_area: record_info.expenses_by_area,
            profit_by_area: record_info.profit_by_area,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Parses an RFC 3339 timestamp, or a bare date taken as midnight UTC.
fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc())
        .map_err(|e| format!("invalid date '{}': {}", value, e))
}
