//! redb-based printer configuration store
//!
//! Printers, stations and the product → category map. Uniqueness checks run
//! inside the write transaction, which redb serializes, so two concurrent
//! creates cannot both pass.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    ConnectionKind, Printer, PrinterCreate, PrinterStatus, PrinterUpdate, ProductCategory,
    Station, StationCreate, StationUpdate,
};
use shared::util::{new_id, now_millis};
use thiserror::Error;

use crate::printing::renderer::{FormatError, TicketLayout};
use crate::printing::types::{DirectoryError, PrinterDirectory, PrinterStatusStore, ProductCatalog};

/// Printers table: key = printer_id, value = JSON
const PRINTERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("printers");

/// Index: (branch_id, sequence) -> printer_id, keeps creation order
const PRINTERS_BY_BRANCH_TABLE: TableDefinition<(&str, u64), &str> =
    TableDefinition::new("printers_by_branch");

/// Stations table: key = station_id, value = JSON
const STATIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("stations");

/// Index: (branch_id, station_id) -> ()
const STATIONS_BY_BRANCH_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("stations_by_branch");

/// Catalog: product_id -> category_id
const PRODUCT_CATEGORIES_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("product_categories");

/// Counters
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");
const PRINTER_SEQ_KEY: &str = "printer_seq";

#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Printer not found: {0}")]
    PrinterNotFound(String),

    #[error("Station not found: {0}")]
    StationNotFound(String),

    #[error("A printer named '{0}' already exists in this branch")]
    PrinterNameExists(String),

    #[error("Another printer already uses '{0}' in this branch")]
    PrinterAddressExists(String),

    #[error("A station named '{0}' already exists in this branch")]
    StationNameExists(String),

    #[error("Station {station_id} is assigned to {printers} printer(s)")]
    StationInUse { station_id: String, printers: usize },

    #[error("{0}")]
    Validation(String),

    #[error("Invalid ticket layout: {0}")]
    InvalidLayout(#[from] FormatError),
}

pub type ConfigStoreResult<T> = Result<T, ConfigStoreError>;

impl From<ConfigStoreError> for AppError {
    fn from(err: ConfigStoreError) -> Self {
        let message = err.to_string();
        match err {
            ConfigStoreError::PrinterNotFound(id) => {
                AppError::with_message(ErrorCode::PrinterNotFound, message).with_detail("printer_id", id)
            }
            ConfigStoreError::StationNotFound(id) => {
                AppError::with_message(ErrorCode::StationNotFound, message).with_detail("station_id", id)
            }
            ConfigStoreError::PrinterNameExists(name) => {
                AppError::with_message(ErrorCode::PrinterNameExists, message).with_detail("name", name)
            }
            ConfigStoreError::PrinterAddressExists(address) => {
                AppError::with_message(ErrorCode::PrinterAddressExists, message)
                    .with_detail("system_identifier", address)
            }
            ConfigStoreError::StationNameExists(name) => {
                AppError::with_message(ErrorCode::StationNameExists, message).with_detail("name", name)
            }
            ConfigStoreError::StationInUse { station_id, printers } => {
                AppError::with_message(ErrorCode::StationInUse, message)
                    .with_detail("station_id", station_id)
                    .with_detail("printers", printers)
            }
            ConfigStoreError::Validation(msg) => AppError::validation(msg),
            ConfigStoreError::InvalidLayout(_) => {
                AppError::with_message(ErrorCode::InvalidTicketLayout, message)
            }
            _ => AppError::database(message),
        }
    }
}

impl From<ConfigStoreError> for DirectoryError {
    fn from(err: ConfigStoreError) -> Self {
        DirectoryError(err.to_string())
    }
}

/// Printer / station / catalog configuration
#[derive(Clone)]
pub struct ConfigStore {
    db: Arc<Database>,
}

impl ConfigStore {
    /// Open or create database
    pub fn open(path: impl AsRef<Path>) -> ConfigStoreResult<Self> {
        Self::init(Database::create(path)?)
    }

    /// Open in-memory database
    pub fn open_in_memory() -> ConfigStoreResult<Self> {
        Self::init(Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?)
    }

    fn init(db: Database) -> ConfigStoreResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PRINTERS_TABLE)?;
            let _ = write_txn.open_table(PRINTERS_BY_BRANCH_TABLE)?;
            let _ = write_txn.open_table(STATIONS_TABLE)?;
            let _ = write_txn.open_table(STATIONS_BY_BRANCH_TABLE)?;
            let _ = write_txn.open_table(PRODUCT_CATEGORIES_TABLE)?;
            let _ = write_txn.open_table(META_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    // ========== Printers ==========

    pub fn create_printer(&self, data: PrinterCreate) -> ConfigStoreResult<Printer> {
        let printer = Printer {
            id: new_id(),
            branch_id: data.branch_id.trim().to_string(),
            name: data.name.trim().to_string(),
            system_identifier: data.system_identifier.trim().to_string(),
            connection: data.connection,
            print_mode: data.print_mode,
            copies: data.copies,
            paper_width: data.paper_width,
            char_pitch: data.char_pitch,
            chars_per_line: data
                .chars_per_line
                .unwrap_or_else(|| data.paper_width.default_chars_per_line(data.char_pitch)),
            station_id: non_blank(data.station_id),
            auto_print: data.auto_print,
            header_text: non_blank(data.header_text),
            footer_text: non_blank(data.footer_text),
            header_size: data.header_size,
            footer_size: data.footer_size,
            control_font_size: data.control_font_size,
            control_line_spacing: data.control_line_spacing,
            status: PrinterStatus::Offline,
            status_changed_at: None,
            is_active: true,
            created_at: now_millis(),
        };
        validate_printer(&printer)?;

        let write_txn = self.db.begin_write()?;
        {
            check_printer_conflicts(&write_txn, &printer)?;
            check_station_reference(&write_txn, &printer)?;

            let mut meta = write_txn.open_table(META_TABLE)?;
            let seq = meta.get(PRINTER_SEQ_KEY)?.map(|g| g.value()).unwrap_or(0) + 1;
            meta.insert(PRINTER_SEQ_KEY, seq)?;

            put_printer(&write_txn, &printer)?;
            let mut idx_table = write_txn.open_table(PRINTERS_BY_BRANCH_TABLE)?;
            idx_table.insert((printer.branch_id.as_str(), seq), printer.id.as_str())?;
        }
        write_txn.commit()?;

        tracing::info!(printer_id = %printer.id, name = %printer.name, "Printer created");
        Ok(printer)
    }

    pub fn update_printer(&self, id: &str, update: PrinterUpdate) -> ConfigStoreResult<Printer> {
        let write_txn = self.db.begin_write()?;
        let printer = {
            let mut printer = load_printer(&write_txn, id)?;

            if let Some(name) = update.name {
                printer.name = name.trim().to_string();
            }
            if let Some(system_identifier) = update.system_identifier {
                printer.system_identifier = system_identifier.trim().to_string();
            }
            if let Some(connection) = update.connection {
                printer.connection = connection;
            }
            if let Some(print_mode) = update.print_mode {
                printer.print_mode = print_mode;
            }
            if let Some(copies) = update.copies {
                printer.copies = copies;
            }
            if let Some(paper_width) = update.paper_width {
                printer.paper_width = paper_width;
            }
            if let Some(char_pitch) = update.char_pitch {
                printer.char_pitch = char_pitch;
            }
            if let Some(chars_per_line) = update.chars_per_line {
                printer.chars_per_line = chars_per_line;
            }
            if let Some(station_id) = update.station_id {
                printer.station_id = non_blank(station_id);
            }
            if let Some(auto_print) = update.auto_print {
                printer.auto_print = auto_print;
            }
            if let Some(header_text) = update.header_text {
                printer.header_text = non_blank(header_text);
            }
            if let Some(footer_text) = update.footer_text {
                printer.footer_text = non_blank(footer_text);
            }
            if let Some(header_size) = update.header_size {
                printer.header_size = header_size;
            }
            if let Some(footer_size) = update.footer_size {
                printer.footer_size = footer_size;
            }
            if let Some(control_font_size) = update.control_font_size {
                printer.control_font_size = control_font_size;
            }
            if let Some(control_line_spacing) = update.control_line_spacing {
                printer.control_line_spacing = control_line_spacing;
            }

            validate_printer(&printer)?;
            check_printer_conflicts(&write_txn, &printer)?;
            check_station_reference(&write_txn, &printer)?;
            put_printer(&write_txn, &printer)?;
            printer
        };
        write_txn.commit()?;

        tracing::info!(printer_id = %printer.id, "Printer updated");
        Ok(printer)
    }

    pub fn set_printer_active(&self, id: &str, active: bool) -> ConfigStoreResult<Printer> {
        let write_txn = self.db.begin_write()?;
        let printer = {
            let mut printer = load_printer(&write_txn, id)?;
            printer.is_active = active;
            put_printer(&write_txn, &printer)?;
            printer
        };
        write_txn.commit()?;

        tracing::info!(printer_id = %id, active, "Printer availability changed");
        Ok(printer)
    }

    pub fn delete_printer(&self, id: &str) -> ConfigStoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let printer = load_printer(&write_txn, id)?;

            let mut idx_table = write_txn.open_table(PRINTERS_BY_BRANCH_TABLE)?;
            let range_start: (&str, u64) = (printer.branch_id.as_str(), 0);
            let range_end: (&str, u64) = (printer.branch_id.as_str(), u64::MAX);
            let mut seqs = Vec::new();
            for result in idx_table.range(range_start..=range_end)? {
                let (key, value) = result?;
                if value.value() == id {
                    seqs.push(key.value().1);
                }
            }
            for seq in seqs {
                idx_table.remove((printer.branch_id.as_str(), seq))?;
            }

            let mut table = write_txn.open_table(PRINTERS_TABLE)?;
            table.remove(id)?;
        }
        write_txn.commit()?;

        tracing::info!(printer_id = %id, "Printer deleted");
        Ok(())
    }

    pub fn get_printer(&self, id: &str) -> ConfigStoreResult<Option<Printer>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRINTERS_TABLE)?;

        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Printers in creation order, optionally for one branch
    pub fn list_printers(&self, branch_id: Option<&str>) -> ConfigStoreResult<Vec<Printer>> {
        let read_txn = self.db.begin_read()?;
        let idx_table = read_txn.open_table(PRINTERS_BY_BRANCH_TABLE)?;
        let data_table = read_txn.open_table(PRINTERS_TABLE)?;

        let mut ids = Vec::new();
        match branch_id {
            Some(branch_id) => {
                let range_start: (&str, u64) = (branch_id, 0);
                let range_end: (&str, u64) = (branch_id, u64::MAX);
                for result in idx_table.range(range_start..=range_end)? {
                    let (_, value) = result?;
                    ids.push(value.value().to_string());
                }
            }
            None => {
                for result in idx_table.iter()? {
                    let (_, value) = result?;
                    ids.push(value.value().to_string());
                }
            }
        }

        let mut printers = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(guard) = data_table.get(id.as_str())? {
                printers.push(serde_json::from_slice(guard.value())?);
            }
        }
        Ok(printers)
    }

    /// Write a new status; `Ok(false)` when the printer is gone
    pub fn set_printer_status(
        &self,
        id: &str,
        status: PrinterStatus,
        at: i64,
    ) -> ConfigStoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        {
            let mut printer = match load_printer(&write_txn, id) {
                Ok(printer) => printer,
                Err(ConfigStoreError::PrinterNotFound(_)) => return Ok(false),
                Err(e) => return Err(e),
            };
            if printer.status == status {
                return Ok(true);
            }
            printer.status = status;
            printer.status_changed_at = Some(at);
            put_printer(&write_txn, &printer)?;
        }
        write_txn.commit()?;
        Ok(true)
    }

    // ========== Stations ==========

    pub fn create_station(&self, data: StationCreate) -> ConfigStoreResult<Station> {
        let station = Station {
            id: new_id(),
            branch_id: data.branch_id.trim().to_string(),
            name: data.name.trim().to_string(),
            category_ids: normalize_categories(data.category_ids),
            created_at: now_millis(),
        };
        validate_station(&station)?;

        let write_txn = self.db.begin_write()?;
        {
            check_station_conflicts(&write_txn, &station)?;
            put_station(&write_txn, &station)?;
            let mut idx_table = write_txn.open_table(STATIONS_BY_BRANCH_TABLE)?;
            idx_table.insert((station.branch_id.as_str(), station.id.as_str()), ())?;
        }
        write_txn.commit()?;

        tracing::info!(station_id = %station.id, name = %station.name, "Station created");
        Ok(station)
    }

    pub fn update_station(&self, id: &str, update: StationUpdate) -> ConfigStoreResult<Station> {
        let write_txn = self.db.begin_write()?;
        let station = {
            let mut station = load_station(&write_txn, id)?;
            if let Some(name) = update.name {
                station.name = name.trim().to_string();
            }
            if let Some(category_ids) = update.category_ids {
                station.category_ids = normalize_categories(category_ids);
            }
            validate_station(&station)?;
            check_station_conflicts(&write_txn, &station)?;
            put_station(&write_txn, &station)?;
            station
        };
        write_txn.commit()?;

        tracing::info!(station_id = %id, "Station updated");
        Ok(station)
    }

    /// Rejected while any printer still references the station
    pub fn delete_station(&self, id: &str) -> ConfigStoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let station = load_station(&write_txn, id)?;

            let assigned = branch_printers_in(&write_txn, &station.branch_id)?
                .iter()
                .filter(|p| p.station_id.as_deref() == Some(id))
                .count();
            if assigned > 0 {
                return Err(ConfigStoreError::StationInUse {
                    station_id: id.to_string(),
                    printers: assigned,
                });
            }

            let mut idx_table = write_txn.open_table(STATIONS_BY_BRANCH_TABLE)?;
            idx_table.remove((station.branch_id.as_str(), id))?;
            let mut table = write_txn.open_table(STATIONS_TABLE)?;
            table.remove(id)?;
        }
        write_txn.commit()?;

        tracing::info!(station_id = %id, "Station deleted");
        Ok(())
    }

    pub fn get_station(&self, id: &str) -> ConfigStoreResult<Option<Station>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STATIONS_TABLE)?;

        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Stations of a branch, oldest first
    pub fn list_stations(&self, branch_id: &str) -> ConfigStoreResult<Vec<Station>> {
        let read_txn = self.db.begin_read()?;
        let idx_table = read_txn.open_table(STATIONS_BY_BRANCH_TABLE)?;
        let data_table = read_txn.open_table(STATIONS_TABLE)?;

        let mut stations: Vec<Station> = Vec::new();
        let range_start: (&str, &str) = (branch_id, "");
        let range_end: (&str, &str) = (branch_id, "\u{ffff}");
        for result in idx_table.range(range_start..=range_end)? {
            let (key, _) = result?;
            let (_, station_id) = key.value();
            if let Some(guard) = data_table.get(station_id)? {
                stations.push(serde_json::from_slice(guard.value())?);
            }
        }

        stations.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(stations)
    }

    // ========== Catalog ==========

    /// Sync one product's category; `None` clears it
    pub fn set_product_category(
        &self,
        product_id: &str,
        category_id: Option<&str>,
    ) -> ConfigStoreResult<ProductCategory> {
        let product_id = product_id.trim();
        if product_id.is_empty() {
            return Err(ConfigStoreError::Validation("product_id is required".to_string()));
        }
        let category_id = category_id.map(str::trim).filter(|c| !c.is_empty());

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PRODUCT_CATEGORIES_TABLE)?;
            match category_id {
                Some(category_id) => {
                    table.insert(product_id, category_id)?;
                }
                None => {
                    table.remove(product_id)?;
                }
            }
        }
        write_txn.commit()?;

        Ok(ProductCategory {
            product_id: product_id.to_string(),
            category_id: category_id.map(str::to_string),
        })
    }

    pub fn product_categories(&self, product_ids: &[String]) -> ConfigStoreResult<HashMap<String, String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCT_CATEGORIES_TABLE)?;

        let mut categories = HashMap::with_capacity(product_ids.len());
        for product_id in product_ids {
            if let Some(guard) = table.get(product_id.as_str())? {
                categories.insert(product_id.clone(), guard.value().to_string());
            }
        }
        Ok(categories)
    }
}

// ========== Transaction helpers ==========

fn load_printer(txn: &WriteTransaction, id: &str) -> ConfigStoreResult<Printer> {
    let table = txn.open_table(PRINTERS_TABLE)?;
    let guard = table
        .get(id)?
        .ok_or_else(|| ConfigStoreError::PrinterNotFound(id.to_string()))?;
    Ok(serde_json::from_slice(guard.value())?)
}

fn put_printer(txn: &WriteTransaction, printer: &Printer) -> ConfigStoreResult<()> {
    let mut table = txn.open_table(PRINTERS_TABLE)?;
    let value = serde_json::to_vec(printer)?;
    table.insert(printer.id.as_str(), value.as_slice())?;
    Ok(())
}

fn branch_printers_in(txn: &WriteTransaction, branch_id: &str) -> ConfigStoreResult<Vec<Printer>> {
    let idx_table = txn.open_table(PRINTERS_BY_BRANCH_TABLE)?;
    let data_table = txn.open_table(PRINTERS_TABLE)?;

    let range_start: (&str, u64) = (branch_id, 0);
    let range_end: (&str, u64) = (branch_id, u64::MAX);
    let mut printers = Vec::new();
    for result in idx_table.range(range_start..=range_end)? {
        let (_, value) = result?;
        if let Some(guard) = data_table.get(value.value())? {
            printers.push(serde_json::from_slice(guard.value())?);
        }
    }
    Ok(printers)
}

fn check_printer_conflicts(txn: &WriteTransaction, printer: &Printer) -> ConfigStoreResult<()> {
    let name = printer.name.to_lowercase();
    let address = printer.address_key();

    for other in branch_printers_in(txn, &printer.branch_id)? {
        if other.id == printer.id {
            continue;
        }
        if other.name.to_lowercase() == name {
            return Err(ConfigStoreError::PrinterNameExists(printer.name.clone()));
        }
        if other.address_key() == address {
            return Err(ConfigStoreError::PrinterAddressExists(
                printer.system_identifier.clone(),
            ));
        }
    }
    Ok(())
}

fn check_station_reference(txn: &WriteTransaction, printer: &Printer) -> ConfigStoreResult<()> {
    let Some(station_id) = &printer.station_id else {
        return Ok(());
    };
    match load_station(txn, station_id) {
        Ok(station) if station.branch_id == printer.branch_id => Ok(()),
        Ok(_) | Err(ConfigStoreError::StationNotFound(_)) => {
            Err(ConfigStoreError::StationNotFound(station_id.clone()))
        }
        Err(e) => Err(e),
    }
}

fn load_station(txn: &WriteTransaction, id: &str) -> ConfigStoreResult<Station> {
    let table = txn.open_table(STATIONS_TABLE)?;
    let guard = table
        .get(id)?
        .ok_or_else(|| ConfigStoreError::StationNotFound(id.to_string()))?;
    Ok(serde_json::from_slice(guard.value())?)
}

fn put_station(txn: &WriteTransaction, station: &Station) -> ConfigStoreResult<()> {
    let mut table = txn.open_table(STATIONS_TABLE)?;
    let value = serde_json::to_vec(station)?;
    table.insert(station.id.as_str(), value.as_slice())?;
    Ok(())
}

fn check_station_conflicts(txn: &WriteTransaction, station: &Station) -> ConfigStoreResult<()> {
    let idx_table = txn.open_table(STATIONS_BY_BRANCH_TABLE)?;
    let data_table = txn.open_table(STATIONS_TABLE)?;
    let name = station.name.to_lowercase();

    let range_start: (&str, &str) = (station.branch_id.as_str(), "");
    let range_end: (&str, &str) = (station.branch_id.as_str(), "\u{ffff}");
    for result in idx_table.range(range_start..=range_end)? {
        let (key, _) = result?;
        let (_, other_id) = key.value();
        if other_id == station.id {
            continue;
        }
        if let Some(guard) = data_table.get(other_id)? {
            let other: Station = serde_json::from_slice(guard.value())?;
            if other.name.to_lowercase() == name {
                return Err(ConfigStoreError::StationNameExists(station.name.clone()));
            }
        }
    }
    Ok(())
}

// ========== Validation ==========

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Ordered, duplicate-free, no blanks
fn normalize_categories(category_ids: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(category_ids.len());
    for id in category_ids {
        let id = id.trim();
        if !id.is_empty() && !normalized.iter().any(|c| c == id) {
            normalized.push(id.to_string());
        }
    }
    normalized
}

fn validate_printer(printer: &Printer) -> ConfigStoreResult<()> {
    if printer.branch_id.is_empty() {
        return Err(ConfigStoreError::Validation("branch_id is required".to_string()));
    }
    if printer.name.is_empty() {
        return Err(ConfigStoreError::Validation("Printer name is required".to_string()));
    }
    if printer.system_identifier.is_empty() {
        return Err(ConfigStoreError::Validation(
            "system_identifier is required".to_string(),
        ));
    }
    if printer.connection == ConnectionKind::Network
        && printer.system_identifier.parse::<SocketAddr>().is_err()
        && printer.system_identifier.parse::<IpAddr>().is_err()
    {
        return Err(ConfigStoreError::Validation(format!(
            "Network printers need an IP address (optionally ip:port), got '{}'",
            printer.system_identifier
        )));
    }
    if printer.copies == 0 {
        return Err(ConfigStoreError::Validation("copies must be at least 1".to_string()));
    }
    TicketLayout::from_printer(printer).validate()?;
    Ok(())
}

fn validate_station(station: &Station) -> ConfigStoreResult<()> {
    if station.branch_id.is_empty() {
        return Err(ConfigStoreError::Validation("branch_id is required".to_string()));
    }
    if station.name.is_empty() {
        return Err(ConfigStoreError::Validation("Station name is required".to_string()));
    }
    Ok(())
}

// ========== Dispatch seams ==========

#[async_trait]
impl PrinterDirectory for ConfigStore {
    async fn branch_printers(&self, branch_id: &str) -> Result<Vec<Printer>, DirectoryError> {
        Ok(self.list_printers(Some(branch_id))?)
    }

    async fn branch_stations(&self, branch_id: &str) -> Result<Vec<Station>, DirectoryError> {
        Ok(self.list_stations(branch_id)?)
    }

    async fn printer(&self, printer_id: &str) -> Result<Option<Printer>, DirectoryError> {
        Ok(self.get_printer(printer_id)?)
    }
}

#[async_trait]
impl ProductCatalog for ConfigStore {
    async fn categories_for(
        &self,
        product_ids: &[String],
    ) -> Result<HashMap<String, String>, DirectoryError> {
        Ok(self.product_categories(product_ids)?)
    }
}

impl PrinterStatusStore for ConfigStore {
    fn set_printer_status(
        &self,
        printer_id: &str,
        status: PrinterStatus,
        at: i64,
    ) -> Result<bool, DirectoryError> {
        Ok(ConfigStore::set_printer_status(self, printer_id, status, at)?)
    }
}
