//! Loading rows into a ClickHouse `MergeTree` table over the HTTP interface.

use crate::config::ClickHouseSettings;
use crate::error::{Error, Result};
use crate::row::{AccessLogRow, COLUMNS};
use crate::sink::RowSink;
use reqwest::blocking::{Client, RequestBuilder};
use std::time::Duration;
use tracing::{debug, info};

/// DDL for the access log table, partitioned by month and sorted for
/// per-client request lookups.
pub fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n    \
             date Date,\n    \
             remote_addr String,\n    \
             remote_user String,\n    \
             time_local DateTime,\n    \
             request String,\n    \
             status Int32,\n    \
             body_bytes_sent Int64,\n    \
             http_referer String,\n    \
             http_user_agent String\n\
         ) ENGINE = MergeTree\n\
         PARTITION BY toYYYYMM(date)\n\
         ORDER BY (remote_addr, request, status)"
    )
}

/// The statement that precedes the CSV payload of a bulk insert.
pub fn insert_sql(table: &str) -> String {
    format!(
        "INSERT INTO {table} ({}) FORMAT CSV",
        COLUMNS.join(", ")
    )
}

/// A sink that buffers every row and sends them as one `INSERT` on
/// [`finish`](RowSink::finish).
///
/// A run that fails before `finish` sends nothing, so the table is left
/// untouched. The insert is sent with `max_insert_block_size` set to the row
/// count so the server forms a single block. ClickHouse writes that block as
/// one part per month partition, so a log spanning several months is not
/// atomic: a server failure during `finish` can leave some months loaded.
pub struct ClickHouseSink {
    client: Client,
    settings: ClickHouseSettings,
    payload: csv::Writer<Vec<u8>>,
    rows: usize,
}

impl ClickHouseSink {
    /// Create a sink without contacting the server.
    pub fn new(settings: ClickHouseSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            settings,
            payload: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(Vec::new()),
            rows: 0,
        })
    }

    /// Create a sink, check the server is reachable and make sure the table
    /// exists.
    pub fn connect(settings: ClickHouseSettings) -> Result<Self> {
        let sink = Self::new(settings)?;
        sink.ping()?;
        sink.ensure_table()?;
        Ok(sink)
    }

    pub fn ping(&self) -> Result<()> {
        let url = format!("{}/ping", self.settings.url.trim_end_matches('/'));
        let response = self.client.get(url).send()?;
        check(response)?;
        debug!(url = %self.settings.url, "ClickHouse is reachable");
        Ok(())
    }

    pub fn ensure_table(&self) -> Result<()> {
        let sql = create_table_sql(&self.settings.table);
        check(self.request().body(sql).send()?)?;
        debug!(table = %self.settings.table, "table ready");
        Ok(())
    }

    /// Number of rows waiting for [`finish`](RowSink::finish).
    pub fn pending_rows(&self) -> usize {
        self.rows
    }

    fn request(&self) -> RequestBuilder {
        let mut builder = self.client.post(&self.settings.url);
        if let Some(database) = &self.settings.database {
            builder = builder.query(&[("database", database)]);
        }
        if let Some(user) = &self.settings.user {
            builder = builder.header("X-ClickHouse-User", user);
        }
        if let Some(password) = &self.settings.password {
            builder = builder.header("X-ClickHouse-Key", password);
        }
        builder
    }
}

impl RowSink for ClickHouseSink {
    fn write_row(&mut self, row: &AccessLogRow) -> Result<()> {
        self.payload.write_record(row.to_record())?;
        self.rows += 1;
        Ok(())
    }

    fn finish(self) -> Result<()> {
        if self.rows == 0 {
            info!(table = %self.settings.table, "no rows to insert");
            return Ok(());
        }

        let sql = insert_sql(&self.settings.table);
        let block_size = self.rows.to_string();
        let request = self.request().query(&[
            ("query", sql.as_str()),
            ("max_insert_block_size", block_size.as_str()),
        ]);
        let payload = self
            .payload
            .into_inner()
            .map_err(|e| Error::from(e.into_error()))?;

        check(request.body(payload).send()?)?;
        info!(table = %self.settings.table, rows = self.rows, "rows inserted");
        Ok(())
    }
}

fn check(response: reqwest::blocking::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().unwrap_or_default();
    Err(Error::ClickHouse {
        status: status.as_u16(),
        body: body.trim().to_string(),
    })
}
