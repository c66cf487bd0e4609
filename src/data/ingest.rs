use {
    crate::{domain::Observation, error::ReadError},
    anyhow::{Result, bail},
    async_trait::async_trait,
    csv::StringRecord,
    std::{
        io::Read,
        path::{Path, PathBuf},
    },
};

/// Anything that can hand over the full long-form table in one go.
#[async_trait]
pub trait ObservationSource: Send + Sync {
    fn signature(&self) -> &'static str;
    async fn load_observations(&self) -> Result<Vec<Observation>, ReadError>;
}

/// Headed CSV file with `date`, an entity column, `open` and `close`.
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ObservationSource for CsvSource {
    fn signature(&self) -> &'static str {
        "CSV File"
    }

    async fn load_observations(&self) -> Result<Vec<Observation>, ReadError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| ReadError::Io {
                path: self.path.clone(),
                source,
            })?;

        // Parsing is CPU-bound
        tokio::task::spawn_blocking(move || parse_csv(bytes.as_slice()))
            .await
            .map_err(|e| ReadError::Task(e.to_string()))?
    }
}

/// Observations already in memory (tests, embedding).
pub struct MemorySource {
    rows: Vec<Observation>,
}

impl MemorySource {
    pub fn new(rows: Vec<Observation>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl ObservationSource for MemorySource {
    fn signature(&self) -> &'static str {
        "Memory"
    }

    async fn load_observations(&self) -> Result<Vec<Observation>, ReadError> {
        Ok(self.rows.clone())
    }
}

const DATE_COLUMNS: &[&str] = &["date", "day", "timestamp"];
const ENTITY_COLUMNS: &[&str] = &["entity", "symbol", "ticker", "name"];
const OPEN_COLUMNS: &[&str] = &["open"];
const CLOSE_COLUMNS: &[&str] = &["close"];

struct ColumnMap {
    date: usize,
    entity: usize,
    open: usize,
    close: usize,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self, ReadError> {
        let find = |candidates: &[&str], label: &'static str| {
            headers
                .iter()
                .position(|h| candidates.iter().any(|c| h.trim().eq_ignore_ascii_case(c)))
                .ok_or(ReadError::MissingColumn(label))
        };
        Ok(Self {
            date: find(DATE_COLUMNS, "date")?,
            entity: find(ENTITY_COLUMNS, "entity")?,
            open: find(OPEN_COLUMNS, "open")?,
            close: find(CLOSE_COLUMNS, "close")?,
        })
    }
}

/// Parse a headed CSV into observations.
///
/// Extra columns are ignored. Empty or unparseable price cells become `None`
/// so the pivot can report them as malformed with a row number; short rows
/// are kept the same way.
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<Observation>, ReadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = ColumnMap::from_headers(reader.headers()?)?;

    let mut observations = Vec::new();
    for record in reader.records() {
        let record = record?;
        let text = |index: usize| record.get(index).unwrap_or("").to_string();
        let number = |index: usize| record.get(index).and_then(|s| s.parse::<f64>().ok());

        observations.push(Observation {
            date: text(columns.date),
            entity: text(columns.entity),
            open: number(columns.open),
            close: number(columns.close),
        });
    }

    log::info!("Ingest: parsed {} CSV row(s)", observations.len());
    Ok(observations)
}

/// Try each source in order and return the first that yields rows.
pub async fn load_first_available(
    sources: &[Box<dyn ObservationSource>],
) -> Result<(Vec<Observation>, &'static str)> {
    for source in sources {
        match source.load_observations().await {
            Ok(rows) if !rows.is_empty() => return Ok((rows, source.signature())),
            Ok(_) => log::warn!("{} returned no rows, trying next source", source.signature()),
            Err(e) => log::warn!("{} failed: {}", source.signature(), e),
        }
    }
    bail!("No observation source produced any rows")
}
