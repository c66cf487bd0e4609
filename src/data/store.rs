use {
    crate::{
        config::PERSISTENCE,
        domain::Field,
        error::StoreError,
        models::{FieldScales, MinMax, SampleSet, ScaleParameters, WindowConfig},
    },
    serde::{Deserialize, Serialize},
    std::{
        collections::BTreeMap,
        fs::{self, File},
        io::{BufReader, BufWriter},
        path::{Path, PathBuf},
        str::FromStr,
    },
};

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// Create a new file and any missing parent directories.
fn create_file_with_parents(path: &Path) -> Result<File, StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    File::create(path).map_err(io_error(path))
}

/// Human-readable scale record, so predictions can be mapped back to prices.
///
/// `scale_params` is `{entity: {"open"|"close": {min, max}}}`; a field with no
/// values in the fitted history is simply absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleRecord {
    pub schema_version: u32,
    pub entities: Vec<String>,
    pub scale_params: BTreeMap<String, BTreeMap<String, MinMax>>,
}

impl ScaleRecord {
    pub fn from_parameters(scale: &ScaleParameters) -> Self {
        let scale_params = scale
            .iter()
            .map(|(entity, scales)| {
                let fields: BTreeMap<String, MinMax> = [Field::Open, Field::Close]
                    .into_iter()
                    .filter_map(|field| scales.get(field).map(|b| (field.to_string(), b)))
                    .collect();
                (entity.to_string(), fields)
            })
            .collect();

        Self {
            schema_version: PERSISTENCE.scale.schema_version,
            entities: scale.entities().to_vec(),
            scale_params,
        }
    }

    pub fn into_parameters(self) -> Result<ScaleParameters, StoreError> {
        if self.schema_version != PERSISTENCE.scale.schema_version {
            return Err(StoreError::VersionMismatch {
                found: self.schema_version,
                expected: PERSISTENCE.scale.schema_version,
            });
        }

        let keyed: Vec<&String> = self.scale_params.keys().collect();
        if keyed.len() != self.entities.len() || keyed.iter().zip(&self.entities).any(|(a, b)| *a != b) {
            return Err(StoreError::ParameterMismatch(format!(
                "entity list {:?} does not match scale_params keys {:?}",
                self.entities, keyed
            )));
        }

        let mut scales = Vec::with_capacity(self.entities.len());
        for (entity, fields) in &self.scale_params {
            let mut entry = FieldScales::default();
            for (name, bounds) in fields {
                let field = Field::from_str(name).map_err(|_| {
                    StoreError::ParameterMismatch(format!("unknown field `{}` for {}", name, entity))
                })?;
                match field {
                    Field::Open => entry.open = Some(*bounds),
                    Field::Close => entry.close = Some(*bounds),
                }
            }
            scales.push(entry);
        }

        Ok(ScaleParameters::from_parts(self.entities, scales))
    }
}

/// Default location: `<directory>/scale_params_v{N}.json`.
pub fn default_scale_record_path() -> PathBuf {
    PathBuf::from(PERSISTENCE.scale.directory).join(crate::config::scale_record_filename())
}

pub fn save_scale_record(path: &Path, scale: &ScaleParameters) -> Result<(), StoreError> {
    let file = create_file_with_parents(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), &ScaleRecord::from_parameters(scale))?;
    log::info!("Saved scale parameters for {} entities to {}", scale.len(), path.display());
    Ok(())
}

pub fn load_scale_record(path: &Path) -> Result<ScaleParameters, StoreError> {
    let file = File::open(path).map_err(io_error(path))?;
    let record: ScaleRecord = serde_json::from_reader(BufReader::new(file))?;
    record.into_parameters()
}

/// Binary cache of a windowed sample set, tagged with the window it was built for.
#[derive(Debug, Serialize, Deserialize)]
pub struct SampleCache {
    pub version: u32,
    pub created_ms: i64,
    pub samples: SampleSet,
}

impl SampleCache {
    pub fn new(samples: SampleSet) -> Self {
        Self {
            version: PERSISTENCE.samples.version,
            created_ms: chrono::Utc::now().timestamp_millis(),
            samples,
        }
    }

    /// Default location: `<directory>/samples_l{L}_h{H}_v{N}.bin`.
    pub fn default_path(config: &WindowConfig) -> PathBuf {
        PathBuf::from(PERSISTENCE.samples.directory).join(crate::config::sample_cache_filename(
            config.lookback_length(),
            config.horizon_length(),
        ))
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), StoreError> {
        let file = create_file_with_parents(path)?;
        bincode::serialize_into(BufWriter::new(file), self)?;
        log::info!(
            "Saved {} samples (lookback {}, horizon {}) to {}",
            self.samples.len(),
            self.samples.config().lookback_length(),
            self.samples.config().horizon_length(),
            path.display()
        );
        Ok(())
    }

    /// Load and verify version, window lengths against `expected` and sample shapes.
    pub fn load_from_path(path: &Path, expected: &WindowConfig) -> Result<Self, StoreError> {
        let file = File::open(path).map_err(io_error(path))?;
        let cache: SampleCache = bincode::deserialize_from(BufReader::new(file))?;

        if cache.version != PERSISTENCE.samples.version {
            return Err(StoreError::VersionMismatch {
                found: cache.version,
                expected: PERSISTENCE.samples.version,
            });
        }
        if cache.samples.config() != expected {
            return Err(StoreError::ParameterMismatch(format!(
                "cache built for {:?}, expected {:?}",
                cache.samples.config(),
                expected
            )));
        }
        cache
            .samples
            .validate_shapes()
            .map_err(|e| StoreError::ParameterMismatch(e.to_string()))?;
        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ScaleParameters {
        ScaleParameters::from_parts(
            vec!["A".into(), "B".into()],
            vec![
                FieldScales {
                    open: Some(MinMax { min: 1.0, max: 2.0 }),
                    close: Some(MinMax { min: 3.0, max: 4.0 }),
                },
                FieldScales {
                    open: None,
                    close: Some(MinMax { min: 5.0, max: 5.0 }),
                },
            ],
        )
    }

    #[test]
    fn record_uses_field_names_as_keys() {
        let record = ScaleRecord::from_parameters(&params());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["schema_version"], 1);
        assert_eq!(json["scale_params"]["A"]["close"]["max"], 4.0);
        assert!(json["scale_params"]["B"].get("open").is_none());
        assert_eq!(record.into_parameters().unwrap(), params());
    }

    #[test]
    fn record_rejects_other_schema_and_unknown_fields() {
        let mut record = ScaleRecord::from_parameters(&params());
        record.schema_version = 99;
        assert!(matches!(
            record.into_parameters(),
            Err(StoreError::VersionMismatch { found: 99, expected: 1 })
        ));

        let mut record = ScaleRecord::from_parameters(&params());
        record
            .scale_params
            .get_mut("A")
            .unwrap()
            .insert("volume".into(), MinMax { min: 0.0, max: 1.0 });
        assert!(matches!(record.into_parameters(), Err(StoreError::ParameterMismatch(_))));
    }

    #[test]
    fn record_rejects_entity_list_drift() {
        let mut record = ScaleRecord::from_parameters(&params());
        record.entities.push("C".into());
        assert!(matches!(record.into_parameters(), Err(StoreError::ParameterMismatch(_))));
    }

    #[test]
    fn cache_with_misshaped_samples_is_rejected() {
        let rows: Vec<crate::domain::Observation> = (1..=9)
            .map(|d| crate::domain::Observation::new(format!("2024-03-{:02}", d), "A", d as f64, d as f64))
            .collect();
        let config = WindowConfig::new(3, 2).unwrap();
        let samples = crate::engine::PreparedDataset::prepare(&rows)
            .unwrap()
            .build_samples(&config)
            .unwrap()
            .into_samples();
        // Single-entity samples listed under two entities
        let bad = SampleSet::from_parts(config, vec!["A".into(), "B".into()], samples);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.bin");
        SampleCache::new(bad).save_to_path(&path).unwrap();
        assert!(matches!(
            SampleCache::load_from_path(&path, &config),
            Err(StoreError::ParameterMismatch(msg)) if msg.contains("sample input block")
        ));
    }

    #[test]
    fn missing_record_is_io_error() {
        assert!(matches!(
            load_scale_record(Path::new("no/such/scale.json")),
            Err(StoreError::Io { .. })
        ));
    }
}
