//! File persistence and serialization configuration

/// Configuration for fitted scale parameter records (JSON)
pub struct ScalePersistenceConfig {
    /// Directory path for storing scale records
    pub directory: &'static str,
    /// Base filename (without extension)
    pub filename_base: &'static str,
    /// Current version of the record schema
    pub schema_version: u32,
}

/// Configuration for the binary sample cache (bincode)
pub struct SampleCacheConfig {
    pub directory: &'static str,
    pub filename_base: &'static str,
    pub version: u32,
}

/// The Master Persistence Configuration
pub struct PersistenceConfig {
    pub scale: ScalePersistenceConfig,
    pub samples: SampleCacheConfig,
}

pub const PERSISTENCE: PersistenceConfig = PersistenceConfig {
    scale: ScalePersistenceConfig {
        directory: "model_data",
        filename_base: "scale_params",
        schema_version: 1,
    },
    samples: SampleCacheConfig {
        directory: "model_data",
        filename_base: "samples",
        version: 1,
    },
};

/// Example: "scale_params_v1.json"
pub fn scale_record_filename() -> String {
    format!(
        "{}_v{}.json",
        PERSISTENCE.scale.filename_base, PERSISTENCE.scale.schema_version
    )
}

/// Window-specific cache filename.
/// Example: "samples_l12_h3_v1.bin"
pub fn sample_cache_filename(lookback_length: usize, horizon_length: usize) -> String {
    format!(
        "{}_l{}_h{}_v{}.bin",
        PERSISTENCE.samples.filename_base,
        lookback_length,
        horizon_length,
        PERSISTENCE.samples.version
    )
}
