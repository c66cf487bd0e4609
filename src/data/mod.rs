mod ingest;
mod store;

pub use {
    ingest::{CsvSource, MemorySource, ObservationSource, load_first_available, parse_csv},
    store::{
        SampleCache, ScaleRecord, default_scale_record_path, load_scale_record, save_scale_record,
    },
};
