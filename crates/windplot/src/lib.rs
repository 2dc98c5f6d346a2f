mod domains;
mod fetcher;
mod parquet_handler;
mod tracker;
mod utils;

pub use domains::*;
pub use fetcher::*;
pub use parquet_handler::{
    create_observation_schema, load_dataset, save_dataset, Error as DatasetError, ObservationRow,
};
pub use tracker::*;
pub use utils::*;
