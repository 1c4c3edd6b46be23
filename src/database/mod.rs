//! In-memory pose database: the baked, normalized sample matrix and its provenance.

pub mod builder;
pub mod pose_db;

pub use builder::PoseDatabaseBuilder;
pub use pose_db::{PoseDatabase, PoseRecord};
