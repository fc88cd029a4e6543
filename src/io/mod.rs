// In: src/io/mod.rs

//! Readers that turn structure files into trajectories for a `DataSourceModifier`.

pub mod xyz;

pub use self::xyz::{read_xyz, read_xyz_str, XyzReader};
