//! Pure graph topology algorithms: layout and community detection over a
//! dense CSR view. No I/O, no logging; callers project their graph in and
//! interpret the indices back out.

pub mod common;
pub mod community;
pub mod layout;

pub use common::GraphView;
pub use community::{louvain, modularity};
pub use layout::{circular_layout, force_directed, force_directed_parallel, LayoutConfig, Point};
