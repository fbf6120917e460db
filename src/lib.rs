// Public modules
pub mod algorithms;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

// Re-exports for convenience
pub use algorithms::tsp::{BruteForceTsp, DynamicProgrammingTsp, Tour};
pub use algorithms::{StoreSelector, TspSolver};
pub use config::OptimizerConfig;
pub use error::{OptimizeError, TspError, UpstreamError};
pub use models::{OptimizationResult, ProductRequirement};
pub use services::{OptimizeRequest, Optimizer, Strategy};
pub use utils::cancel::CancellationToken;
