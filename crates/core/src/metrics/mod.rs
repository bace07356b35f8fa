pub mod derive;

pub use derive::{derive, DerivedGrowth, DerivedMetric, DerivedMetrics, GrowthSource};
