// Multi-criteria optimizer over a generated search: objective extraction,
// min-max normalization, weighted ranking, Pareto fronts and weight
// sensitivity. Every operation is pure and CPU-bound.

pub mod handlers;
pub mod normalize;
pub mod objectives;
pub mod pareto;
pub mod ranking;
pub mod sensitivity;
