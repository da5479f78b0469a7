// Design-space search: thickness grids → combinations → traffic demand →
// structural verification → collaborator enrichment.
// CPU-bound stages are synchronous; only enrichment awaits.

pub mod enrichment;
pub mod enumerator;
pub mod grid;
pub mod pipeline;
pub mod traffic;
pub mod verification;
