// Domain layer: measure records, optimization results and the ports the pipeline depends on.

pub mod model;
pub mod ports;
