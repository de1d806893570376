// Domain layer: value types and the ports (Adapter, Strategy, Filter) the core dispatches through.

pub mod model;
pub mod ports;
