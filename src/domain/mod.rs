// Domain layer: unified models, request filters, per-source records and ports.

pub mod filters;
pub mod model;
pub mod ports;
pub mod sources;
