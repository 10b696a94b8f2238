// Domain layer: models and the ports the publisher talks to.

pub mod model;
pub mod ports;
