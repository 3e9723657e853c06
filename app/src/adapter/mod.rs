pub mod mqtt;
pub mod sensor_api;
pub mod simply_energy;
