mod cpal_backend;

pub use cpal_backend::CpalOutputBackend;
