mod taxpayer;

pub use taxpayer::{TaxDetails, Taxpayer};
