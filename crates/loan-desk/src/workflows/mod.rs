pub mod ensemble;
pub mod origination;
