pub mod clearer;
pub mod revshare;
pub mod seats;
