pub mod review;
pub mod settings;
pub mod stats;
pub mod sync;
pub mod transfer;
pub mod words;
