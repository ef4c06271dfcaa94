//! The two jobs built on top of the stage machinery.

pub mod purchase_network;
pub mod wordcount;
