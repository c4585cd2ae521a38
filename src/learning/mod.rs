pub mod decay;
pub mod environment;
pub mod policy;
pub mod q_learning;
pub mod q_table;
pub mod serde_utils;
pub mod value;
