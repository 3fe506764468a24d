pub mod extraction;
pub mod processor; // extract → evaluate → assemble
