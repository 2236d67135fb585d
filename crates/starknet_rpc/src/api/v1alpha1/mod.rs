pub mod starknetrpc;

pub use starknetrpc::{ArchiveSnapshot, StarknetRPC, StarknetRPCSpec, StarknetRPCStatus, StorageTemplate};
