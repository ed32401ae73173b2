pub mod local;

pub use local::{
    clear_collection, IndexLocation, LocalVectorStore, DEFAULT_COLLECTION, DEFAULT_INDEX_DIR,
};
