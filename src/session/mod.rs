mod keyring_storage;
mod storage;
mod store;

pub use keyring_storage::{KeyringStorage, KEYRING_SERVICE};
pub use storage::{KeyValueStorage, MemoryStorage};
pub use store::{SessionStore, KEY_ACCESS_TOKEN, KEY_REFRESH_TOKEN, KEY_USER};
