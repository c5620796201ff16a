use crate::{errors::ErrorCode, IpTrie};
use std::collections::HashMap;
use std::ffi::CString;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock};

/// Handle ID type - safer than raw pointers
pub type HandleId = u64;

/// Table type exposed through the C ABI: values are C strings.
pub type CTrie = IpTrie<CString>;

/// Global handle registry for tries created through the C ABI
struct HandleRegistry {
    handles: Mutex<HashMap<HandleId, CTrie>>,
    next_id: AtomicU64,
}

impl HandleRegistry {
    fn new() -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1), // Start from 1, reserve 0 for null/invalid
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<HandleId, CTrie>>, ErrorCode> {
        self.handles.lock().map_err(|_| ErrorCode::InvalidHandle)
    }

    /// Register a new trie and return its handle ID
    fn register(&self, trie: CTrie) -> Result<HandleId, ErrorCode> {
        let handle_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.lock()?.insert(handle_id, trie);
        Ok(handle_id)
    }

    fn unregister(&self, handle_id: HandleId) -> Result<(), ErrorCode> {
        if handle_id == 0 {
            return Err(ErrorCode::InvalidHandle);
        }
        match self.lock()?.remove(&handle_id) {
            Some(_) => Ok(()),
            None => Err(ErrorCode::InvalidHandle),
        }
    }
}

static REGISTRY: OnceLock<HandleRegistry> = OnceLock::new();

fn get_registry() -> &'static HandleRegistry {
    REGISTRY.get_or_init(HandleRegistry::new)
}

pub fn register_handle(trie: CTrie) -> Result<HandleId, ErrorCode> {
    get_registry().register(trie)
}

/// Execute a function with a reference to the trie identified by handle_id
pub fn with_handle<T, F>(handle_id: HandleId, f: F) -> Result<T, ErrorCode>
where
    F: FnOnce(&CTrie) -> T,
{
    let handles = get_registry().lock()?;
    handles.get(&handle_id).map(f).ok_or(ErrorCode::InvalidHandle)
}

/// Execute a function with a mutable reference to the trie identified by handle_id
pub fn with_handle_mut<T, F>(handle_id: HandleId, f: F) -> Result<T, ErrorCode>
where
    F: FnOnce(&mut CTrie) -> T,
{
    let mut handles = get_registry().lock()?;
    handles.get_mut(&handle_id).map(f).ok_or(ErrorCode::InvalidHandle)
}

/// Unregister and drop a trie
pub fn unregister_handle(handle_id: HandleId) -> Result<(), ErrorCode> {
    get_registry().unregister(handle_id)
}
