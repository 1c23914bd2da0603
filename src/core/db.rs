use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Key-value persistence used by every service.
///
/// Each method touches a single key, so each call is atomic on its own.
/// `set_if_absent`, `toggle` and `increment` have read-then-write default
/// implementations. Real stores override them: [`MemoryStore`] with a
/// single locked operation, the Spin store with wasi-keyvalue atomics.
pub trait KvStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;
    fn delete(&self, key: &str) -> anyhow::Result<()>;
    fn exists(&self, key: &str) -> anyhow::Result<bool>;
    fn keys_with_prefix(&self, prefix: &str) -> anyhow::Result<Vec<String>>;

    /// Writes `value` only when `key` is free. Returns whether it wrote.
    fn set_if_absent(&self, key: &str, value: &[u8]) -> anyhow::Result<bool> {
        if self.exists(key)? {
            return Ok(false);
        }
        self.set(key, value)?;
        Ok(true)
    }

    /// Deletes `key` if present, otherwise writes `value`.
    /// Returns `true` when the key exists afterwards.
    fn toggle(&self, key: &str, value: &[u8]) -> anyhow::Result<bool> {
        if self.exists(key)? {
            self.delete(key)?;
            Ok(false)
        } else {
            self.set(key, value)?;
            Ok(true)
        }
    }

    /// Bumps a decimal counter stored at `key` and returns the new value.
    fn increment(&self, key: &str) -> anyhow::Result<u64> {
        let next = parse_counter(self.get(key)?.as_deref())? + 1;
        self.set(key, next.to_string().as_bytes())?;
        Ok(next)
    }

    fn count_prefix(&self, prefix: &str) -> anyhow::Result<usize> {
        Ok(self.keys_with_prefix(prefix)?.len())
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>>
    where
        Self: Sized,
    {
        match self.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()>
    where
        Self: Sized,
    {
        self.set(key, &serde_json::to_vec(value)?)
    }
}

fn parse_counter(raw: Option<&[u8]>) -> anyhow::Result<u64> {
    match raw {
        Some(bytes) => Ok(std::str::from_utf8(bytes)?.trim().parse::<u64>()?),
        None => Ok(0),
    }
}

/// In-process store backing the native server and the tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> anyhow::Result<std::sync::RwLockReadGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.entries
            .read()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }

    fn write(&self) -> anyhow::Result<std::sync::RwLockWriteGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.entries
            .write()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.write()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.write()?.remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.read()?.contains_key(key))
    }

    fn keys_with_prefix(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        Ok(self
            .read()?
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn set_if_absent(&self, key: &str, value: &[u8]) -> anyhow::Result<bool> {
        let mut entries = self.write()?;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), value.to_vec());
        Ok(true)
    }

    fn toggle(&self, key: &str, value: &[u8]) -> anyhow::Result<bool> {
        let mut entries = self.write()?;
        if entries.remove(key).is_some() {
            Ok(false)
        } else {
            entries.insert(key.to_string(), value.to_vec());
            Ok(true)
        }
    }

    fn increment(&self, key: &str) -> anyhow::Result<u64> {
        let mut entries = self.write()?;
        let next = parse_counter(entries.get(key).map(|v| v.as_slice()))? + 1;
        entries.insert(key.to_string(), next.to_string().into_bytes());
        Ok(next)
    }
}

/// Spin key-value store for the wasm component.
///
/// Plain reads and writes go through `key_value::Store`. Id allocation and
/// first-writer-wins claims go through the wasi-keyvalue atomics on a second
/// handle to the same store.
#[cfg(target_arch = "wasm32")]
pub struct SpinStore {
    store: spin_sdk::key_value::Store,
    bucket: spin_sdk::wit::wasi::keyvalue::store::Bucket,
}

#[cfg(target_arch = "wasm32")]
impl SpinStore {
    pub fn open_default() -> anyhow::Result<Self> {
        let store = spin_sdk::key_value::Store::open_default()
            .map_err(|e| anyhow::anyhow!("failed to open key-value store: {:?}", e))?;
        let bucket = spin_sdk::wit::wasi::keyvalue::store::open("default")
            .map_err(|e| anyhow::anyhow!("failed to open key-value bucket: {:?}", e))?;
        Ok(Self { store, bucket })
    }
}

#[cfg(target_arch = "wasm32")]
impl KvStore for SpinStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self.store.get(key).map_err(|e| anyhow::anyhow!("kv get {}: {:?}", key, e))
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.store.set(key, value).map_err(|e| anyhow::anyhow!("kv set {}: {:?}", key, e))
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.store.delete(key).map_err(|e| anyhow::anyhow!("kv delete {}: {:?}", key, e))
    }

    fn exists(&self, key: &str) -> anyhow::Result<bool> {
        self.store.exists(key).map_err(|e| anyhow::anyhow!("kv exists {}: {:?}", key, e))
    }

    fn keys_with_prefix(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        let keys = self
            .store
            .get_keys()
            .map_err(|e| anyhow::anyhow!("kv get_keys: {:?}", e))?;
        Ok(keys.into_iter().filter(|k| k.starts_with(prefix)).collect())
    }

    fn set_if_absent(&self, key: &str, value: &[u8]) -> anyhow::Result<bool> {
        use spin_sdk::wit::wasi::keyvalue::atomics::{self, Cas, CasError};

        let mut cas = Cas::new(&self.bucket, key)
            .map_err(|e| anyhow::anyhow!("kv cas {}: {:?}", key, e))?;
        loop {
            let current = cas
                .current()
                .map_err(|e| anyhow::anyhow!("kv cas {}: {:?}", key, e))?;
            if current.is_some() {
                return Ok(false);
            }
            match atomics::swap(cas, value) {
                Ok(()) => return Ok(true),
                // Someone else wrote in between; look again with the fresh handle.
                Err(CasError::CasFailed(fresh)) => cas = fresh,
                Err(CasError::StoreError(e)) => {
                    return Err(anyhow::anyhow!("kv swap {}: {:?}", key, e));
                }
            }
        }
    }

    // The counter lives in the host's own encoding, so it is only ever
    // touched through this method.
    fn increment(&self, key: &str) -> anyhow::Result<u64> {
        let next = spin_sdk::wit::wasi::keyvalue::atomics::increment(&self.bucket, key, 1)
            .map_err(|e| anyhow::anyhow!("kv increment {}: {:?}", key, e))?;
        u64::try_from(next).map_err(|_| anyhow::anyhow!("counter {} went negative", key))
    }
}
