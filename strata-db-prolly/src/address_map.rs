//! Name → address directory.
//!
//! An [`AddressMap`] maps UTF-8 names (compared as raw bytes) to 20-byte
//! addresses stored inline in the leaf address array. The database uses it
//! as the dataset directory and as the per-table index-name directory.

use crate::store::NodeStore;
use crate::tree::editor::Editor;
use crate::tree::{Lexicographic, StaticMap};
use strata_db_core::{Address, Error, Result};

/// Ordered map from string names to content addresses.
#[derive(Clone, Debug)]
pub struct AddressMap {
    addresses: StaticMap<Lexicographic>,
}

impl AddressMap {
    /// An empty directory.
    pub fn empty(store: NodeStore) -> Result<AddressMap> {
        Ok(AddressMap {
            addresses: StaticMap::empty(store, Lexicographic, true)?,
        })
    }

    /// Open a directory at a known root address.
    pub async fn load(store: NodeStore, root: Address) -> Result<AddressMap> {
        let addresses = StaticMap::load(store, root, Lexicographic).await?;
        if !addresses.root().has_address_values() {
            return Err(Error::corrupt("address map root stores inline values"));
        }
        Ok(AddressMap { addresses })
    }

    /// Number of names.
    pub fn count(&self) -> u64 {
        self.addresses.count()
    }

    /// Tree height.
    pub fn height(&self) -> usize {
        self.addresses.height()
    }

    /// Root address of the directory.
    pub fn hash_of(&self) -> Address {
        self.addresses.hash_of()
    }

    /// Binary format of the backing store.
    pub fn format(&self) -> crate::store::FormatId {
        self.addresses.format()
    }

    /// Look up the address recorded under `name`.
    pub async fn get(&self, name: &str) -> Result<Option<Address>> {
        match self.addresses.get(name.as_bytes()).await? {
            Some(value) => Ok(Some(Address::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// True iff `name` is present.
    pub async fn has(&self, name: &str) -> Result<bool> {
        self.addresses.has(name.as_bytes()).await
    }

    /// Visit every `(name, address)` pair in name order.
    pub async fn iter_all<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&str, Address) -> Result<()>,
    {
        self.addresses
            .iter_all(|key, value| {
                let name = std::str::from_utf8(key)
                    .map_err(|_| Error::corrupt("address map key is not UTF-8"))?;
                f(name, Address::from_slice(value)?)
            })
            .await
    }

    /// Visit every address reachable from the root, including the stored
    /// leaf values.
    pub async fn walk_addresses<F>(&self, f: F) -> Result<()>
    where
        F: FnMut(Address) -> Result<()>,
    {
        self.addresses.walk_addresses(f).await
    }

    /// Visit every node, root first.
    pub async fn walk_nodes<F>(&self, f: F) -> Result<()>
    where
        F: FnMut(&crate::format::Node) -> Result<()>,
    {
        self.addresses.walk_nodes(f).await
    }

    /// Begin a batch of edits.
    pub fn editor(&self) -> AddressMapEditor {
        AddressMapEditor {
            editor: self.addresses.editor(),
        }
    }

    /// The underlying generic tree (used by the diff walk).
    pub fn inner(&self) -> &StaticMap<Lexicographic> {
        &self.addresses
    }
}

/// Batched writer over an [`AddressMap`].
#[derive(Debug)]
pub struct AddressMapEditor {
    editor: Editor<Lexicographic>,
}

impl AddressMapEditor {
    /// Record a new name. Overwrites silently if the name exists.
    pub fn add(&mut self, name: &str, addr: Address) {
        self.editor.put(name.as_bytes().to_vec(), addr.as_bytes().to_vec());
    }

    /// Re-point an existing name.
    pub fn update(&mut self, name: &str, addr: Address) {
        self.editor.put(name.as_bytes().to_vec(), addr.as_bytes().to_vec());
    }

    /// Remove a name. Removing an absent name is a no-op.
    pub fn delete(&mut self, name: &str) {
        self.editor.delete(name.as_bytes().to_vec());
    }

    /// Read through pending edits.
    pub async fn get(&self, name: &str) -> Result<Option<Address>> {
        match self.editor.get(name.as_bytes()).await? {
            Some(value) => Ok(Some(Address::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Apply pending edits, producing the successor directory.
    pub async fn flush(self) -> Result<AddressMap> {
        Ok(AddressMap {
            addresses: self.editor.flush().await?,
        })
    }
}
