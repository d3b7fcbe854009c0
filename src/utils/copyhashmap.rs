use {
    ahash::AHashMap,
    std::{
        cell::{RefCell, RefMut},
        hash::Hash,
    },
};

/// A hash map that hands out clones so that no borrow is held across callbacks.
pub struct CopyHashMap<K, V> {
    map: RefCell<AHashMap<K, V>>,
}

impl<K, V> Default for CopyHashMap<K, V> {
    fn default() -> Self {
        Self {
            map: Default::default(),
        }
    }
}

impl<K: Eq + Hash, V: Clone> CopyHashMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, k: K, v: V) -> Option<V> {
        self.map.borrow_mut().insert(k, v)
    }

    pub fn get(&self, k: &K) -> Option<V> {
        self.map.borrow().get(k).cloned()
    }

    pub fn remove(&self, k: &K) -> Option<V> {
        self.map.borrow_mut().remove(k)
    }

    pub fn contains(&self, k: &K) -> bool {
        self.map.borrow().contains_key(k)
    }

    pub fn is_empty(&self) -> bool {
        self.map.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.borrow().len()
    }

    pub fn lock(&self) -> RefMut<'_, AHashMap<K, V>> {
        self.map.borrow_mut()
    }

    pub fn clear(&self) {
        self.map.borrow_mut().clear();
    }
}
