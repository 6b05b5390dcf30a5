//! Byte-bounded LRU store
//!
//! Entries live in an arena addressed by slot index and are threaded into a
//! doubly linked recency list through `prev`/`next` indices. The key index
//! maps each key to its slot, so get, add and eviction are all O(1).
//!
//! Not thread-safe; see [`crate::cache::Cache`] for the locked wrapper.

use std::collections::HashMap;

/// A value that knows how many bytes it occupies
pub trait CacheValue {
    fn size(&self) -> usize;
}

/// Called with each evicted entry
pub type EvictionCallback<V> = Box<dyn FnMut(String, V) + Send>;

struct Entry<V> {
    key: String,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

pub struct LruCache<V: CacheValue> {
    /// Byte budget, 0 means unlimited
    max_bytes: usize,
    /// Bytes used by keys and values
    nbytes: usize,
    slots: Vec<Option<Entry<V>>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    /// Most recently used
    head: Option<usize>,
    /// Least recently used
    tail: Option<usize>,
    on_evicted: Option<EvictionCallback<V>>,
}

impl<V: CacheValue> LruCache<V> {
    pub fn new(max_bytes: usize, on_evicted: Option<EvictionCallback<V>>) -> Self {
        Self {
            max_bytes,
            nbytes: 0,
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            on_evicted,
        }
    }

    /// Look up `key`, marking it most recently used on a hit
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.move_to_front(idx);
        self.slots[idx].as_ref().map(|e| &e.value)
    }

    /// Insert or replace `key`, then evict until back under budget
    pub fn add(&mut self, key: &str, value: V) {
        if let Some(&idx) = self.index.get(key) {
            self.move_to_front(idx);
            if let Some(entry) = self.slots[idx].as_mut() {
                self.nbytes = self.nbytes - entry.value.size() + value.size();
                entry.value = value;
            }
        } else {
            self.nbytes += key.len() + value.size();
            let entry = Entry {
                key: key.to_string(),
                value,
                prev: None,
                next: None,
            };
            let idx = match self.free.pop() {
                Some(idx) => {
                    self.slots[idx] = Some(entry);
                    idx
                }
                None => {
                    self.slots.push(Some(entry));
                    self.slots.len() - 1
                }
            };
            self.index.insert(key.to_string(), idx);
            self.push_front(idx);
        }

        while self.max_bytes != 0 && self.nbytes > self.max_bytes && self.tail.is_some() {
            self.remove_oldest();
        }
    }

    /// Evict the least recently used entry, if any
    pub fn remove_oldest(&mut self) {
        let Some(idx) = self.tail else {
            return;
        };

        self.unlink(idx);
        if let Some(entry) = self.slots[idx].take() {
            self.free.push(idx);
            self.index.remove(&entry.key);
            self.nbytes -= entry.key.len() + entry.value.size();

            if let Some(cb) = self.on_evicted.as_mut() {
                cb(entry.key, entry.value);
            }
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Bytes currently used
    pub fn bytes(&self) -> usize {
        self.nbytes
    }

    /// Keys from most to least recently used
    pub fn keys(&self) -> Vec<&str> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            match self.slots[idx].as_ref() {
                Some(entry) => {
                    keys.push(entry.key.as_str());
                    cursor = entry.next;
                }
                None => break,
            }
        }
        keys
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(entry) = self.slots[idx].as_mut() {
            entry.prev = None;
            entry.next = old_head;
        }
        if let Some(h) = old_head {
            if let Some(head) = self.slots[h].as_mut() {
                head.prev = Some(idx);
            }
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match self.slots[idx].as_ref() {
            Some(entry) => (entry.prev, entry.next),
            None => return,
        };

        match prev {
            Some(p) => {
                if let Some(e) = self.slots[p].as_mut() {
                    e.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(e) = self.slots[n].as_mut() {
                    e.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(entry) = self.slots[idx].as_mut() {
            entry.prev = None;
            entry.next = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    struct Text(String);

    impl CacheValue for Text {
        fn size(&self) -> usize {
            self.0.len()
        }
    }

    fn text(s: &str) -> Text {
        Text(s.to_string())
    }

    #[test]
    fn test_get() {
        let mut lru = LruCache::new(0, None);
        lru.add("key1", text("1234"));
        assert_eq!(lru.get("key1"), Some(&text("1234")));
        assert_eq!(lru.get("key2"), None);
    }

    #[test]
    fn test_remove_oldest() {
        let (k1, k2, k3) = ("key1", "key2", "k3");
        let (v1, v2, v3) = ("value1", "value2", "v3");
        let cap = k1.len() + k2.len() + v1.len() + v2.len();

        let mut lru = LruCache::new(cap, None);
        lru.add(k1, text(v1));
        lru.add(k2, text(v2));
        lru.add(k3, text(v3));

        assert!(lru.get("key1").is_none());
        assert_eq!(lru.len(), 2);
        assert!(lru.bytes() <= cap);
    }

    #[test]
    fn test_on_evicted() {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let sink = evicted.clone();
        let callback: EvictionCallback<Text> = Box::new(move |key, value| {
            sink.lock().unwrap().push((key, value));
        });

        let mut lru = LruCache::new(10, Some(callback));
        lru.add("key1", text("123456"));
        lru.add("k2", text("k2"));
        lru.add("k3", text("k3"));
        lru.add("k4", text("k4"));

        let evicted = evicted.lock().unwrap();
        assert_eq!(
            *evicted,
            vec![
                ("key1".to_string(), text("123456")),
                ("k2".to_string(), text("k2")),
            ]
        );
        assert_eq!(lru.keys(), vec!["k4", "k3"]);
        assert_eq!(lru.bytes(), 8);
    }

    #[test]
    fn test_get_moves_to_front() {
        let mut lru = LruCache::new(0, None);
        lru.add("a", text("1"));
        lru.add("b", text("2"));
        lru.add("c", text("3"));
        assert_eq!(lru.keys(), vec!["c", "b", "a"]);

        lru.get("a");
        assert_eq!(lru.keys(), vec!["a", "c", "b"]);

        lru.add("b", text("22"));
        assert_eq!(lru.keys(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_replace_updates_size() {
        let mut lru = LruCache::new(0, None);
        lru.add("k", text("short"));
        assert_eq!(lru.bytes(), 6);
        lru.add("k", text("much longer"));
        assert_eq!(lru.bytes(), 12);
        lru.add("k", text("x"));
        assert_eq!(lru.bytes(), 2);
        assert_eq!(lru.len(), 1);
    }

    #[test]
    fn test_replace_can_trigger_eviction() {
        let mut lru = LruCache::new(8, None);
        lru.add("a", text("111"));
        lru.add("b", text("222"));
        // Growing "b" pushes the store over budget; "a" is the oldest.
        lru.add("b", text("22222"));
        assert_eq!(lru.keys(), vec!["b"]);
        assert_eq!(lru.bytes(), 6);
    }

    #[test]
    fn test_oversized_entry_empties_store() {
        let mut lru = LruCache::new(4, None);
        lru.add("a", text("1"));
        lru.add("big", text("too large"));
        assert!(lru.is_empty());
        assert_eq!(lru.bytes(), 0);
    }

    #[test]
    fn test_remove_oldest_on_empty_is_noop() {
        let mut lru: LruCache<Text> = LruCache::new(0, None);
        lru.remove_oldest();
        assert_eq!(lru.len(), 0);
    }

    #[test]
    fn test_slots_are_reused() {
        let mut lru = LruCache::new(6, None);
        for i in 0..100 {
            lru.add(&format!("k{}", i % 10), text("v"));
        }
        assert_eq!(lru.len(), 2);
        assert!(lru.slots.len() <= 3);
    }

    #[test]
    fn test_budget_invariant_under_mixed_workload() {
        let cap = 64;
        let mut lru = LruCache::new(cap, None);
        for i in 0..500usize {
            let key = format!("key-{}", i % 37);
            if i % 3 == 0 {
                lru.get(&key);
            } else {
                lru.add(&key, text(&"x".repeat(i % 11)));
                assert_eq!(lru.keys().first().copied(), Some(key.as_str()));
            }
            assert!(lru.bytes() <= cap);
            assert_eq!(lru.keys().len(), lru.len());
        }
    }
}
