//! Generational slot arena with first-in first-out slot recycling.
//!
//! Keys are slotmap keys: the low half is the slot index and the high half
//! the generation. A removed slot goes to the back of the free queue and the
//! oldest freed slot is handed out first, with its generation bumped so stale
//! keys stop resolving.

use slotmap::{Key, KeyData};
use std::collections::VecDeque;
use std::marker::PhantomData;

// slotmap keeps occupied versions odd
const FIRST_GENERATION: u32 = 1;

struct Entry<T> {
    generation: u32,
    value: Option<T>,
}

pub(crate) struct Arena<K, T> {
    entries: Vec<Entry<T>>,
    free: VecDeque<u32>,
    len: usize,
    _key: PhantomData<fn(K) -> K>,
}

fn make_key<K: Key>(index: u32, generation: u32) -> K {
    K::from(KeyData::from_ffi((u64::from(generation) << 32) | u64::from(index)))
}

fn split_key<K: Key>(key: K) -> (usize, u32) {
    let raw = key.data().as_ffi();
    (raw as u32 as usize, (raw >> 32) as u32)
}

impl<K: Key, T> Arena<K, T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: VecDeque::new(),
            len: 0,
            _key: PhantomData,
        }
    }

    pub(crate) fn insert(&mut self, value: T) -> K {
        self.len += 1;
        if let Some(index) = self.free.pop_front() {
            let entry = &mut self.entries[index as usize];
            entry.generation = entry.generation.wrapping_add(2);
            entry.value = Some(value);
            return make_key(index, entry.generation);
        }

        let index = self.entries.len() as u32;
        self.entries.push(Entry {
            generation: FIRST_GENERATION,
            value: Some(value),
        });
        make_key(index, FIRST_GENERATION)
    }

    pub(crate) fn remove(&mut self, key: K) -> Option<T> {
        let (index, generation) = split_key(key);
        let entry = self.entries.get_mut(index)?;
        if entry.generation != generation {
            return None;
        }
        let value = entry.value.take()?;
        self.free.push_back(index as u32);
        self.len -= 1;
        Some(value)
    }

    pub(crate) fn get(&self, key: K) -> Option<&T> {
        let (index, generation) = split_key(key);
        self.entries
            .get(index)
            .filter(|entry| entry.generation == generation)
            .and_then(|entry| entry.value.as_ref())
    }

    pub(crate) fn get_mut(&mut self, key: K) -> Option<&mut T> {
        let (index, generation) = split_key(key);
        self.entries
            .get_mut(index)
            .filter(|entry| entry.generation == generation)
            .and_then(|entry| entry.value.as_mut())
    }

    pub(crate) fn contains_key(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Live entries in ascending slot order
    pub(crate) fn iter(&self) -> impl Iterator<Item = (K, &T)> + '_ {
        self.entries.iter().enumerate().filter_map(|(index, entry)| {
            entry
                .value
                .as_ref()
                .map(|value| (make_key::<K>(index as u32, entry.generation), value))
        })
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut T)> + '_ {
        self.entries
            .iter_mut()
            .enumerate()
            .filter_map(|(index, entry)| {
                let generation = entry.generation;
                entry
                    .value
                    .as_mut()
                    .map(|value| (make_key::<K>(index as u32, generation), value))
            })
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter().filter_map(|entry| entry.value.as_ref())
    }
}
