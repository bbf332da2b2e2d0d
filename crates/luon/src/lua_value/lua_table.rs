// LuaTable - array segment (dense, 1-based) plus hash segment.
// Keys that are integers (or floats with an integral value) within the
// array bounds live in the array; everything else lives in the hash map.

use ahash::AHashMap;

use super::lua_value::{LuaKey, LuaValue, TableRef};
use crate::lua_vm::{LuaError, LuaResult};

pub struct LuaTable {
    arr: Vec<LuaValue>,
    map: AHashMap<LuaKey, LuaValue>,
    meta: Option<TableRef>,
}

impl LuaTable {
    pub fn new(asize: usize, hsize: usize) -> LuaTable {
        LuaTable {
            arr: Vec::with_capacity(asize),
            map: AHashMap::with_capacity(hsize),
            meta: None,
        }
    }

    pub fn metatable(&self) -> Option<TableRef> {
        self.meta.clone()
    }

    pub fn set_metatable(&mut self, meta: Option<TableRef>) {
        self.meta = meta;
    }

    /// Raw get: no metamethods, absent keys read as nil.
    pub fn get(&self, key: &LuaValue) -> LuaValue {
        let key = LuaKey::normalize(key.clone());
        if let LuaValue::Integer(i) = key {
            if i >= 1 && (i as usize) <= self.arr.len() {
                return self.arr[i as usize - 1].clone();
            }
        }
        if key.is_nil() {
            return LuaValue::Nil;
        }
        self.map.get(&LuaKey(key)).cloned().unwrap_or(LuaValue::Nil)
    }

    /// Raw put. Fails on nil or NaN keys; assigning nil erases.
    pub fn put(&mut self, key: LuaValue, value: LuaValue) -> LuaResult<()> {
        let key = LuaKey::normalize(key);
        match &key {
            LuaValue::Nil => {
                return Err(LuaError::Runtime(LuaValue::from_string("table index is nil")));
            }
            LuaValue::Float(f) if f.is_nan() => {
                return Err(LuaError::Runtime(LuaValue::from_string("table index is NaN")));
            }
            _ => {}
        }

        if let LuaValue::Integer(i) = key {
            let idx = i as usize;
            if i >= 1 && idx <= self.arr.len() {
                self.arr[idx - 1] = value;
                // Trim a nil written at the very end so the array segment
                // stays a best-effort dense prefix.
                while matches!(self.arr.last(), Some(LuaValue::Nil)) {
                    self.arr.pop();
                }
                return Ok(());
            }
            if i >= 1 && idx == self.arr.len() + 1 && !value.is_nil() {
                self.arr.push(value);
                self.absorb_from_map();
                return Ok(());
            }
        }

        if value.is_nil() {
            self.map.remove(&LuaKey(key));
        } else {
            self.map.insert(LuaKey(key), value);
        }
        Ok(())
    }

    // After an append, migrate hash entries that have become contiguous
    // with the array segment.
    fn absorb_from_map(&mut self) {
        loop {
            let next = LuaKey(LuaValue::Integer(self.arr.len() as i64 + 1));
            match self.map.remove(&next) {
                Some(v) => self.arr.push(v),
                None => break,
            }
        }
    }

    /// A border: an index n with t[n] non-nil and t[n+1] nil. With holes,
    /// any valid border is an acceptable answer.
    pub fn length(&self) -> i64 {
        if matches!(self.arr.last(), Some(LuaValue::Nil)) {
            // Hole at the end of the array segment: binary search for a
            // border inside it.
            let mut lo = 0usize; // arr[lo-1] known non-nil (or lo == 0)
            let mut hi = self.arr.len(); // arr[hi-1] known nil
            while hi - lo > 1 {
                let mid = (lo + hi) / 2;
                if self.arr[mid - 1].is_nil() {
                    hi = mid;
                } else {
                    lo = mid;
                }
            }
            return lo as i64;
        }
        // Array segment is fully populated; probe the hash segment for a
        // continuation.
        let mut n = self.arr.len() as i64;
        while !self.get(&LuaValue::Integer(n + 1)).is_nil() {
            n += 1;
        }
        n
    }

    /// Stateless iteration: returns the entry following `key`, or None when
    /// exhausted. A nil key starts the traversal.
    pub fn next(&self, key: &LuaValue) -> LuaResult<Option<(LuaValue, LuaValue)>> {
        let key = LuaKey::normalize(key.clone());

        // Array segment first, in index order.
        let arr_pos = match &key {
            LuaValue::Nil => 0,
            LuaValue::Integer(i) if *i >= 1 && (*i as usize) <= self.arr.len() => *i as usize,
            _ => usize::MAX,
        };
        if arr_pos != usize::MAX {
            for (i, v) in self.arr.iter().enumerate().skip(arr_pos) {
                if !v.is_nil() {
                    return Ok(Some((LuaValue::Integer(i as i64 + 1), v.clone())));
                }
            }
            return Ok(first_map_entry(&self.map));
        }

        // Hash segment: find the key, return the entry after it. Map order
        // is stable as long as the table is not mutated mid-traversal.
        let mut found = false;
        for (k, v) in self.map.iter() {
            if found {
                return Ok(Some((k.0.clone(), v.clone())));
            }
            if k.0 == key {
                found = true;
            }
        }
        if found {
            return Ok(None);
        }
        Err(LuaError::Runtime(LuaValue::from_string(
            "invalid key to 'next'",
        )))
    }
}

fn first_map_entry(map: &AHashMap<LuaKey, LuaValue>) -> Option<(LuaValue, LuaValue)> {
    map.iter().next().map(|(k, v)| (k.0.clone(), v.clone()))
}
